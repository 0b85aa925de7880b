//! WiFi station-mode adapter.
//!
//! Brings up the station interface, keeps it associated, and reports
//! lifecycle changes to an injected [`LinkDelegate`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspWifi` for driver setup, raw
//!   `esp_event` handlers for the station/IP events, raw `esp_netif`
//!   calls for the static address.
//! - **all other targets**: the link is "up" on loopback immediately.
//!
//! ## Reconnection policy
//!
//! `STA_START` triggers the first `esp_wifi_connect()`; every
//! `STA_DISCONNECTED` triggers another. The driver paces retries itself.
//!
//! ## Addressing
//!
//! With a [`StaticIp`] the DHCP client is stopped and the address is set
//! directly after the interface starts; otherwise DHCP is left running.

use core::fmt;
use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::{LinkDelegate, LinkEvent};
use crate::config::StaticIp;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    /// An ESP-IDF call failed with this code.
    Driver(i32),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::Driver(rc) => write!(f, "WiFi driver error (rc={})", rc),
        }
    }
}

impl std::error::Error for LinkError {}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), LinkError> {
    if ssid.is_empty() {
        return Err(LinkError::NoCredentials);
    }
    if ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(LinkError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), LinkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(LinkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Event registration (espidf)
// ───────────────────────────────────────────────────────────────

/// Registered `esp_event` handler instances plus the delegate they
/// point at. Unregistered on drop, before the delegate is freed.
#[cfg(target_os = "espidf")]
struct EventRegistration {
    wifi_any: esp_event_handler_instance_t,
    got_ip: esp_event_handler_instance_t,
    delegate: Box<Arc<dyn LinkDelegate>>,
}

#[cfg(target_os = "espidf")]
impl Drop for EventRegistration {
    fn drop(&mut self) {
        // SAFETY: both instances were returned by a successful register call.
        unsafe {
            esp_event_handler_instance_unregister(WIFI_EVENT, ESP_EVENT_ANY_ID, self.wifi_any);
            esp_event_handler_instance_unregister(IP_EVENT, ip_event_t_IP_EVENT_STA_GOT_IP as i32, self.got_ip);
        }
    }
}

/// Runs on the default event loop task.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn on_event(
    arg: *mut core::ffi::c_void,
    base: esp_event_base_t,
    id: i32,
    data: *mut core::ffi::c_void,
) {
    // SAFETY: `arg` is the Box<Arc<dyn LinkDelegate>> owned by the
    // EventRegistration, which outlives the handler registration.
    let delegate = unsafe { &*(arg as *const Arc<dyn LinkDelegate>) };

    if base == unsafe { WIFI_EVENT } {
        if id == wifi_event_t_WIFI_EVENT_STA_START as i32 {
            unsafe { esp_wifi_connect() };
            delegate.on_link_event(LinkEvent::Started);
        } else if id == wifi_event_t_WIFI_EVENT_STA_DISCONNECTED as i32 {
            unsafe { esp_wifi_connect() };
            delegate.on_link_event(LinkEvent::Disconnected);
        }
    } else if base == unsafe { IP_EVENT } && id == ip_event_t_IP_EVENT_STA_GOT_IP as i32 {
        // SAFETY: IP_EVENT_STA_GOT_IP always carries an ip_event_got_ip_t.
        let event = unsafe { &*(data as *const ip_event_got_ip_t) };
        let ip = core::net::Ipv4Addr::from(event.ip_info.ip.addr.to_ne_bytes());
        delegate.on_link_event(LinkEvent::GotIp(ip));
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    static_ip: Option<StaticIp>,
    delegate: Arc<dyn LinkDelegate>,
    #[cfg(target_os = "espidf")]
    driver: Option<esp_idf_svc::wifi::EspWifi<'static>>,
    #[cfg(target_os = "espidf")]
    registration: Option<EventRegistration>,
}

impl WifiAdapter {
    pub fn new(delegate: Arc<dyn LinkDelegate>) -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            static_ip: None,
            delegate,
            #[cfg(target_os = "espidf")]
            driver: None,
            #[cfg(target_os = "espidf")]
            registration: None,
        }
    }

    /// Validate and store station credentials.
    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| LinkError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| LinkError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Use a fixed address instead of DHCP.
    pub fn set_static_ip(&mut self, static_ip: Option<StaticIp>) {
        self.static_ip = static_ip;
    }

    /// Initialise the driver, register event handlers and start the
    /// station. Association happens asynchronously on `STA_START`.
    #[cfg(target_os = "espidf")]
    pub fn start(
        &mut self,
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    ) -> Result<(), LinkError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

        if self.ssid.is_empty() {
            return Err(LinkError::NoCredentials);
        }

        let mut wifi = EspWifi::new(modem, sysloop, None).map_err(|e| LinkError::Driver(e.code()))?;
        self.registration = Some(self.register_handlers()?);

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| LinkError::InvalidSsid)?,
            password: self.password.as_str().try_into().map_err(|_| LinkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        }))
        .map_err(|e| LinkError::Driver(e.code()))?;
        wifi.start().map_err(|e| LinkError::Driver(e.code()))?;
        info!("WiFi: station started, connecting to '{}'", self.ssid);

        if let Some(ip) = self.static_ip {
            apply_static_ip(wifi.sta_netif().handle(), ip)?;
        }

        self.driver = Some(wifi);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn register_handlers(&self) -> Result<EventRegistration, LinkError> {
        let delegate = Box::new(Arc::clone(&self.delegate));
        let arg = (&*delegate as *const Arc<dyn LinkDelegate>).cast_mut().cast();
        let mut wifi_any: esp_event_handler_instance_t = core::ptr::null_mut();
        let mut got_ip: esp_event_handler_instance_t = core::ptr::null_mut();

        // SAFETY: `arg` points into `delegate`, which the returned
        // EventRegistration keeps alive until it unregisters both handlers.
        unsafe {
            let ret = esp_event_handler_instance_register(
                WIFI_EVENT, ESP_EVENT_ANY_ID, Some(on_event), arg, &mut wifi_any,
            );
            if ret != ESP_OK as i32 {
                return Err(LinkError::Driver(ret));
            }
            let ret = esp_event_handler_instance_register(
                IP_EVENT, ip_event_t_IP_EVENT_STA_GOT_IP as i32, Some(on_event), arg, &mut got_ip,
            );
            if ret != ESP_OK as i32 {
                esp_event_handler_instance_unregister(WIFI_EVENT, ESP_EVENT_ANY_ID, wifi_any);
                return Err(LinkError::Driver(ret));
            }
        }
        Ok(EventRegistration { wifi_any, got_ip, delegate })
    }

    /// Simulation: no radio. The host's own stack is the link, so report
    /// it as up on loopback straight away.
    #[cfg(not(target_os = "espidf"))]
    pub fn start(&mut self) -> Result<(), LinkError> {
        if self.ssid.is_empty() {
            warn!("WiFi(sim): no credentials, using host network");
        } else {
            info!("WiFi(sim): pretending to join '{}'", self.ssid);
        }
        self.delegate.on_link_event(LinkEvent::Started);
        let ip = self.static_ip.map_or(core::net::Ipv4Addr::LOCALHOST, |s| s.ip);
        self.delegate.on_link_event(LinkEvent::GotIp(ip));
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn apply_static_ip(netif: *mut esp_netif_t, ip: StaticIp) -> Result<(), LinkError> {
    info!("WiFi: stopping DHCP client, using {}", ip.ip);
    let info = esp_netif_ip_info_t {
        ip: esp_ip4_addr_t { addr: u32::from_ne_bytes(ip.ip.octets()) },
        netmask: esp_ip4_addr_t { addr: u32::from_ne_bytes(ip.netmask.octets()) },
        gw: esp_ip4_addr_t { addr: u32::from_ne_bytes(ip.gateway.octets()) },
    };
    // SAFETY: `netif` is the live station interface owned by EspWifi.
    unsafe {
        let ret = esp_netif_dhcpc_stop(netif);
        if ret != ESP_OK as i32 && ret != ESP_ERR_ESP_NETIF_DHCP_ALREADY_STOPPED as i32 {
            return Err(LinkError::Driver(ret));
        }
        let ret = esp_netif_set_ip_info(netif, &info);
        if ret != ESP_OK as i32 {
            return Err(LinkError::Driver(ret));
        }
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
