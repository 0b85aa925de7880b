//! System configuration parameters
//!
//! All tunable parameters for the NetRelay device. Defaults are compiled
//! in; values can be overridden from NVS on the device or from a JSON file
//! in the host simulation.
//!
//! Link settings have no usable compiled-in default, so they are taken
//! from the build environment:
//!
//! | Variable                 | Field                 |
//! |--------------------------|-----------------------|
//! | `NETRELAY_WIFI_SSID`     | `wifi_ssid`           |
//! | `NETRELAY_WIFI_PASSWORD` | `wifi_password`       |
//! | `NETRELAY_WIFI_IP`       | `static_ip.ip`        |
//! | `NETRELAY_WIFI_GATEWAY`  | `static_ip.gateway`   |
//! | `NETRELAY_WIFI_NETMASK`  | `static_ip.netmask`   |
//!
//! The static address is used only when all three address variables are
//! set; otherwise the device asks for DHCP.

use core::net::Ipv4Addr;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins;
use crate::protocol::codec::{ByteOrder, Framing};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Network ---
    /// TCP port the command listener binds to.
    pub server_port: u16,
    /// Maximum number of simultaneously served connections.
    pub max_connections: u8,
    /// Accepted connections per second (token-bucket refill and burst).
    pub accept_rate_per_sec: u8,

    // --- Protocol ---
    /// Byte order of the 4-byte duration field.
    pub byte_order: ByteOrder,
    /// How received bytes are split into command frames.
    pub framing: Framing,

    // --- Outputs ---
    /// GPIO driving the relay.
    pub relay_gpio: i32,
    /// GPIO driving the indicator LED.
    pub indicator_gpio: i32,
    /// Length of the activity pulse that gates the indicator (milliseconds).
    pub activity_pulse_ms: u32,

    // --- Link ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Fixed address; `None` means DHCP.
    pub static_ip: Option<StaticIpConfig>,

    // --- Timing ---
    /// Status telemetry report interval (seconds)
    pub status_interval_secs: u32,
}

/// Dotted-quad address triple used when DHCP is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIpConfig {
    pub ip: heapless::String<15>,
    pub gateway: heapless::String<15>,
    pub netmask: heapless::String<15>,
}

/// Parsed form of [`StaticIpConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticIp {
    pub ip: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl StaticIpConfig {
    /// Parse all three addresses. Any malformed component rejects the lot.
    pub fn parse(&self) -> Result<StaticIp, ConfigError> {
        Ok(StaticIp {
            ip: parse_ipv4(&self.ip).ok_or(ConfigError::ValidationFailed("static_ip.ip"))?,
            gateway: parse_ipv4(&self.gateway)
                .ok_or(ConfigError::ValidationFailed("static_ip.gateway"))?,
            netmask: parse_ipv4(&self.netmask)
                .ok_or(ConfigError::ValidationFailed("static_ip.netmask"))?,
        })
    }
}

/// Strict dotted-quad parse: four decimal octets, each 0–255.
pub fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    Ipv4Addr::from_str(s.trim()).ok()
}

/// Link settings captured when the firmware was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLink {
    pub ssid: Option<&'static str>,
    pub password: Option<&'static str>,
    pub ip: Option<&'static str>,
    pub gateway: Option<&'static str>,
    pub netmask: Option<&'static str>,
}

/// Values of the `NETRELAY_WIFI_*` variables at compile time.
pub const BUILD_LINK: BuildLink = BuildLink {
    ssid: option_env!("NETRELAY_WIFI_SSID"),
    password: option_env!("NETRELAY_WIFI_PASSWORD"),
    ip: option_env!("NETRELAY_WIFI_IP"),
    gateway: option_env!("NETRELAY_WIFI_GATEWAY"),
    netmask: option_env!("NETRELAY_WIFI_NETMASK"),
};

impl BuildLink {
    /// Copy the link settings into `config`.
    ///
    /// A value too long for its field is left empty, which `WifiAdapter`
    /// then reports as missing credentials rather than joining the wrong
    /// network.
    pub fn apply(&self, config: &mut SystemConfig) {
        config.wifi_ssid = fixed(self.ssid);
        config.wifi_password = fixed(self.password);
        config.static_ip = match (self.ip, self.gateway, self.netmask) {
            (Some(ip), Some(gateway), Some(netmask)) => Some(StaticIpConfig {
                ip: fixed(Some(ip)),
                gateway: fixed(Some(gateway)),
                netmask: fixed(Some(netmask)),
            }),
            _ => None,
        };
    }
}

fn fixed<const N: usize>(value: Option<&str>) -> heapless::String<N> {
    value
        .and_then(|v| heapless::String::try_from(v).ok())
        .unwrap_or_default()
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut config = Self {
            // Network
            server_port: 3333,
            max_connections: 4,
            accept_rate_per_sec: 10,

            // Protocol
            byte_order: ByteOrder::Native,
            framing: Framing::PerRead,

            // Outputs
            relay_gpio: pins::RELAY_GPIO,
            indicator_gpio: pins::INDICATOR_GPIO,
            activity_pulse_ms: 100,

            // Link (see `BUILD_LINK`)
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            static_ip: None,

            // Timing
            status_interval_secs: 30,
        };
        BUILD_LINK.apply(&mut config);
        config
    }
}

impl SystemConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_port == 0 {
            return Err(ConfigError::ValidationFailed("server_port must be non-zero"));
        }
        if !(1..=16).contains(&self.max_connections) {
            return Err(ConfigError::ValidationFailed("max_connections must be 1–16"));
        }
        if !(1..=100).contains(&self.accept_rate_per_sec) {
            return Err(ConfigError::ValidationFailed(
                "accept_rate_per_sec must be 1–100",
            ));
        }
        for gpio in [self.relay_gpio, self.indicator_gpio] {
            if !(0..=pins::MAX_OUTPUT_GPIO).contains(&gpio) {
                return Err(ConfigError::ValidationFailed("output GPIO out of range"));
            }
        }
        if self.relay_gpio == self.indicator_gpio {
            return Err(ConfigError::ValidationFailed(
                "relay_gpio and indicator_gpio must differ",
            ));
        }
        if !(1..=10_000).contains(&self.activity_pulse_ms) {
            return Err(ConfigError::ValidationFailed(
                "activity_pulse_ms must be 1–10000",
            ));
        }
        if !(1..=3600).contains(&self.status_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "status_interval_secs must be 1–3600",
            ));
        }
        if let Some(ip) = &self.static_ip {
            ip.parse()?;
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
