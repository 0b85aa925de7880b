//! NetRelay firmware: main entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter     WifiAdapter     LogEventSink    MonotonicClock │
//! │  (ConfigPort)   (link)          (EventSink)     (Clock)        │
//! │  Listener ─▶ ConnectionHandler × M   (protocol core)           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ChannelBank: RelayChannel · IndicatorChannel          │    │
//! │  │  Evaluator × N (sole output writers, actuator core)    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Main loop: EvaluatorSupervisor · Watchdog · status telemetry  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Off-target the same binary runs as a simulator: outputs are in-memory
//! pins, the link is the host network, and configuration comes from an
//! optional JSON file given as the first argument.
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};

use netrelay::adapters::log_sink::LogEventSink;
use netrelay::adapters::time::MonotonicClock;
use netrelay::adapters::wifi::WifiAdapter;
use netrelay::app::ports::{Clock, EventSink, LinkDelegate};
use netrelay::app::service::DeviceService;
use netrelay::config::SystemConfig;
use netrelay::drivers::hw_init;
use netrelay::drivers::output::{GpioOutput, LedcOutput};
use netrelay::drivers::watchdog::Watchdog;
use netrelay::pins;

/// Main loop period: supervisor check plus watchdog feed.
const SUPERVISE_PERIOD_MS: u64 = 250;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    init_host_logging();

    info!("╔══════════════════════════════════════╗");
    info!("║  NetRelay v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config ────────────────────────────────────────
    let config = load_config()?;
    info!(
        "Config: port={} relay=GPIO{} indicator=GPIO{} pulse={}ms order={:?} framing={:?}",
        config.server_port,
        config.relay_gpio,
        config.indicator_gpio,
        config.activity_pulse_ms,
        config.byte_order,
        config.framing,
    );

    // ── 3. Output peripherals (both off) ──────────────────────
    hw_init::init_outputs(config.relay_gpio, config.indicator_gpio)?;

    // ── 4. Network link ───────────────────────────────────────
    let sink = Arc::new(LogEventSink::new());
    let mut wifi = WifiAdapter::new(Arc::clone(&sink) as Arc<dyn LinkDelegate>);
    if let Err(e) = wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        warn!("WiFi: {}", e);
    }
    wifi.set_static_ip(config.static_ip.as_ref().map(|s| s.parse()).transpose()?);
    start_link(&mut wifi)?;

    // ── 5. Channels, evaluators, listener ─────────────────────
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let mut service = DeviceService::start(
        &config,
        GpioOutput::new(config.relay_gpio),
        LedcOutput::new(pins::INDICATOR_LEDC_CHANNEL),
        Arc::clone(&clock),
        sink as Arc<dyn EventSink>,
    )?;

    // ── 6. Supervision loop ───────────────────────────────────
    let watchdog = Watchdog::new();
    let status_every_ms = u64::from(config.status_interval_secs) * 1_000;
    let mut last_status = clock.now_ms();

    info!("Entering main loop");
    loop {
        std::thread::sleep(Duration::from_millis(SUPERVISE_PERIOD_MS));

        // A stalled evaluator may be holding an output on; starve the
        // watchdog so the reset puts every output back to its off level.
        if service.supervise() {
            watchdog.feed();
        }

        let now = clock.now_ms();
        if now.saturating_sub(last_status) >= status_every_ms {
            service.report_status();
            last_status = now;
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `info` filter.
#[cfg(not(target_os = "espidf"))]
fn init_host_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Stored config, or defaults when storage is unavailable or invalid.
#[cfg(target_os = "espidf")]
fn load_config() -> Result<SystemConfig> {
    use netrelay::adapters::nvs::NvsAdapter;
    use netrelay::app::ports::ConfigPort;

    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            return Ok(SystemConfig::default());
        }
    };
    Ok(match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    })
}

/// JSON file from the first argument, or defaults.
#[cfg(not(target_os = "espidf"))]
fn load_config() -> Result<SystemConfig> {
    use anyhow::Context;

    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            let cfg = SystemConfig::from_json(&json).with_context(|| format!("parsing {path}"))?;
            info!("Config loaded from {}", path);
            Ok(cfg)
        }
        None => {
            info!("No config file given, using defaults");
            Ok(SystemConfig::default())
        }
    }
}

#[cfg(target_os = "espidf")]
fn start_link(wifi: &mut WifiAdapter) -> Result<()> {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::peripherals::Peripherals;

    use anyhow::Context;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    wifi.start(peripherals.modem, sysloop)
        .context("WiFi start (credentials come from NVS or NETRELAY_WIFI_* at build time)")?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn start_link(wifi: &mut WifiAdapter) -> Result<()> {
    wifi.start()?;
    Ok(())
}
