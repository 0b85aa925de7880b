//! Port traits: the hexagonal boundary between the timing engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ actuator / protocol core
//! ```
//!
//! Driven adapters (clock, event sinks, config storage, link events)
//! implement these traits. The core consumes them via generics or
//! `Arc<dyn ...>`, so it never touches ESP-IDF directly.
//!
//! Ports shared with connection and evaluator threads take `&self` and
//! are `Send + Sync`; implementations do their own interior locking.

use core::net::Ipv4Addr;

use crate::config::SystemConfig;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.
///
/// Every deadline in the system is expressed in this clock's units, so a
/// channel never mixes time sources.
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin (boot). Never decreases.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: core ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting; invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Link delegate (decouples the WiFi driver from its consumers)
// ───────────────────────────────────────────────────────────────

/// Station link lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Station interface started; association is about to be attempted.
    Started,
    /// Association lost; the adapter will retry.
    Disconnected,
    /// An IPv4 address is bound (DHCP lease or static assignment).
    GotIp(Ipv4Addr),
}

/// Callback trait the link adapter invokes on every [`LinkEvent`].
///
/// Injected at construction instead of registering a global handler,
/// so the context travels with the trait object.
pub trait LinkDelegate: Send + Sync {
    fn on_link_event(&self, event: LinkEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::IoError => Self::Config("storage I/O error"),
        }
    }
}
