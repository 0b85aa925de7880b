//! Unified error types for the NetRelay firmware.
//!
//! A single `Error` enum that every subsystem converts into. Variants are
//! `Copy` and carry no heap data.
//!
//! Which errors are fatal is decided by the caller, not the type:
//! hardware writes and listener failures abort the process, malformed
//! frames and per-connection I/O errors never leave their handler.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An actuator output could not be written.
    Hardware(HardwareError),
    /// The TCP listener could not be set up or stopped accepting.
    Listener(ListenerError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Listener(e) => write!(f, "listener: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

/// Failure to commit a channel's state to its physical output. Always fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// Digital output write failed.
    GpioWrite { channel: &'static str },
    /// PWM duty-cycle write failed.
    PwmWrite { channel: &'static str },
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWrite { channel } => write!(f, "GPIO write failed on '{channel}'"),
            Self::PwmWrite { channel } => write!(f, "PWM write failed on '{channel}'"),
        }
    }
}

impl std::error::Error for HardwareError {}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame length differs from the fixed command size.
    BadLength { got: usize, expected: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength { got, expected } => {
                write!(f, "received {got} bytes instead of {expected}")
            }
        }
    }
}

/// Frame errors are per-frame and never leave the connection handler,
/// so there is no `Error` variant for them.
impl std::error::Error for FrameError {}

// ---------------------------------------------------------------------------
// Listener errors
// ---------------------------------------------------------------------------

/// Socket-level failures. The device cannot serve without its socket,
/// so every variant is treated as unrecoverable by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerError {
    Bind { port: u16 },
    Accept,
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { port } => write!(f, "bind/listen on port {port} failed"),
            Self::Accept => write!(f, "accept failed"),
        }
    }
}

impl std::error::Error for ListenerError {}

impl From<ListenerError> for Error {
    fn from(e: ListenerError) -> Self {
        Self::Listener(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
