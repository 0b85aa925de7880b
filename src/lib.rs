//! NetRelay firmware library.
//!
//! A network-controlled timed actuator: a 4-byte TCP command sets how
//! long the relay stays on, and the indicator LED fades out over the
//! same window. Exposed as a library so the integration tests can drive
//! the full device against mock outputs. ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod actuator;
pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod protocol;
pub mod safety;
