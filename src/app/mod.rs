//! Application boundary: ports, the events that cross them, and the
//! service that ties the actuator and protocol layers together.
//!
//! All interaction with the platform happens through **port traits**
//! defined in [`ports`], keeping the actuator and protocol layers fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
