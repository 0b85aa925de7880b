//! Output drivers, hardware initialisation, and platform helpers.

pub mod hw_init;
pub mod output;
pub mod task_pin;
pub mod watchdog;
