//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements              | Connects to                 |
//! |------------|-------------------------|-----------------------------|
//! | `log_sink` | EventSink, LinkDelegate | Serial log output           |
//! | `nvs`      | ConfigPort              | NVS / in-memory store       |
//! | `tcp`      | (driving) listener      | lwIP / host TCP stack       |
//! | `time`     | Clock                   | ESP32 high-resolution timer |
//! | `wifi`     | (calls) LinkDelegate    | ESP-IDF WiFi STA            |

pub mod log_sink;
pub mod nvs;
pub mod tcp;
pub mod time;
pub mod wifi;
