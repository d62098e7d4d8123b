//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements     | Connects to                     |
//! |----------------|----------------|---------------------------------|
//! | `bluedroid`    | LinkStackPort  | Bluedroid GAP / GATTS           |
//! | `framebuffer`  | SurfacePort    | In-memory pixels (host, tests)  |
//! | `label`        | LabelPort      | embedded-graphics text renderer |
//! | `log_sink`     | EventSink      | Serial log output               |
//! | `panel`        | SurfacePort    | ST7789 over SPI (`esp_lcd`)     |
//! | `time`         | -              | ESP32 system timer              |

pub mod bluedroid;
pub mod framebuffer;
pub mod label;
pub mod log_sink;
pub mod panel;
pub mod time;
