//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements      | Connects to                         |
//! |------------|-----------------|-------------------------------------|
//! | `display`  | DisplayPort     | UiModel → worker (Signal) → SSD1306 |
//! | `hid`      | HidPort         | Report outbox → HidLink (TinyUSB)   |
//! | `http`     | NetworkPort     | Skylight + Hue HTTP (Channel)       |
//! | `log_sink` | EventSink       | Serial log output                   |
//! | `time`     | MonotonicClock  | ESP32 system timer, SNTP wall clock |

pub mod display;
pub mod hid;
pub mod http;
pub mod log_sink;
pub mod time;
