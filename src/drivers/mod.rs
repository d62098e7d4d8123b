//! Low-level board drivers.
//!
//! | Driver      | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `hw_init`   | Backlight GPIO bring-up                        |
//! | `task_pin`  | Thread spawn with core / priority / stack      |
//! | `runtime`   | Critical section + timer driver on ESP-IDF     |

pub mod hw_init;
pub mod runtime;
pub mod task_pin;
