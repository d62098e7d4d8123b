//! IoT display firmware library.
//!
//! Exposes the domain and adapters for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod channels;
pub mod color;
pub mod config;
pub mod error;
pub mod gatt;
pub mod pins;

pub mod adapters;
pub mod drivers;
pub mod tasks;
