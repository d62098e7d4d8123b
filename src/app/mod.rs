//! Application core: display state and the port traits around it.
//!
//! Everything here is plain Rust.  Hardware and the BLE stack are reached
//! only through the **port traits** in [`ports`], so the whole layer runs
//! in host tests against in-memory adapters.

pub mod commands;
pub mod display;
pub mod events;
pub mod ports;
