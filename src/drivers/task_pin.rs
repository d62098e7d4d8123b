//! Thread spawning with explicit core affinity, priority and stack.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::Builder::spawn`
//! creates a FreeRTOS task with the requested placement.  On non-ESP
//! targets, falls back to a plain thread.
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies
//! to the *next* `pthread_create()` from the calling thread, so the
//! config→spawn pair must not be interleaved with other thread creation
//! on the same thread.

use std::io;
use std::thread::JoinHandle;

/// Where the task may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Core {
    /// Core 0 (PRO_CPU), shared with the BLE controller on dual-core parts.
    Pro,
    /// Core 1 (APP_CPU).  Only valid on dual-core parts.
    App,
    /// No affinity.  The only choice on single-core parts (C3 / C6).
    Any,
}

impl Core {
    #[cfg(target_os = "espidf")]
    fn affinity(self) -> i32 {
        match self {
            Self::Pro => 0,
            Self::App => 1,
            Self::Any => esp_idf_svc::sys::tskNO_AFFINITY as i32,
        }
    }
}

/// Spawn a thread with explicit placement, priority and stack size.
///
/// `name` must be NUL-terminated (e.g. `"dispatch\0"`); FreeRTOS keeps
/// the pointer.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by the default
    // constructor; `name` is 'static.
    unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core.affinity();
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr().cast();
        let ret = esp_idf_svc::sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(io::Error::other(format!("esp_pthread_set_cfg failed (rc={ret})")));
        }
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}

/// Simulation fallback; ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        display_name,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
