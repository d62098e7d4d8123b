//! Inter-task channels.
//!
//! Uses `embassy-sync` bounded channels so the Bluedroid callbacks, the
//! dispatcher and the flash worker share queues without heap allocation.
//!
//! ```text
//! ┌──────────────┐  StackEvent   ┌────────────┐  FlashRequest  ┌──────────────┐
//! │  Bluedroid   │──────────────▶│ Dispatcher │───────────────▶│ Flash worker │
//! │  callbacks   │               │  (serial)  │                │  (timer)     │
//! └──────────────┘               └────────────┘                └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::debug;

use crate::app::display::FlashRequest;
use crate::gatt::StackEvent;

/// Stack events queued between the callback context and the dispatcher.
const STACK_EVENT_DEPTH: usize = 16;

/// Pending flashes.  A connect and a disconnect flash can both be waiting.
pub const FLASH_DEPTH: usize = 4;

pub type FlashChannel = Channel<CriticalSectionRawMutex, FlashRequest, FLASH_DEPTH>;

/// Bluedroid callbacks → dispatcher.
pub static STACK_EVENTS: Channel<CriticalSectionRawMutex, StackEvent, STACK_EVENT_DEPTH> =
    Channel::new();

/// Display controller → flash worker.
pub static FLASH_REQUESTS: FlashChannel = Channel::new();

/// Queue a stack event.  Never drops: when the queue is full the caller
/// waits for the dispatcher to make room, so the stack delivers events in
/// order and a disconnect cannot be lost behind a burst of writes.
pub fn post_stack_event(event: StackEvent) {
    match STACK_EVENTS.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            debug!("CHAN: stack event queue full, waiting for dispatcher");
            futures_lite::future::block_on(STACK_EVENTS.send(event));
        }
    }
}
