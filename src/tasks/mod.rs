//! Long-running tasks.
//!
//! ```text
//!  ┌─────────────── main thread ───────────────┐   ┌──────── display thread ────────┐
//!  │ futures_lite::block_on                     │   │ futures_lite::block_on         │
//!  │  └─ Dispatcher::run                        │   │  └─ LocalExecutor              │
//!  │      STACK_EVENTS ──▶ ProfileRegistry      │   │      ├─ flash_loop  (FLASH_REQ)│
//!  │      100 ms ⏱ ──▶ provisioning deadline    │   │      └─ refresh_loop (10 ms ⏱) │
//!  └────────────────────────────────────────────┘   └────────────────────────────────┘
//! ```
//!
//! Timers come from `async-io-mini`, so no task busy-waits.

pub mod dispatch;
pub mod flash;
pub mod refresh;

use std::thread::JoinHandle;

use core::time::Duration;

use embassy_sync::channel::DynamicReceiver;
use log::info;

use crate::app::display::{FlashRequest, SharedScreen};
use crate::channels::FlashChannel;
use crate::app::ports::{LabelPort, SurfacePort};
use crate::drivers::task_pin::{spawn_on_core, Core};

/// Run the flash worker and the refresh tick on one local executor until
/// the process ends.
pub fn run_display_tasks<S, L>(
    screen: SharedScreen<S, L>,
    flashes: DynamicReceiver<'static, FlashRequest>,
    tick: Duration,
) where
    S: SurfacePort,
    L: LabelPort,
{
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    executor
        .spawn(flash::flash_loop(screen.clone(), flashes))
        .detach();
    executor
        .spawn(refresh::refresh_loop(screen, tick))
        .detach();

    info!("DISPLAY: flash worker + refresh tick ({} ms) started", tick.as_millis());
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

/// Spawn the display thread.  Runs at a lower priority than the BLE host
/// task so a long redraw never delays the stack.
///
/// Takes the channel itself: its receiver handle is not `Send`, so it is
/// taken inside the new thread.
pub fn spawn_display<S, L>(
    screen: SharedScreen<S, L>,
    flashes: &'static FlashChannel,
    tick: Duration,
) -> std::io::Result<JoinHandle<()>>
where
    S: SurfacePort + Send + 'static,
    L: LabelPort + Send + 'static,
{
    spawn_on_core(Core::Any, 5, 8, "display\0", move || {
        run_display_tasks(screen, flashes.dyn_receiver(), tick);
    })
}

#[cfg(test)]
mod tests {
    use embassy_sync::channel::Channel;

    use super::*;
    use crate::adapters::framebuffer::FrameBuffer;
    use crate::adapters::label::TextLabel;
    use crate::app::display::{lock_screen, Screen};
    use crate::app::ports::Region;
    use crate::color::Rgb565;
    use crate::config::LabelConfig;

    static FLASHES: FlashChannel = Channel::new();

    #[test]
    fn display_thread_serves_flashes() {
        let label = TextLabel::new(320, 172, &LabelConfig::default());
        let mut screen = Screen::new(FrameBuffer::new(320, 172), label, Rgb565::BLACK, 30);
        screen.show(b"Ready");
        let shared = screen.into_shared();
        let band = Region::new(0, 0, 320, 30);

        spawn_display(shared.clone(), &FLASHES, Duration::from_millis(10)).unwrap();
        FLASHES
            .try_send(FlashRequest {
                color: Rgb565::GREEN,
                hold: Duration::from_millis(200),
            })
            .unwrap();

        std::thread::sleep(Duration::from_millis(60));
        assert!(lock_screen(&shared).surface().region_is(band, Rgb565::GREEN));

        std::thread::sleep(Duration::from_millis(400));
        assert!(lock_screen(&shared).surface().region_is(band, Rgb565::BLACK));
    }
}
