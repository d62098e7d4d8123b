//! Flash worker: paints the feedback band, holds, restores.
//!
//! The screen lock is released for the hold, so writes keep flowing and
//! the restore picks up whatever colour is current by then.

use embassy_sync::channel::DynamicReceiver;
use log::debug;

use crate::app::display::{lock_screen, FlashRequest, SharedScreen};
use crate::app::ports::{LabelPort, SurfacePort};

pub async fn flash_loop<S, L>(screen: SharedScreen<S, L>, requests: DynamicReceiver<'static, FlashRequest>)
where
    S: SurfacePort,
    L: LabelPort,
{
    loop {
        let req = requests.receive().await;
        debug!("FLASH: {} for {} ms", req.color, req.hold.as_millis());
        lock_screen(&screen).paint_band(req.color);
        async_io_mini::Timer::after(req.hold).await;
        lock_screen(&screen).restore_band();
    }
}
