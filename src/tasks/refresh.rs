//! Periodic label refresh.

use core::time::Duration;

use crate::app::display::{lock_screen, SharedScreen};
use crate::app::ports::{LabelPort, SurfacePort};

/// Service pending label redraws every `tick`.
pub async fn refresh_loop<S, L>(screen: SharedScreen<S, L>, tick: Duration)
where
    S: SurfacePort,
    L: LabelPort,
{
    loop {
        async_io_mini::Timer::after(tick).await;
        lock_screen(&screen).refresh();
    }
}
