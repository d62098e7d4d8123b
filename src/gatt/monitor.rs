//! Connection lifecycle monitor.
//!
//! Link up: remember the connection, flash the top band green.
//! Link down: forget it, re-arm advertising at once, flash red.
//! The flash is posted to the display, which hands it to the flash
//! worker, so neither path blocks the stack queue.

use core::time::Duration;

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{DisplayPort, EventSink, LinkStackPort};
use crate::color::Rgb565;
use crate::config::FeedbackConfig;

use super::advertising::AdvertisingCoordinator;
use super::profile::ProfileInstance;
use super::{BdAddr, ConnId};

pub struct ConnectionMonitor {
    connect_color: Rgb565,
    disconnect_color: Rgb565,
    hold: Duration,
}

impl ConnectionMonitor {
    pub fn new(cfg: &FeedbackConfig) -> Self {
        Self {
            connect_color: cfg.connect_color,
            disconnect_color: cfg.disconnect_color,
            hold: Duration::from_millis(u64::from(cfg.hold_ms)),
        }
    }

    pub fn on_connect(
        &self,
        profile: &mut ProfileInstance,
        conn_id: ConnId,
        remote: BdAddr,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        if let Some(previous) = profile.conn_id {
            warn!(
                "LINK: connect {} while conn {} still recorded, replacing",
                conn_id, previous
            );
        }
        profile.conn_id = Some(conn_id);
        info!("LINK: up conn={} remote={}", conn_id, remote);
        sink.emit(&AppEvent::LinkUp { conn_id, remote });
        display.flash(self.connect_color, self.hold);
    }

    pub fn on_disconnect(
        &self,
        profile: &mut ProfileInstance,
        conn_id: ConnId,
        reason: u16,
        adv: &mut AdvertisingCoordinator,
        link: &mut impl LinkStackPort,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        if !profile.is_connected() {
            warn!("LINK: disconnect for conn {} with no link recorded", conn_id);
        } else if profile.conn_id != Some(conn_id) {
            warn!(
                "LINK: disconnect for conn {} (recorded {:?})",
                conn_id, profile.conn_id
            );
        }
        profile.conn_id = None;
        info!("LINK: down conn={} reason=0x{:04x}", conn_id, reason);
        sink.emit(&AppEvent::LinkDown { conn_id, reason });

        // Re-advertise before the feedback flash.
        adv.start(link, sink);
        display.flash(self.disconnect_color, self.hold);
    }
}
