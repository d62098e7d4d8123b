//! Outbound application events.
//!
//! The registry and the display controller emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log to serial, count them in tests).

use crate::color::Rgb565;
use crate::gatt::decoder::DecodeError;
use crate::gatt::provisioner::ProvisionFailure;
use crate::gatt::{BdAddr, ConnId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Service and both characteristics are live.
    ProvisioningComplete {
        app_id: u16,
        service_handle: u16,
        color_handle: u16,
        text_handle: u16,
    },

    /// Provisioning was abandoned for this application id.
    ProvisioningFailed { app_id: u16, reason: ProvisionFailure },

    /// The stack confirmed advertising is running.
    AdvertisingStarted,

    /// Advertising could not be (re)started.
    AdvertisingFailed { status: u8 },

    /// A central connected.
    LinkUp { conn_id: ConnId, remote: BdAddr },

    /// The central went away.
    LinkDown { conn_id: ConnId, reason: u16 },

    /// A colour write was applied.
    ColorApplied(Rgb565),

    /// A text write was applied.
    TextApplied { len: usize },

    /// A write was decoded into an error and left the display unchanged.
    WriteRejected { handle: u16, error: DecodeError },
}
