//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::ProvisioningComplete {
                app_id,
                service_handle,
                color_handle,
                text_handle,
            } => {
                info!(
                    "PROV  | app={} | service={} color={} text={} | ready",
                    app_id, service_handle, color_handle, text_handle
                );
            }
            AppEvent::ProvisioningFailed { app_id, reason } => {
                warn!("PROV  | app={} | failed: {}", app_id, reason);
            }
            AppEvent::AdvertisingStarted => {
                info!("ADV   | started");
            }
            AppEvent::AdvertisingFailed { status } => {
                warn!("ADV   | start failed, status=0x{:02x}", status);
            }
            AppEvent::LinkUp { conn_id, remote } => {
                info!("LINK  | up | conn={} remote={}", conn_id, remote);
            }
            AppEvent::LinkDown { conn_id, reason } => {
                info!("LINK  | down | conn={} reason=0x{:04x}", conn_id, reason);
            }
            AppEvent::ColorApplied(color) => {
                info!("WRITE | color={}", color);
            }
            AppEvent::TextApplied { len } => {
                info!("WRITE | text len={}", len);
            }
            AppEvent::WriteRejected { handle, error } => {
                warn!("WRITE | handle={} rejected: {} ({})", handle, error, error.status());
            }
        }
    }
}
