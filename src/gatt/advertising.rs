//! Advertising payload and the coordinator that starts advertising.
//!
//! Advertising may only start once the stack has applied the payload, so
//! the coordinator tracks an outstanding configuration and issues the
//! first start request from the `AdvDataSet` confirmation.  After that,
//! advertising is restarted on every disconnect.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, LinkStackPort};
use crate::config::AdvertisingConfig;
use crate::error::LinkError;

use super::{GapEvent, SERVICE_UUID};

/// LE General Discoverable Mode.
pub const ADV_FLAG_GEN_DISC: u8 = 0x02;
/// BR/EDR not supported.
pub const ADV_FLAG_BREDR_NOT_SPT: u8 = 0x04;

/// Bluetooth base UUID, least significant byte first.  Bytes 12..14 hold
/// the 16-bit alias.
const BASE_UUID_LE: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Expand a 16-bit UUID onto the base UUID (little-endian byte order).
pub const fn uuid16_to_128_le(uuid: u16) -> [u8; 16] {
    let mut out = BASE_UUID_LE;
    let le = uuid.to_le_bytes();
    out[12] = le[0];
    out[13] = le[1];
    out
}

/// Advertising data (not scan response).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingData {
    pub include_name: bool,
    pub include_tx_power: bool,
    /// Preferred connection interval, 1.25 ms units.
    pub min_interval: u16,
    pub max_interval: u16,
    pub appearance: u16,
    pub service_uuid128: [u8; 16],
    pub flags: u8,
}

impl AdvertisingData {
    pub fn from_config(cfg: &AdvertisingConfig) -> Self {
        Self {
            include_name: true,
            include_tx_power: cfg.include_tx_power,
            min_interval: cfg.min_conn_interval,
            max_interval: cfg.max_conn_interval,
            appearance: 0,
            service_uuid128: uuid16_to_128_le(SERVICE_UUID),
            flags: ADV_FLAG_GEN_DISC | ADV_FLAG_BREDR_NOT_SPT,
        }
    }
}

/// Connectable undirected advertising on all channels from the public
/// address, no filter.  Only the interval is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParams {
    /// 0.625 ms units.
    pub interval_min: u16,
    pub interval_max: u16,
}

impl AdvertisingParams {
    pub fn from_config(cfg: &AdvertisingConfig) -> Self {
        Self {
            interval_min: cfg.adv_interval_min,
            interval_max: cfg.adv_interval_max,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Coordinator
// ───────────────────────────────────────────────────────────────

pub struct AdvertisingCoordinator {
    name: heapless::String<29>,
    data: AdvertisingData,
    params: AdvertisingParams,
    data_pending: bool,
    active: bool,
}

impl AdvertisingCoordinator {
    pub fn new(cfg: &AdvertisingConfig) -> Self {
        Self {
            name: cfg.device_name.clone(),
            data: AdvertisingData::from_config(cfg),
            params: AdvertisingParams::from_config(cfg),
            data_pending: false,
            active: false,
        }
    }

    pub fn data(&self) -> &AdvertisingData {
        &self.data
    }

    pub fn params(&self) -> &AdvertisingParams {
        &self.params
    }

    /// Payload submitted but not yet confirmed.
    pub fn is_data_pending(&self) -> bool {
        self.data_pending
    }

    /// Last known advertising state reported by the stack.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set the device name and submit the advertising payload.
    pub fn configure(&mut self, link: &mut impl LinkStackPort) -> Result<(), LinkError> {
        link.set_device_name(&self.name)?;
        link.configure_adv_data(&self.data)?;
        self.data_pending = true;
        info!("ADV: payload submitted for '{}'", self.name);
        Ok(())
    }

    /// Request advertising start.  Failures are logged and reported.
    pub fn start(&mut self, link: &mut impl LinkStackPort, sink: &mut impl EventSink) {
        if let Err(e) = link.start_advertising(&self.params) {
            warn!("ADV: start request rejected: {}", e);
            sink.emit(&AppEvent::AdvertisingFailed {
                status: e.code as u8,
            });
        }
    }

    pub fn on_gap_event(
        &mut self,
        event: &GapEvent,
        link: &mut impl LinkStackPort,
        sink: &mut impl EventSink,
    ) {
        match *event {
            GapEvent::AdvDataSet { status } => {
                if !self.data_pending {
                    warn!("ADV: unexpected payload confirmation ({})", status);
                    return;
                }
                self.data_pending = false;
                if status.is_ok() {
                    self.start(link, sink);
                } else {
                    warn!("ADV: payload rejected ({})", status);
                    sink.emit(&AppEvent::AdvertisingFailed {
                        status: status.raw(),
                    });
                }
            }
            GapEvent::ScanResponseSet { status } => {
                info!("ADV: scan response set ({})", status);
            }
            GapEvent::AdvStarted { status } => {
                if status.is_ok() {
                    self.active = true;
                    info!("ADV: advertising started");
                    sink.emit(&AppEvent::AdvertisingStarted);
                } else {
                    warn!("ADV: advertising start failed ({})", status);
                    sink.emit(&AppEvent::AdvertisingFailed {
                        status: status.raw(),
                    });
                }
            }
            GapEvent::AdvStopped { status } => {
                if status.is_ok() {
                    self.active = false;
                    info!("ADV: advertising stopped");
                } else {
                    warn!("ADV: advertising stop failed ({})", status);
                }
            }
            GapEvent::ConnParamsUpdated {
                status,
                remote,
                min_int,
                max_int,
                conn_int,
                latency,
                timeout,
            } => {
                info!(
                    "GAP: conn params {} status={} min={} max={} int={} latency={} timeout={}",
                    remote, status, min_int, max_int, conn_int, latency, timeout
                );
            }
        }
    }

    /// Forget the running state after the link took over the radio.
    pub(crate) fn on_link_up(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_uuid_on_base() {
        let uuid = uuid16_to_128_le(0x00FF);
        assert_eq!(uuid[12], 0xFF);
        assert_eq!(uuid[13], 0x00);
        assert_eq!(&uuid[..4], &[0xFB, 0x34, 0x9B, 0x5F]);
    }

    #[test]
    fn default_payload() {
        let data = AdvertisingData::from_config(&AdvertisingConfig::default());
        assert!(data.include_name);
        assert_eq!(data.flags, 0x06);
        assert_eq!((data.min_interval, data.max_interval), (0x0006, 0x0010));
        let params = AdvertisingParams::from_config(&AdvertisingConfig::default());
        assert_eq!((params.interval_min, params.interval_max), (0x20, 0x40));
    }
}
