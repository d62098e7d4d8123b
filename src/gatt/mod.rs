//! GATT domain: identifiers, stack events and the state machines that
//! consume them.
//!
//! ```text
//!  Bluedroid callbacks ──▶ StackEvent ──▶ ProfileRegistry
//!                                           ├─▶ Provisioner   (setup)
//!                                           ├─▶ Monitor       (link up/down)
//!                                           ├─▶ decoder       (writes)
//!                                           └─▶ Advertising   (GAP)
//! ```
//!
//! Nothing in here touches ESP-IDF.  The raw callback parameters are
//! translated into [`StackEvent`] by the Bluedroid adapter; everything
//! downstream is plain Rust and runs on the host.

use core::fmt;
use core::ops::BitOr;

pub mod advertising;
pub mod decoder;
pub mod monitor;
pub mod profile;
pub mod provisioner;
pub mod registry;

pub use advertising::{AdvertisingData, AdvertisingParams};

// ───────────────────────────────────────────────────────────────
// Service layout
// ───────────────────────────────────────────────────────────────

/// Primary service UUID (16-bit).
pub const SERVICE_UUID: u16 = 0x00FF;
/// Background colour characteristic.
pub const COLOR_CHAR_UUID: u16 = 0xFF01;
/// Label text characteristic.
pub const TEXT_CHAR_UUID: u16 = 0xFF02;

/// Largest write payload copied out of the callback context.  Covers the
/// 500-byte local MTU.
pub const MAX_WRITE_LEN: usize = 512;

/// Connection id assigned by the stack.
pub type ConnId = u16;

/// Interface id the stack assigns to a registered application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub u8);

impl InterfaceId {
    /// Broadcast value: the event concerns every registered profile.
    pub const NONE: Self = Self(0xFF);

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            write!(f, "if=*")
        } else {
            write!(f, "if={}", self.0)
        }
    }
}

/// Identity of a GATT service as passed to service creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceId {
    pub uuid: u16,
    pub is_primary: bool,
    pub inst_id: u8,
}

impl ServiceId {
    pub const fn primary(uuid: u16) -> Self {
        Self {
            uuid,
            is_primary: true,
            inst_id: 0,
        }
    }
}

/// Bluetooth device address, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Permission / property bits
// ───────────────────────────────────────────────────────────────

/// Attribute permission bits, laid out like `esp_gatt_perm_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrPermissions(pub u16);

impl AttrPermissions {
    pub const READ: Self = Self(1 << 0);
    pub const WRITE: Self = Self(1 << 4);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for AttrPermissions {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Characteristic property bits, laid out like `esp_gatt_char_prop_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharProperties(pub u8);

impl CharProperties {
    pub const READ: Self = Self(1 << 1);
    pub const WRITE: Self = Self(1 << 3);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CharProperties {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Status codes
// ───────────────────────────────────────────────────────────────

/// ATT / GATT status carried by confirmations and write responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Ok,
    InvalidHandle,
    RequestNotSupported,
    InvalidOffset,
    InvalidAttrLen,
    Error,
    IllegalParameter,
    Other(u8),
}

impl GattStatus {
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Self::Ok,
            0x01 => Self::InvalidHandle,
            0x06 => Self::RequestNotSupported,
            0x07 => Self::InvalidOffset,
            0x0D => Self::InvalidAttrLen,
            0x85 => Self::Error,
            0x87 => Self::IllegalParameter,
            other => Self::Other(other),
        }
    }

    pub const fn raw(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::InvalidHandle => 0x01,
            Self::RequestNotSupported => 0x06,
            Self::InvalidOffset => 0x07,
            Self::InvalidAttrLen => 0x0D,
            Self::Error => 0x85,
            Self::IllegalParameter => 0x87,
            Self::Other(raw) => raw,
        }
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for GattStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02x})", self, self.raw())
    }
}

// ───────────────────────────────────────────────────────────────
// Stack events
// ───────────────────────────────────────────────────────────────

/// One characteristic write, copied out of the callback context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub conn_id: ConnId,
    pub trans_id: u32,
    pub handle: u16,
    pub offset: u16,
    pub need_rsp: bool,
    /// Part of a queued (prepared) write.
    pub is_prep: bool,
    /// Length reported by the stack.  May exceed `value.len()` when the
    /// payload did not fit the copy buffer.
    pub len: usize,
    pub value: heapless::Vec<u8, MAX_WRITE_LEN>,
}

impl WriteRequest {
    /// Build a request from a raw payload, keeping the full reported length.
    pub fn new(conn_id: ConnId, trans_id: u32, handle: u16, payload: &[u8]) -> Self {
        let mut value = heapless::Vec::new();
        let copied = payload.len().min(MAX_WRITE_LEN);
        // Cannot fail: `copied` is bounded by the capacity.
        let _ = value.extend_from_slice(&payload[..copied]);
        Self {
            conn_id,
            trans_id,
            handle,
            offset: 0,
            need_rsp: true,
            is_prep: false,
            len: payload.len(),
            value,
        }
    }
}

/// GATT server events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattsEvent {
    Registered {
        status: GattStatus,
        app_id: u16,
    },
    ServiceCreated {
        status: GattStatus,
        service_handle: u16,
        uuid: u16,
    },
    ServiceStarted {
        status: GattStatus,
        service_handle: u16,
    },
    CharacteristicAdded {
        status: GattStatus,
        attr_handle: u16,
        service_handle: u16,
        uuid: u16,
    },
    Connected {
        conn_id: ConnId,
        remote: BdAddr,
    },
    Disconnected {
        conn_id: ConnId,
        remote: BdAddr,
        reason: u16,
    },
    Read {
        conn_id: ConnId,
        trans_id: u32,
        handle: u16,
        offset: u16,
        need_rsp: bool,
    },
    Write(WriteRequest),
    MtuChanged {
        conn_id: ConnId,
        mtu: u16,
    },
}

/// GAP (advertising / link parameter) events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapEvent {
    AdvDataSet { status: GattStatus },
    ScanResponseSet { status: GattStatus },
    AdvStarted { status: GattStatus },
    AdvStopped { status: GattStatus },
    ConnParamsUpdated {
        status: GattStatus,
        remote: BdAddr,
        min_int: u16,
        max_int: u16,
        conn_int: u16,
        latency: u16,
        timeout: u16,
    },
}

/// Everything the stack callbacks deliver, in one queueable type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    Gatts {
        interface: InterfaceId,
        event: GattsEvent,
    },
    Gap(GapEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_raw_roundtrip_known_codes() {
        for raw in [0x00, 0x01, 0x03, 0x06, 0x07, 0x0D, 0x85, 0x87, 0xFF, 0x42] {
            assert_eq!(GattStatus::from_raw(raw).raw(), raw);
        }
        assert_eq!(GattStatus::from_raw(0x42), GattStatus::Other(0x42));
        assert_eq!(GattStatus::from_raw(0x03), GattStatus::Other(0x03));
        assert!(GattStatus::from_raw(0).is_ok());
    }

    #[test]
    fn read_write_bits_combine() {
        let perm = AttrPermissions::READ | AttrPermissions::WRITE;
        assert_eq!(perm.0, 0x11);
        assert!(perm.contains(AttrPermissions::WRITE));
        let props = CharProperties::READ | CharProperties::WRITE;
        assert_eq!(props.0, 0x0A);
        assert!(!CharProperties::READ.contains(props));
    }

    #[test]
    fn oversize_write_keeps_reported_length() {
        let payload = [0x41u8; 600];
        let req = WriteRequest::new(0, 1, 42, &payload);
        assert_eq!(req.len, 600);
        assert_eq!(req.value.len(), MAX_WRITE_LEN);
    }

    #[test]
    fn broadcast_interface() {
        assert!(InterfaceId::NONE.is_broadcast());
        assert!(!InterfaceId(3).is_broadcast());
    }

    #[test]
    fn bdaddr_display() {
        let a = BdAddr([0xAA, 0xBB, 0xCC, 0x01, 0x02, 0x03]);
        assert_eq!(a.to_string(), "aa:bb:cc:01:02:03");
    }
}
