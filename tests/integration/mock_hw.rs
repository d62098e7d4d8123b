//! Mock adapters for integration tests.
//!
//! Records every stack request and display call so tests can assert on
//! the full history without a radio or a panel.

use core::time::Duration;

use iotdisplay::app::commands::TextPayload;
use iotdisplay::app::events::AppEvent;
use iotdisplay::app::ports::{DisplayPort, EventSink, LinkStackPort};
use iotdisplay::color::Rgb565;
use iotdisplay::config::DeviceConfig;
use iotdisplay::error::LinkError;
use iotdisplay::gatt::registry::ProfileRegistry;
use iotdisplay::gatt::{
    AdvertisingData, AdvertisingParams, AttrPermissions, CharProperties, ConnId, GapEvent,
    GattStatus, GattsEvent, InterfaceId, ServiceId, StackEvent, COLOR_CHAR_UUID, SERVICE_UUID,
    TEXT_CHAR_UUID,
};

// ── Link call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    RegisterApp(u16),
    SetDeviceName(String),
    ConfigureAdvData,
    CreateService { interface: InterfaceId, uuid: u16, num_handles: u16 },
    StartService(u16),
    AddCharacteristic { service_handle: u16, uuid: u16 },
    StartAdvertising,
    WriteResponse { conn_id: ConnId, trans_id: u32, status: GattStatus },
    ReadResponse { conn_id: ConnId, handle: u16, status: GattStatus, value: Vec<u8> },
    SetLocalMtu(u16),
}

// ── MockLink ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLink {
    pub calls: Vec<LinkCall>,
    /// Name of a request to refuse, e.g. `"create_service"`.
    pub refuse: Option<&'static str>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&LinkCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn advertising_requests(&self) -> usize {
        self.count(|c| matches!(c, LinkCall::StartAdvertising))
    }

    pub fn last_write_response(&self) -> Option<GattStatus> {
        self.calls.iter().rev().find_map(|c| match c {
            LinkCall::WriteResponse { status, .. } => Some(*status),
            _ => None,
        })
    }

    pub fn last_read_response(&self) -> Option<(GattStatus, Vec<u8>)> {
        self.calls.iter().rev().find_map(|c| match c {
            LinkCall::ReadResponse { status, value, .. } => Some((*status, value.clone())),
            _ => None,
        })
    }

    fn record(&mut self, op: &'static str, call: LinkCall) -> Result<(), LinkError> {
        if self.refuse == Some(op) {
            return Err(LinkError::new(op, 0x103));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl LinkStackPort for MockLink {
    fn register_app(&mut self, app_id: u16) -> Result<(), LinkError> {
        self.record("register_app", LinkCall::RegisterApp(app_id))
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), LinkError> {
        self.record("set_device_name", LinkCall::SetDeviceName(name.to_owned()))
    }

    fn configure_adv_data(&mut self, _data: &AdvertisingData) -> Result<(), LinkError> {
        self.record("configure_adv_data", LinkCall::ConfigureAdvData)
    }

    fn create_service(
        &mut self,
        interface: InterfaceId,
        service: &ServiceId,
        num_handles: u16,
    ) -> Result<(), LinkError> {
        self.record(
            "create_service",
            LinkCall::CreateService {
                interface,
                uuid: service.uuid,
                num_handles,
            },
        )
    }

    fn start_service(&mut self, service_handle: u16) -> Result<(), LinkError> {
        self.record("start_service", LinkCall::StartService(service_handle))
    }

    fn add_characteristic(
        &mut self,
        service_handle: u16,
        uuid: u16,
        perm: AttrPermissions,
        props: CharProperties,
    ) -> Result<(), LinkError> {
        assert!(perm.contains(AttrPermissions::READ | AttrPermissions::WRITE));
        assert!(props.contains(CharProperties::READ | CharProperties::WRITE));
        self.record(
            "add_characteristic",
            LinkCall::AddCharacteristic {
                service_handle,
                uuid,
            },
        )
    }

    fn start_advertising(&mut self, _params: &AdvertisingParams) -> Result<(), LinkError> {
        self.record("start_advertising", LinkCall::StartAdvertising)
    }

    fn send_write_response(
        &mut self,
        _interface: InterfaceId,
        conn_id: ConnId,
        trans_id: u32,
        status: GattStatus,
    ) -> Result<(), LinkError> {
        self.record(
            "send_write_response",
            LinkCall::WriteResponse {
                conn_id,
                trans_id,
                status,
            },
        )
    }

    fn send_read_response(
        &mut self,
        _interface: InterfaceId,
        conn_id: ConnId,
        _trans_id: u32,
        handle: u16,
        status: GattStatus,
        value: &[u8],
    ) -> Result<(), LinkError> {
        self.record(
            "send_read_response",
            LinkCall::ReadResponse {
                conn_id,
                handle,
                status,
                value: value.to_vec(),
            },
        )
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), LinkError> {
        self.record("set_local_mtu", LinkCall::SetLocalMtu(mtu))
    }
}

// ── MockDisplay ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    SetColor(Rgb565),
    SetText(Vec<u8>),
    Flash(Rgb565),
}

pub struct MockDisplay {
    pub color: Rgb565,
    pub text: TextPayload,
    pub calls: Vec<DisplayCall>,
}

#[allow(dead_code)]
impl MockDisplay {
    pub fn new() -> Self {
        Self {
            color: Rgb565::BLACK,
            text: TextPayload::new(),
            calls: Vec::new(),
        }
    }

    pub fn flashes(&self) -> Vec<Rgb565> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Flash(color) => Some(*color),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayPort for MockDisplay {
    fn set_color(&mut self, color: Rgb565) {
        self.color = color;
        self.calls.push(DisplayCall::SetColor(color));
    }

    fn set_text(&mut self, text: &[u8]) {
        self.text.clear();
        let _ = self.text.extend_from_slice(text);
        self.calls.push(DisplayCall::SetText(text.to_vec()));
    }

    fn flash(&mut self, color: Rgb565, _hold: Duration) {
        self.calls.push(DisplayCall::Flash(color));
    }

    fn current_color(&self) -> Rgb565 {
        self.color
    }

    fn current_text(&self) -> TextPayload {
        self.text.clone()
    }
}

// ── CollectingSink ────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Scenario helpers ──────────────────────────────────────────

pub const IFACE: InterfaceId = InterfaceId(3);
pub const SERVICE_HANDLE: u16 = 40;
pub const COLOR_HANDLE: u16 = 42;
pub const TEXT_HANDLE: u16 = 44;

/// Registry, mocks and the app id used by the default config.
pub struct Rig {
    pub registry: ProfileRegistry,
    pub link: MockLink,
    pub display: MockDisplay,
    pub sink: CollectingSink,
    pub app_id: u16,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        let config = DeviceConfig::default();
        Self {
            registry: ProfileRegistry::new(&config),
            link: MockLink::new(),
            display: MockDisplay::new(),
            sink: CollectingSink::default(),
            app_id: config.gatt.app_id,
        }
    }

    /// Provisioned and advertising.
    pub fn ready() -> Self {
        let mut rig = Self::new();
        rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
        for event in setup_sequence(rig.app_id) {
            rig.feed(event);
        }
        rig.feed(StackEvent::Gap(GapEvent::AdvDataSet { status: GattStatus::Ok }));
        rig.feed(StackEvent::Gap(GapEvent::AdvStarted { status: GattStatus::Ok }));
        rig
    }

    pub fn feed(&mut self, event: StackEvent) {
        self.registry
            .handle(&event, &mut self.link, &mut self.display, &mut self.sink);
    }

    pub fn gatts(&mut self, event: GattsEvent) {
        self.feed(StackEvent::Gatts {
            interface: IFACE,
            event,
        });
    }
}

/// The confirmations the stack sends for a successful setup, in order.
pub fn setup_sequence(app_id: u16) -> Vec<StackEvent> {
    let ok = GattStatus::Ok;
    vec![
        StackEvent::Gatts {
            interface: IFACE,
            event: GattsEvent::Registered { status: ok, app_id },
        },
        StackEvent::Gatts {
            interface: IFACE,
            event: GattsEvent::ServiceCreated {
                status: ok,
                service_handle: SERVICE_HANDLE,
                uuid: SERVICE_UUID,
            },
        },
        StackEvent::Gatts {
            interface: IFACE,
            event: GattsEvent::ServiceStarted {
                status: ok,
                service_handle: SERVICE_HANDLE,
            },
        },
        StackEvent::Gatts {
            interface: IFACE,
            event: GattsEvent::CharacteristicAdded {
                status: ok,
                attr_handle: COLOR_HANDLE,
                service_handle: SERVICE_HANDLE,
                uuid: COLOR_CHAR_UUID,
            },
        },
        StackEvent::Gatts {
            interface: IFACE,
            event: GattsEvent::CharacteristicAdded {
                status: ok,
                attr_handle: TEXT_HANDLE,
                service_handle: SERVICE_HANDLE,
                uuid: TEXT_CHAR_UUID,
            },
        },
    ]
}
