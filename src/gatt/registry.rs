//! Profile registry: owns every service profile and routes stack events.
//!
//! [`ProfileRegistry`] is built once at startup and moved into the
//! dispatcher, which feeds it one [`StackEvent`] at a time.  Events are
//! routed by interface id (or to every profile for the broadcast id) to
//! the provisioner, the connection monitor or the write path.  GAP events
//! go to the advertising coordinator.
//!
//! ```text
//!  StackEvent ──▶ ┌──────────────────────────────┐ ──▶ LinkStackPort
//!                 │        ProfileRegistry       │ ──▶ DisplayPort
//!                 │ Provisioner · Monitor · Adv  │ ──▶ EventSink
//!                 └──────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::app::commands::Command;
use crate::app::events::AppEvent;
use crate::app::ports::{DisplayPort, EventSink, LinkStackPort};
use crate::config::DeviceConfig;
use crate::error::LinkError;

use super::advertising::AdvertisingCoordinator;
use super::decoder;
use super::monitor::ConnectionMonitor;
use super::profile::ProfileInstance;
use super::provisioner::{ProvisionState, Provisioner};
use super::{GattStatus, GattsEvent, InterfaceId, StackEvent, WriteRequest};

/// Upper bound on concurrently registered applications.
pub const MAX_PROFILES: usize = 4;

struct ProfileSlot {
    profile: ProfileInstance,
    provisioner: Provisioner,
}

pub struct ProfileRegistry {
    slots: heapless::Vec<ProfileSlot, MAX_PROFILES>,
    config: DeviceConfig,
    adv: AdvertisingCoordinator,
    monitor: ConnectionMonitor,
}

impl ProfileRegistry {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            slots: heapless::Vec::new(),
            adv: AdvertisingCoordinator::new(&config.advertising),
            monitor: ConnectionMonitor::new(&config.feedback),
            config: config.clone(),
        }
    }

    // ── Registration ──────────────────────────────────────────

    /// Allocate a profile for `app_id` and request its registration.
    ///
    /// The profile has no valid handle until the stack confirms each step.
    pub fn register(
        &mut self,
        app_id: u16,
        link: &mut impl LinkStackPort,
        now_ms: u64,
    ) -> Result<(), LinkError> {
        if self.slots.iter().any(|s| s.profile.app_id == app_id) {
            warn!("REG: app {} already registered", app_id);
            return Ok(());
        }
        let slot = ProfileSlot {
            profile: ProfileInstance::new(app_id),
            provisioner: Provisioner::new(&self.config.gatt),
        };
        if self.slots.push(slot).is_err() {
            return Err(LinkError::new("register_app: profile table full", -1));
        }
        let Some(slot) = self.slots.last_mut() else {
            return Err(LinkError::new("register_app: profile table full", -1));
        };
        slot.provisioner.begin(&slot.profile, link, now_ms)?;

        if let Err(e) = link.set_local_mtu(self.config.gatt.local_mtu) {
            warn!("REG: local MTU {} not applied: {}", self.config.gatt.local_mtu, e);
        }
        Ok(())
    }

    // ── Routing ───────────────────────────────────────────────

    /// Handle one stack event.  Must be called from a single context so
    /// that each handle is recorded before any write that uses it.
    pub fn handle(
        &mut self,
        event: &StackEvent,
        link: &mut impl LinkStackPort,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            StackEvent::Gap(gap) => self.adv.on_gap_event(gap, link, sink),
            StackEvent::Gatts { interface, event } => {
                self.route_gatts(*interface, event, link, display, sink)
            }
        }
    }

    fn route_gatts(
        &mut self,
        interface: InterfaceId,
        event: &GattsEvent,
        link: &mut impl LinkStackPort,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        // Registration is the one event matched by app id: the interface
        // is what it assigns.
        if let GattsEvent::Registered { status, app_id } = *event {
            match self.slots.iter_mut().find(|s| s.profile.app_id == app_id) {
                Some(slot) => slot.provisioner.on_registered(
                    &mut slot.profile,
                    interface,
                    status,
                    link,
                    &mut self.adv,
                    sink,
                ),
                None => warn!("REG: registration for unknown app {}", app_id),
            }
            return;
        }

        let mut routed = false;
        for slot in self.slots.iter_mut() {
            if !slot.profile.accepts(interface) {
                continue;
            }
            routed = true;
            let ProfileSlot {
                profile,
                provisioner,
            } = slot;
            match event {
                GattsEvent::Registered { .. } => {}
                GattsEvent::ServiceCreated {
                    status,
                    service_handle,
                    uuid,
                } => provisioner.on_service_created(profile, *status, *service_handle, *uuid, link, sink),
                GattsEvent::ServiceStarted {
                    status,
                    service_handle,
                } => {
                    if status.is_ok() {
                        info!("REG[{}]: service {} started", profile.app_id, service_handle);
                    } else {
                        warn!(
                            "REG[{}]: service {} failed to start ({})",
                            profile.app_id, service_handle, status
                        );
                    }
                }
                GattsEvent::CharacteristicAdded {
                    status,
                    attr_handle,
                    uuid,
                    ..
                } => provisioner.on_characteristic_added(profile, *status, *attr_handle, *uuid, link, sink),
                GattsEvent::Connected { conn_id, remote } => {
                    self.adv.on_link_up();
                    self.monitor.on_connect(profile, *conn_id, *remote, display, sink);
                }
                GattsEvent::Disconnected {
                    conn_id, reason, ..
                } => self.monitor.on_disconnect(
                    profile,
                    *conn_id,
                    *reason,
                    &mut self.adv,
                    link,
                    display,
                    sink,
                ),
                GattsEvent::Read {
                    conn_id,
                    trans_id,
                    handle,
                    offset,
                    need_rsp,
                } => {
                    if *need_rsp {
                        let read = ReadRequest {
                            conn_id: *conn_id,
                            trans_id: *trans_id,
                            handle: *handle,
                            offset: *offset,
                        };
                        on_read(profile, interface, &read, link, display);
                    }
                }
                GattsEvent::Write(req) => on_write(profile, interface, req, link, display, sink),
                GattsEvent::MtuChanged { conn_id, mtu } => {
                    info!("REG[{}]: conn {} MTU {}", profile.app_id, conn_id, mtu);
                }
            }
        }
        if !routed {
            debug!("REG: no profile for {}, event dropped", interface);
        }
    }

    // ── Deadline ──────────────────────────────────────────────

    /// Fail every profile that has not reached `Ready` in time.
    pub fn poll_deadlines(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        for slot in self.slots.iter_mut() {
            slot.provisioner.poll_deadline(&slot.profile, now_ms, sink);
        }
    }

    /// `true` once no profile is still provisioning.
    pub fn is_settled(&self) -> bool {
        self.slots.iter().all(|s| s.provisioner.state().is_terminal())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn profile(&self, app_id: u16) -> Option<&ProfileInstance> {
        self.slots
            .iter()
            .find(|s| s.profile.app_id == app_id)
            .map(|s| &s.profile)
    }

    pub fn state(&self, app_id: u16) -> Option<ProvisionState> {
        self.slots
            .iter()
            .find(|s| s.profile.app_id == app_id)
            .map(|s| s.provisioner.state())
    }

    pub fn advertising(&self) -> &AdvertisingCoordinator {
        &self.adv
    }
}

// ───────────────────────────────────────────────────────────────
// Read path
// ───────────────────────────────────────────────────────────────

struct ReadRequest {
    conn_id: u16,
    trans_id: u32,
    handle: u16,
    offset: u16,
}

/// Answer a read with the current colour (big-endian RGB565) or text.
fn on_read(
    profile: &ProfileInstance,
    interface: InterfaceId,
    req: &ReadRequest,
    link: &mut impl LinkStackPort,
    display: &impl DisplayPort,
) {
    let handles = profile.handles();
    let text;
    let color;
    let value: &[u8] = if handles.color == Some(req.handle) {
        color = display.current_color().raw().to_be_bytes();
        &color[..]
    } else if handles.text == Some(req.handle) {
        text = display.current_text();
        text.as_slice()
    } else {
        &[]
    };

    let offset = usize::from(req.offset);
    let (status, slice) = if handles.color != Some(req.handle) && handles.text != Some(req.handle) {
        (GattStatus::InvalidHandle, &[][..])
    } else if offset > value.len() {
        (GattStatus::InvalidOffset, &[][..])
    } else {
        (GattStatus::Ok, &value[offset..])
    };

    let interface = profile.interface.unwrap_or(interface);
    if let Err(e) = link.send_read_response(interface, req.conn_id, req.trans_id, req.handle, status, slice) {
        warn!("READ: response to conn {} failed: {}", req.conn_id, e);
    }
}

// ───────────────────────────────────────────────────────────────
// Write path
// ───────────────────────────────────────────────────────────────

/// Decode, apply, then acknowledge.  The display change is complete
/// before the response goes out.
fn on_write(
    profile: &ProfileInstance,
    interface: InterfaceId,
    req: &WriteRequest,
    link: &mut impl LinkStackPort,
    display: &mut impl DisplayPort,
    sink: &mut impl EventSink,
) {
    let status = if req.is_prep {
        warn!(
            "WRITE: prepared write to handle {} (offset {}) not supported",
            req.handle, req.offset
        );
        GattStatus::RequestNotSupported
    } else {
        match decoder::decode(req.handle, &req.value, req.len, &profile.handles()) {
            Ok(cmd) => {
                cmd.apply(display);
                match &cmd {
                    Command::SetText(text) => sink.emit(&AppEvent::TextApplied { len: text.len() }),
                    _ => sink.emit(&AppEvent::ColorApplied(display.current_color())),
                }
                GattStatus::Ok
            }
            Err(e) => {
                warn!("WRITE: handle {} rejected: {}", req.handle, e);
                sink.emit(&AppEvent::WriteRejected {
                    handle: req.handle,
                    error: e,
                });
                e.status()
            }
        }
    };

    if !req.need_rsp {
        return;
    }
    let interface = profile.interface.unwrap_or(interface);
    if let Err(e) = link.send_write_response(interface, req.conn_id, req.trans_id, status) {
        warn!("WRITE: response to conn {} failed: {}", req.conn_id, e);
    }
}
