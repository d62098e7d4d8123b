//! Service provisioning state machine.
//!
//! ```text
//!  Unregistered ──Registered──▶ Registered ──ServiceCreated──▶ ServiceCreated
//!        │                                                          │
//!        │                                       CharacteristicAdded(0xFF01)
//!        │                                                          ▼
//!        │          Ready ◀──CharacteristicAdded(0xFF02)──── ColorAttrAdded
//!        │
//!        └──────(failure status · rejected request · deadline)──▶ Failed
//! ```
//!
//! Each transition fires only on the confirmation the current state is
//! waiting for, and the next request is issued only after the confirmed
//! handle has been stored.  Anything else is a protocol error: logged and
//! dropped, the state does not move.  `Ready` and `Failed` are terminal.

use core::fmt;

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, LinkStackPort};
use crate::config::GattConfig;
use crate::error::LinkError;

use super::advertising::AdvertisingCoordinator;
use super::profile::ProfileInstance;
use super::{
    AttrPermissions, CharProperties, GattStatus, InterfaceId, ServiceId, COLOR_CHAR_UUID,
    SERVICE_UUID, TEXT_CHAR_UUID,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Unregistered,
    Registered,
    ServiceCreated,
    ColorAttrAdded,
    Ready,
    Failed,
}

impl ProvisionState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Why provisioning was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionFailure {
    /// The stack confirmed a step with a failure status.
    Rejected { state: ProvisionState, status: u8 },
    /// A request was refused outright.
    Request(LinkError),
    /// `Ready` was not reached in time.
    DeadlineExpired { state: ProvisionState },
}

impl fmt::Display for ProvisionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { state, status } => {
                write!(f, "stack rejected step in {state:?} (status=0x{status:02x})")
            }
            Self::Request(e) => write!(f, "{e}"),
            Self::DeadlineExpired { state } => write!(f, "deadline expired in {state:?}"),
        }
    }
}

/// Permissions shared by both characteristics.
const ATTR_PERM: AttrPermissions =
    AttrPermissions(AttrPermissions::READ.0 | AttrPermissions::WRITE.0);
const ATTR_PROPS: CharProperties = CharProperties(CharProperties::READ.0 | CharProperties::WRITE.0);

pub struct Provisioner {
    state: ProvisionState,
    service: ServiceId,
    num_handles: u16,
    deadline_ms: u64,
    /// Set when registration is requested.
    started_at_ms: Option<u64>,
}

impl Provisioner {
    pub fn new(cfg: &GattConfig) -> Self {
        Self {
            state: ProvisionState::Unregistered,
            service: ServiceId::primary(SERVICE_UUID),
            num_handles: cfg.num_handles,
            deadline_ms: cfg.provisioning_deadline_ms,
            started_at_ms: None,
        }
    }

    pub fn state(&self) -> ProvisionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ProvisionState::Ready
    }

    // ── Requests ──────────────────────────────────────────────

    /// Request registration.  No handle is valid yet; the deadline starts
    /// now.
    pub fn begin(
        &mut self,
        profile: &ProfileInstance,
        link: &mut impl LinkStackPort,
        now_ms: u64,
    ) -> Result<(), LinkError> {
        self.started_at_ms = Some(now_ms);
        link.register_app(profile.app_id)?;
        info!("PROV[{}]: registration requested", profile.app_id);
        Ok(())
    }

    // ── Confirmations ─────────────────────────────────────────

    pub fn on_registered(
        &mut self,
        profile: &mut ProfileInstance,
        interface: InterfaceId,
        status: GattStatus,
        link: &mut impl LinkStackPort,
        adv: &mut AdvertisingCoordinator,
        sink: &mut impl EventSink,
    ) {
        if !self.expect(ProvisionState::Unregistered, "registration", profile.app_id) {
            return;
        }
        if !status.is_ok() {
            self.fail(profile, ProvisionFailure::Rejected { state: self.state, status: status.raw() }, sink);
            return;
        }

        profile.interface = Some(interface);
        self.state = ProvisionState::Registered;
        info!("PROV[{}]: registered ({})", profile.app_id, interface);

        // Advertising is independent of the service; a rejected payload is
        // only logged and provisioning carries on.
        if let Err(e) = adv.configure(link) {
            warn!("PROV[{}]: advertising setup failed: {}", profile.app_id, e);
        }

        if let Err(e) = link.create_service(interface, &self.service, self.num_handles) {
            self.fail(profile, ProvisionFailure::Request(e), sink);
        }
    }

    pub fn on_service_created(
        &mut self,
        profile: &mut ProfileInstance,
        status: GattStatus,
        service_handle: u16,
        uuid: u16,
        link: &mut impl LinkStackPort,
        sink: &mut impl EventSink,
    ) {
        if uuid != self.service.uuid {
            warn!("PROV[{}]: service created for foreign uuid 0x{:04x}", profile.app_id, uuid);
            return;
        }
        if !self.expect(ProvisionState::Registered, "service creation", profile.app_id) {
            return;
        }
        if !status.is_ok() {
            self.fail(profile, ProvisionFailure::Rejected { state: self.state, status: status.raw() }, sink);
            return;
        }

        profile.service_handle = Some(service_handle);
        self.state = ProvisionState::ServiceCreated;
        info!("PROV[{}]: service created (handle={})", profile.app_id, service_handle);

        let requested = link
            .start_service(service_handle)
            .and_then(|()| link.add_characteristic(service_handle, COLOR_CHAR_UUID, ATTR_PERM, ATTR_PROPS));
        if let Err(e) = requested {
            self.fail(profile, ProvisionFailure::Request(e), sink);
        }
    }

    pub fn on_characteristic_added(
        &mut self,
        profile: &mut ProfileInstance,
        status: GattStatus,
        attr_handle: u16,
        uuid: u16,
        link: &mut impl LinkStackPort,
        sink: &mut impl EventSink,
    ) {
        let waiting_for = match self.state {
            ProvisionState::ServiceCreated => COLOR_CHAR_UUID,
            ProvisionState::ColorAttrAdded => TEXT_CHAR_UUID,
            other => {
                warn!(
                    "PROV[{}]: characteristic 0x{:04x} confirmed in {:?}, ignored",
                    profile.app_id, uuid, other
                );
                return;
            }
        };
        if uuid != waiting_for {
            warn!(
                "PROV[{}]: expected characteristic 0x{:04x}, got 0x{:04x}, ignored",
                profile.app_id, waiting_for, uuid
            );
            return;
        }
        if !status.is_ok() {
            self.fail(profile, ProvisionFailure::Rejected { state: self.state, status: status.raw() }, sink);
            return;
        }

        if uuid == COLOR_CHAR_UUID {
            profile.color_handle = Some(attr_handle);
            self.state = ProvisionState::ColorAttrAdded;
            info!("PROV[{}]: colour characteristic (handle={})", profile.app_id, attr_handle);

            let Some(service_handle) = profile.service_handle else {
                return;
            };
            if let Err(e) = link.add_characteristic(service_handle, TEXT_CHAR_UUID, ATTR_PERM, ATTR_PROPS) {
                self.fail(profile, ProvisionFailure::Request(e), sink);
            }
        } else {
            profile.text_handle = Some(attr_handle);
            self.state = ProvisionState::Ready;
            info!("PROV[{}]: text characteristic (handle={}), ready", profile.app_id, attr_handle);
            sink.emit(&AppEvent::ProvisioningComplete {
                app_id: profile.app_id,
                service_handle: profile.service_handle.unwrap_or_default(),
                color_handle: profile.color_handle.unwrap_or_default(),
                text_handle: attr_handle,
            });
        }
    }

    /// Abandon provisioning once the deadline has passed without reaching
    /// `Ready`.  Returns `true` if this call moved the state to `Failed`.
    pub fn poll_deadline(
        &mut self,
        profile: &ProfileInstance,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let Some(started) = self.started_at_ms else {
            return false;
        };
        if now_ms.saturating_sub(started) < self.deadline_ms {
            return false;
        }
        self.fail(profile, ProvisionFailure::DeadlineExpired { state: self.state }, sink);
        true
    }

    // ── Internals ─────────────────────────────────────────────

    fn expect(&self, wanted: ProvisionState, step: &str, app_id: u16) -> bool {
        if self.state == wanted {
            return true;
        }
        warn!(
            "PROV[{}]: {} confirmed in {:?} (expected {:?}), ignored",
            app_id, step, self.state, wanted
        );
        false
    }

    fn fail(&mut self, profile: &ProfileInstance, reason: ProvisionFailure, sink: &mut impl EventSink) {
        error!("PROV[{}]: provisioning abandoned: {}", profile.app_id, reason);
        self.state = ProvisionState::Failed;
        sink.emit(&AppEvent::ProvisioningFailed {
            app_id: profile.app_id,
            reason,
        });
    }
}
