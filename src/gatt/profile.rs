//! Per-application service profile.

use super::decoder::AttrHandles;
use super::{ConnId, InterfaceId};

/// Identity and handles of one running service.
///
/// Every field except `app_id` starts unset and is filled in as the stack
/// confirms each setup step.  Unset handles never match a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInstance {
    pub app_id: u16,
    pub interface: Option<InterfaceId>,
    pub conn_id: Option<ConnId>,
    pub service_handle: Option<u16>,
    pub color_handle: Option<u16>,
    pub text_handle: Option<u16>,
}

impl ProfileInstance {
    pub const fn new(app_id: u16) -> Self {
        Self {
            app_id,
            interface: None,
            conn_id: None,
            service_handle: None,
            color_handle: None,
            text_handle: None,
        }
    }

    pub fn handles(&self) -> AttrHandles {
        AttrHandles {
            color: self.color_handle,
            text: self.text_handle,
        }
    }

    /// `true` if an event tagged with `interface` concerns this profile.
    pub fn accepts(&self, interface: InterfaceId) -> bool {
        interface.is_broadcast() || self.interface == Some(interface)
    }

    pub fn is_connected(&self) -> bool {
        self.conn_id.is_some()
    }
}
