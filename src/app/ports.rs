//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Registry / DisplayController (domain)
//! ```
//!
//! Driven adapters (Bluedroid, the ST7789 panel, the label renderer, event
//! sinks) implement these traits.  The domain consumes them via generics,
//! so the GATT state machine and the decoder never touch the radio or the
//! SPI bus directly.

use core::time::Duration;

use crate::app::commands::TextPayload;
use crate::color::{Rgb565, Rgb888};
use crate::error::{LinkError, SurfaceError};
use crate::gatt::{
    AdvertisingData, AdvertisingParams, AttrPermissions, CharProperties, ConnId, GattStatus,
    InterfaceId, ServiceId,
};

// ───────────────────────────────────────────────────────────────
// Surface port (panel / bus driver)
// ───────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in panel coordinates (after rotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `true` if the region lies completely inside a `width × height` panel.
    pub const fn fits(&self, width: u16, height: u16) -> bool {
        self.x as u32 + self.width as u32 <= width as u32
            && self.y as u32 + self.height as u32 <= height as u32
    }
}

/// Raw pixel sink.  Knows nothing about text, labels or protocol.
pub trait SurfacePort {
    /// Panel size in pixels as `(width, height)`.
    fn size(&self) -> (u16, u16);

    /// Fill `area` with a solid colour.
    fn fill_region(&mut self, area: Region, color: Rgb565) -> Result<(), SurfaceError>;

    /// Push a row-major block of `area.pixel_count()` pixels.
    fn push_frame(&mut self, area: Region, pixels: &[u16]) -> Result<(), SurfaceError>;
}

// ───────────────────────────────────────────────────────────────
// Label port (text renderer)
// ───────────────────────────────────────────────────────────────

/// The on-screen text label and the background behind it.
pub trait LabelPort {
    /// Replace the label content verbatim.
    fn set_text(&mut self, text: &str);

    fn set_visible(&mut self, visible: bool);

    /// Re-centre the label on the panel.
    fn center(&mut self);

    /// Set the screen background in the renderer's native 8-bit channels.
    fn set_background(&mut self, color: Rgb888);

    /// Render onto `surface` immediately, bypassing the refresh tick.
    fn redraw_now<S: SurfacePort>(&mut self, surface: &mut S) -> Result<(), SurfaceError>;

    /// Service a pending redraw, if any.  Called from the refresh task.
    fn refresh<S: SurfacePort>(&mut self, surface: &mut S) -> Result<(), SurfaceError>;
}

// ───────────────────────────────────────────────────────────────
// Display port (domain → display controller)
// ───────────────────────────────────────────────────────────────

/// What the GATT side needs from the display.  Implemented by
/// [`DisplayController`](crate::app::display::DisplayController).
pub trait DisplayPort {
    /// Apply a new background colour and redraw.
    fn set_color(&mut self, color: Rgb565);

    /// Replace the label text and redraw.
    fn set_text(&mut self, text: &[u8]);

    /// Paint the feedback band with `color`, hold, then restore it.
    /// Must not block the caller for `hold`.
    fn flash(&mut self, color: Rgb565, hold: Duration);

    /// Authoritative current background colour.
    fn current_color(&self) -> Rgb565;

    /// Current label text, as written.
    fn current_text(&self) -> TextPayload;
}

// ───────────────────────────────────────────────────────────────
// Link stack port (domain → BLE stack)
// ───────────────────────────────────────────────────────────────

/// Requests the GATT side issues to the BLE stack.  Every call is
/// asynchronous: success means "accepted", and the outcome arrives later
/// as a [`StackEvent`](crate::gatt::StackEvent).
pub trait LinkStackPort {
    fn register_app(&mut self, app_id: u16) -> Result<(), LinkError>;

    fn set_device_name(&mut self, name: &str) -> Result<(), LinkError>;

    fn configure_adv_data(&mut self, data: &AdvertisingData) -> Result<(), LinkError>;

    fn create_service(
        &mut self,
        interface: InterfaceId,
        service: &ServiceId,
        num_handles: u16,
    ) -> Result<(), LinkError>;

    fn start_service(&mut self, service_handle: u16) -> Result<(), LinkError>;

    fn add_characteristic(
        &mut self,
        service_handle: u16,
        uuid: u16,
        perm: AttrPermissions,
        props: CharProperties,
    ) -> Result<(), LinkError>;

    fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), LinkError>;

    fn send_write_response(
        &mut self,
        interface: InterfaceId,
        conn_id: ConnId,
        trans_id: u32,
        status: GattStatus,
    ) -> Result<(), LinkError>;

    /// Answer a read with `value` (already sliced from the requested offset).
    fn send_read_response(
        &mut self,
        interface: InterfaceId,
        conn_id: ConnId,
        trans_id: u32,
        handle: u16,
        status: GattStatus,
        value: &[u8],
    ) -> Result<(), LinkError>;

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration loading and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Override blob failed to deserialize.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
