//! Error types for the display firmware.
//!
//! One small `Copy` type per failure domain.  Startup errors surface in
//! `main` through `anyhow`; the rest are logged where they happen and the
//! firmware keeps running.

use core::fmt;

// ---------------------------------------------------------------------------
// Initialisation errors (fatal)
// ---------------------------------------------------------------------------

/// Startup failures.  Each carries the raw `esp_err_t` where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Controller or Bluedroid bring-up.
    BtStack(i32),
    CallbackRegister(i32),
    SpiBus(i32),
    PanelIo(i32),
    Panel(i32),
    Backlight(i32),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BtStack(rc) => write!(f, "BT controller / Bluedroid bring-up failed (rc={rc})"),
            Self::CallbackRegister(rc) => write!(f, "GAP/GATTS callback register failed (rc={rc})"),
            Self::SpiBus(rc) => write!(f, "SPI bus init failed (rc={rc})"),
            Self::PanelIo(rc) => write!(f, "LCD panel IO init failed (rc={rc})"),
            Self::Panel(rc) => write!(f, "ST7789 panel init failed (rc={rc})"),
            Self::Backlight(rc) => write!(f, "backlight GPIO config failed (rc={rc})"),
        }
    }
}

impl std::error::Error for InitError {}

// ---------------------------------------------------------------------------
// Allocation errors (transient)
// ---------------------------------------------------------------------------

/// A pixel buffer of `bytes` could not be reserved.  The operation that
/// needed it is skipped; the firmware keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError {
    pub bytes: usize,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to allocate {} byte pixel buffer", self.bytes)
    }
}

impl std::error::Error for AllocError {}

// ---------------------------------------------------------------------------
// Link stack errors
// ---------------------------------------------------------------------------

/// A request to the BLE stack returned a non-OK code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkError {
    pub op: &'static str,
    pub code: i32,
}

impl LinkError {
    pub const fn new(op: &'static str, code: i32) -> Self {
        Self { op, code }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed (rc={})", self.op, self.code)
    }
}

impl std::error::Error for LinkError {}

// ---------------------------------------------------------------------------
// Surface errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceError {
    /// Line or band buffer allocation failed.
    Alloc(AllocError),
    /// `esp_lcd_panel_draw_bitmap` returned an error.
    Bus(i32),
    /// The requested region lies outside the panel.
    OutOfBounds,
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "{e}"),
            Self::Bus(rc) => write!(f, "panel transfer failed (rc={rc})"),
            Self::OutOfBounds => write!(f, "region outside panel"),
        }
    }
}

impl std::error::Error for SurfaceError {}

impl From<AllocError> for SurfaceError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}
