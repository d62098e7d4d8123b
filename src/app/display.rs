//! Display controller: the only writer of [`DisplayState`].
//!
//! ```text
//!  Registry ──DisplayPort──▶ DisplayController ──lock──▶ Screen { state, surface, label }
//!                                   │                          ▲
//!                                   └──FlashRequest──▶ flash worker ──lock──┘
//!                                                      refresh task ──lock──┘
//! ```
//!
//! The state, the label and the surface sit behind one mutex so a colour
//! change (state + background + redraw) is never observed half-done.
//! Flashes are handed to the flash worker; the band restore reads the
//! colour current at restore time, which keeps a colour written during the
//! hold and never brings back a stale one.

use std::sync::{Arc, Mutex, MutexGuard};

use core::time::Duration;

use embassy_sync::channel::DynamicSender;
use log::{error, warn};

use crate::color::Rgb565;
use crate::config::MAX_TEXT_LEN;

use super::commands::TextPayload;
use super::ports::{DisplayPort, LabelPort, Region, SurfacePort};

// ───────────────────────────────────────────────────────────────
// State
// ───────────────────────────────────────────────────────────────

/// Authoritative background colour and label text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub color: Rgb565,
    pub text: TextPayload,
}

/// A flash waiting for the flash worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRequest {
    pub color: Rgb565,
    pub hold: Duration,
}

/// Everything the mutex protects.
pub struct Screen<S, L> {
    state: DisplayState,
    surface: S,
    label: L,
    band_height: u16,
}

pub type SharedScreen<S, L> = Arc<Mutex<Screen<S, L>>>;

/// Lock the screen, recovering the guard if a previous holder panicked.
pub fn lock_screen<S, L>(screen: &Mutex<Screen<S, L>>) -> MutexGuard<'_, Screen<S, L>> {
    screen.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl<S: SurfacePort, L: LabelPort> Screen<S, L> {
    pub fn new(surface: S, label: L, color: Rgb565, band_height: u16) -> Self {
        Self {
            state: DisplayState {
                color,
                text: TextPayload::new(),
            },
            surface,
            label,
            band_height,
        }
    }

    pub fn into_shared(self) -> SharedScreen<S, L> {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn label(&self) -> &L {
        &self.label
    }

    /// Draw the start-up screen.
    pub fn show(&mut self, text: &[u8]) {
        self.label.set_background(self.state.color.to_rgb888());
        self.apply_text(text);
    }

    pub fn apply_color(&mut self, color: Rgb565) {
        self.state.color = color;
        self.label.set_background(color.to_rgb888());
        self.redraw();
    }

    /// Replace the label text.  Longer than [`MAX_TEXT_LEN`] is refused,
    /// not truncated.
    pub fn apply_text(&mut self, text: &[u8]) {
        let mut stored = TextPayload::new();
        if stored.extend_from_slice(text).is_err() {
            warn!(
                "DISPLAY: text of {} bytes exceeds {}, ignored",
                text.len(),
                MAX_TEXT_LEN
            );
            return;
        }
        self.state.text = stored;
        self.label.set_text(&String::from_utf8_lossy(text));
        self.label.set_visible(true);
        self.label.center();
        self.redraw();
    }

    fn band(&self) -> Region {
        let (width, height) = self.surface.size();
        Region::new(0, 0, width, self.band_height.min(height))
    }

    /// First half of a flash: paint the band.  Leaves the state alone.
    pub fn paint_band(&mut self, color: Rgb565) {
        let band = self.band();
        if let Err(e) = self.surface.fill_region(band, color) {
            warn!("DISPLAY: flash fill failed: {}", e);
        }
    }

    /// Second half of a flash: repaint the band with the current colour.
    pub fn restore_band(&mut self) {
        let band = self.band();
        if let Err(e) = self.surface.fill_region(band, self.state.color) {
            warn!("DISPLAY: flash restore failed: {}", e);
        }
    }

    /// Service a pending label redraw.
    pub fn refresh(&mut self) {
        if let Err(e) = self.label.refresh(&mut self.surface) {
            warn!("DISPLAY: refresh skipped: {}", e);
        }
    }

    fn redraw(&mut self) {
        if let Err(e) = self.label.redraw_now(&mut self.surface) {
            error!("DISPLAY: redraw skipped: {}", e);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// [`DisplayPort`] implementation handed to the registry.
pub struct DisplayController<S, L> {
    screen: SharedScreen<S, L>,
    flashes: DynamicSender<'static, FlashRequest>,
}

impl<S, L> DisplayController<S, L> {
    pub fn new(screen: SharedScreen<S, L>, flashes: DynamicSender<'static, FlashRequest>) -> Self {
        Self { screen, flashes }
    }

    pub fn screen(&self) -> &SharedScreen<S, L> {
        &self.screen
    }
}

impl<S: SurfacePort, L: LabelPort> DisplayPort for DisplayController<S, L> {
    fn set_color(&mut self, color: Rgb565) {
        lock_screen(&self.screen).apply_color(color);
    }

    fn set_text(&mut self, text: &[u8]) {
        lock_screen(&self.screen).apply_text(text);
    }

    fn flash(&mut self, color: Rgb565, hold: Duration) {
        if self.flashes.try_send(FlashRequest { color, hold }).is_err() {
            warn!("DISPLAY: flash queue full, {} flash dropped", color);
        }
    }

    fn current_color(&self) -> Rgb565 {
        lock_screen(&self.screen).state.color
    }

    fn current_text(&self) -> TextPayload {
        lock_screen(&self.screen).state.text.clone()
    }
}
