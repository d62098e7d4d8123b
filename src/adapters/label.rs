//! Text label renderer.
//!
//! Implements [`LabelPort`] with `embedded-graphics`: the whole screen is
//! redrawn as background plus word-wrapped 10×20 mono text, one horizontal
//! band at a time.  Each band is rendered into a reusable pixel buffer and
//! handed to the surface with [`SurfacePort::push_frame`], so the panel
//! never needs a full frame buffer.
//!
//! ```text
//!   ┌──────────────── panel ────────────────┐
//!   │ band 0  (band_rows)  ─▶ push_frame    │
//!   │ band 1               ─▶ push_frame    │
//!   │  ...        centred text block        │
//!   │ band n  (remainder)  ─▶ push_frame    │
//!   └───────────────────────────────────────┘
//! ```

use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::Rgb565 as EgRgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::app::ports::{LabelPort, Region, SurfacePort};
use crate::color::{Rgb565, Rgb888};
use crate::config::LabelConfig;
use crate::error::{AllocError, SurfaceError};

const GLYPH_W: u16 = 10;
const GLYPH_H: u16 = 20;

fn eg_color(c: Rgb565) -> EgRgb565 {
    EgRgb565::from(RawU16::new(c.raw()))
}

/// Label state mirrored from the display controller.
pub struct TextLabel {
    width: u16,
    height: u16,
    margin: u16,
    band_rows: u16,
    text: String,
    background: Rgb565,
    text_color: Rgb565,
    visible: bool,
    centered: bool,
    dirty: bool,
    /// Band pixel buffer, allocated on first render.
    band: Vec<u16>,
}

impl TextLabel {
    pub fn new(width: u16, height: u16, cfg: &LabelConfig) -> Self {
        Self {
            width,
            height,
            margin: cfg.margin_px,
            band_rows: cfg.band_rows.max(1),
            text: String::new(),
            background: cfg.initial_color,
            text_color: cfg.text_color,
            visible: true,
            centered: false,
            dirty: true,
            band: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn background(&self) -> Rgb565 {
        self.background
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Columns that fit in the label width.
    fn columns(&self) -> usize {
        (self.width.saturating_sub(self.margin) / GLYPH_W).max(1) as usize
    }

    fn ensure_band(&mut self, len: usize) -> Result<(), AllocError> {
        if self.band.len() >= len {
            return Ok(());
        }
        self.band
            .try_reserve_exact(len - self.band.len())
            .map_err(|_| AllocError { bytes: len * 2 })?;
        self.band.resize(len, 0);
        Ok(())
    }

    fn render<S: SurfacePort>(&mut self, surface: &mut S) -> Result<(), SurfaceError> {
        let (sw, sh) = surface.size();
        let width = self.width.min(sw);
        let height = self.height.min(sh);
        let rows = self.band_rows.min(height).max(1);
        self.ensure_band(width as usize * rows as usize)?;

        let lines = if self.visible {
            wrap(&self.text, self.columns())
        } else {
            Vec::new()
        };
        let style = MonoTextStyle::new(&FONT_10X20, eg_color(self.text_color));
        let block_h = (lines.len() * GLYPH_H as usize) as i32;
        let (left, top) = if self.centered {
            (None, (i32::from(height) - block_h) / 2)
        } else {
            (Some(i32::from(self.margin / 2)), i32::from(self.margin / 2))
        };
        let background = self.background.raw();

        let mut y0 = 0u16;
        while y0 < height {
            let band_h = rows.min(height - y0);
            let len = width as usize * band_h as usize;
            let buf = &mut self.band[..len];
            buf.fill(background);

            let mut target = BandTarget {
                buf,
                width,
                panel_height: height,
                top: y0,
                rows: band_h,
            };
            for (i, line) in lines.iter().enumerate() {
                let ly = top + (i as i32) * i32::from(GLYPH_H);
                if ly + i32::from(GLYPH_H) <= i32::from(y0) || ly >= i32::from(y0 + band_h) {
                    continue;
                }
                let line_w = (line.chars().count() as i32) * i32::from(GLYPH_W);
                let x = left.unwrap_or((i32::from(width) - line_w) / 2);
                let _ = Text::with_baseline(line, Point::new(x, ly), style, Baseline::Top)
                    .draw(&mut target);
            }

            surface.push_frame(Region::new(0, y0, width, band_h), &self.band[..len])?;
            y0 += band_h;
        }
        self.dirty = false;
        Ok(())
    }
}

impl LabelPort for TextLabel {
    fn set_text(&mut self, text: &str) {
        text.clone_into(&mut self.text);
        self.dirty = true;
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.dirty = true;
        }
    }

    fn center(&mut self) {
        if !self.centered {
            self.centered = true;
            self.dirty = true;
        }
    }

    fn set_background(&mut self, color: Rgb888) {
        self.background = color.to_rgb565();
        self.dirty = true;
    }

    fn redraw_now<S: SurfacePort>(&mut self, surface: &mut S) -> Result<(), SurfaceError> {
        self.render(surface)
    }

    fn refresh<S: SurfacePort>(&mut self, surface: &mut S) -> Result<(), SurfaceError> {
        if self.dirty {
            self.render(surface)
        } else {
            Ok(())
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Band draw target
// ───────────────────────────────────────────────────────────────

/// Rows `top..top + rows` of the panel.  Pixels outside are dropped.
struct BandTarget<'a> {
    buf: &'a mut [u16],
    width: u16,
    panel_height: u16,
    top: u16,
    rows: u16,
}

impl DrawTarget for BandTarget<'_> {
    type Color = EgRgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let top = i32::from(self.top);
        for Pixel(p, color) in pixels {
            let row = p.y - top;
            if p.x < 0 || p.x >= i32::from(self.width) || row < 0 || row >= i32::from(self.rows) {
                continue;
            }
            let idx = row as usize * self.width as usize + p.x as usize;
            self.buf[idx] = color.into_storage();
        }
        Ok(())
    }
}

impl OriginDimensions for BandTarget<'_> {
    fn size(&self) -> Size {
        Size::new(u32::from(self.width), u32::from(self.panel_height))
    }
}

// ───────────────────────────────────────────────────────────────
// Word wrap
// ───────────────────────────────────────────────────────────────

/// Greedy word wrap to `columns` characters.  Explicit newlines are kept;
/// words longer than a line are split.
pub fn wrap(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0usize;
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let mut chars: Vec<char> = word.chars().collect();
            while !chars.is_empty() {
                let room = if line_len == 0 {
                    columns
                } else {
                    columns.saturating_sub(line_len + 1)
                };
                if chars.len() <= room {
                    if line_len > 0 {
                        line.push(' ');
                    }
                    line.extend(chars.drain(..));
                    line_len = line.chars().count();
                } else if line_len > 0 {
                    lines.push(core::mem::take(&mut line));
                    line_len = 0;
                } else {
                    line.extend(chars.drain(..columns));
                    lines.push(core::mem::take(&mut line));
                }
            }
        }
        if line_len > 0 || (paragraph.is_empty() && !text.is_empty()) {
            lines.push(line);
        }
    }
    lines
}
