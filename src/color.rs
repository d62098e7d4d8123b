//! RGB565 / RGB888 colour types and the conversions between them.
//!
//! The wire protocol and the panel both speak packed 16-bit RGB565.  The
//! label renderer takes 24-bit RGB888 (one byte per channel), so colours
//! cross that boundary in both directions:
//!
//! - **888 → 565** truncates: `R5 = R8 >> 3`, `G6 = G8 >> 2`, `B5 = B8 >> 3`.
//! - **565 → 888** replicates the top bits into the low bits so that full
//!   scale maps to full scale (`0x1F` → `0xFF`, not `0xF8`).
//!
//! Truncating a replicated colour yields the original RGB565 value exactly.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Packed 16-bit colour: `RRRRRGGG_GGGBBBBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb565(pub u16);

/// Packed 24-bit colour: `0x00RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb888(pub u32);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const RED: Self = Self(0xF800);
    pub const GREEN: Self = Self(0x07E0);
    pub const BLUE: Self = Self(0x001F);
    pub const YELLOW: Self = Self(0xFFE0);
    pub const CYAN: Self = Self(0x07FF);
    pub const MAGENTA: Self = Self(0xF81F);

    /// Build from a big-endian byte pair as sent over the air.
    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// Split into its (5, 6, 5)-bit channels.
    pub const fn channels(self) -> (u8, u8, u8) {
        let r5 = ((self.0 >> 11) & 0x1F) as u8;
        let g6 = ((self.0 >> 5) & 0x3F) as u8;
        let b5 = (self.0 & 0x1F) as u8;
        (r5, g6, b5)
    }

    /// Expand to RGB888 by bit replication.
    pub const fn to_rgb888(self) -> Rgb888 {
        let (r5, g6, b5) = self.channels();
        let r8 = (r5 << 3) | (r5 >> 2);
        let g8 = (g6 << 2) | (g6 >> 4);
        let b8 = (b5 << 3) | (b5 >> 2);
        Rgb888::from_channels(r8, g8, b8)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl Rgb888 {
    pub const fn from_channels(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub const fn channels(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }

    /// Truncating conversion to RGB565.
    pub const fn to_rgb565(self) -> Rgb565 {
        let (r8, g8, b8) = self.channels();
        let r5 = (r8 >> 3) as u16;
        let g6 = (g8 >> 2) as u16;
        let b5 = (b8 >> 3) as u16;
        Rgb565((r5 << 11) | (g6 << 5) | b5)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<Rgb888> for Rgb565 {
    fn from(c: Rgb888) -> Self {
        c.to_rgb565()
    }
}

impl From<Rgb565> for Rgb888 {
    fn from(c: Rgb565) -> Self {
        c.to_rgb888()
    }
}

impl fmt::Display for Rgb565 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl fmt::Display for Rgb888 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0 & 0x00FF_FFFF)
    }
}
