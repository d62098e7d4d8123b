//! Inbound commands to the display.
//!
//! A [`Command`] is built by the [decoder](crate::gatt::decoder) from one
//! characteristic write and consumed immediately by
//! [`apply`](Command::apply).  Commands are never stored.

use crate::color::{Rgb565, Rgb888};
use crate::config::MAX_TEXT_LEN;

use super::ports::DisplayPort;

/// Text payload, bounded by the characteristic's maximum length.
pub type TextPayload = heapless::Vec<u8, MAX_TEXT_LEN>;

/// Display commands a remote client can write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Two-byte big-endian RGB565 colour.
    SetColor565(Rgb565),

    /// Hex-string colour (`RRGGBB` / `#RRGGBB`), already parsed.
    SetColorHex(Rgb888),

    /// Label text, copied verbatim.
    SetText(TextPayload),
}

impl Command {
    /// The background colour this command results in, if it sets one.
    pub fn color(&self) -> Option<Rgb565> {
        match self {
            Self::SetColor565(c) => Some(*c),
            Self::SetColorHex(c) => Some(c.to_rgb565()),
            Self::SetText(_) => None,
        }
    }

    /// Apply the command to the display.
    pub fn apply(&self, display: &mut impl DisplayPort) {
        match self {
            Self::SetColor565(_) | Self::SetColorHex(_) => {
                if let Some(c) = self.color() {
                    display.set_color(c);
                }
            }
            Self::SetText(text) => display.set_text(text),
        }
    }
}
