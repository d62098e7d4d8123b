//! Characteristic write decoder.
//!
//! Pure function from `(handle, bytes, len)` to a [`Command`].  The colour
//! characteristic accepts two encodings, told apart by length:
//!
//! | Length | Encoding                         | Example        |
//! |--------|----------------------------------|----------------|
//! | 2      | RGB565, big-endian               | `F8 00` → red  |
//! | 6      | ASCII hex `RRGGBB`               | `00FF00`       |
//! | 7      | ASCII hex `#RRGGBB`              | `#0000FF`      |
//!
//! The text characteristic takes 0..=100 raw bytes, copied verbatim.
//! Decoding never touches the display; [`Command::apply`] does that.

use core::fmt;

use crate::app::commands::{Command, TextPayload};
use crate::color::{Rgb565, Rgb888};
use crate::config::MAX_TEXT_LEN;

use super::GattStatus;

/// Attribute handles the decoder dispatches on.  `None` until the
/// matching creation confirmation has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrHandles {
    pub color: Option<u16>,
    pub text: Option<u16>,
}

/// Why a write could not be turned into a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The handle is not a recorded characteristic value handle.
    UnknownHandle { handle: u16 },
    /// Colour payload length is not 2, 6 or 7.
    InvalidLength { len: usize },
    /// Hex colour contained a non-hex digit or a misplaced `#`.
    InvalidHex,
    /// Text payload longer than [`MAX_TEXT_LEN`].
    TextTooLong { len: usize },
}

impl DecodeError {
    /// Status sent back to the client when the write asked for a response.
    pub const fn status(self) -> GattStatus {
        match self {
            Self::UnknownHandle { .. } => GattStatus::InvalidHandle,
            Self::InvalidLength { .. } | Self::TextTooLong { .. } => GattStatus::InvalidAttrLen,
            Self::InvalidHex => GattStatus::IllegalParameter,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownHandle { handle } => write!(f, "write to unknown handle {handle}"),
            Self::InvalidLength { len } => {
                write!(f, "invalid colour length {len} (expected 2, 6 or 7)")
            }
            Self::InvalidHex => write!(f, "colour string is not RRGGBB hex"),
            Self::TextTooLong { len } => {
                write!(f, "text length {len} exceeds {MAX_TEXT_LEN} bytes")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode one write.
///
/// `len` is the length the stack reported; `value` holds the bytes that
/// were copied, which may be fewer for oversize writes.
pub fn decode(
    handle: u16,
    value: &[u8],
    len: usize,
    handles: &AttrHandles,
) -> Result<Command, DecodeError> {
    let bytes = &value[..len.min(value.len())];

    if handles.color == Some(handle) {
        decode_color(bytes, len)
    } else if handles.text == Some(handle) {
        decode_text(bytes, len)
    } else {
        Err(DecodeError::UnknownHandle { handle })
    }
}

fn decode_color(bytes: &[u8], len: usize) -> Result<Command, DecodeError> {
    match (len, bytes) {
        (2, &[hi, lo]) => Ok(Command::SetColor565(Rgb565::from_be_bytes([hi, lo]))),
        (6, digits) if digits.len() == 6 => parse_hex(digits).map(Command::SetColorHex),
        (7, &[b'#', ref digits @ ..]) if digits.len() == 6 => {
            parse_hex(digits).map(Command::SetColorHex)
        }
        (7, _) => Err(DecodeError::InvalidHex),
        _ => Err(DecodeError::InvalidLength { len }),
    }
}

/// Parse exactly six ASCII hex digits into RGB888.
fn parse_hex(digits: &[u8]) -> Result<Rgb888, DecodeError> {
    if digits.len() != 6 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(DecodeError::InvalidHex);
    }
    // All-ASCII, so the str conversion cannot fail.
    let s = core::str::from_utf8(digits).map_err(|_| DecodeError::InvalidHex)?;
    u32::from_str_radix(s, 16)
        .map(Rgb888)
        .map_err(|_| DecodeError::InvalidHex)
}

fn decode_text(bytes: &[u8], len: usize) -> Result<Command, DecodeError> {
    if len > MAX_TEXT_LEN {
        return Err(DecodeError::TextTooLong { len });
    }
    let mut text = TextPayload::new();
    text.extend_from_slice(bytes)
        .map_err(|_| DecodeError::TextTooLong { len })?;
    Ok(Command::SetText(text))
}
