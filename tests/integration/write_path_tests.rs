//! Integration tests for characteristic writes and reads.
//!
//! Write → decode → apply → acknowledge, through the registry, against a
//! mock display.

use iotdisplay::app::events::AppEvent;
use iotdisplay::color::Rgb565;
use iotdisplay::gatt::decoder::DecodeError;
use iotdisplay::gatt::{GattStatus, GattsEvent, WriteRequest};

use crate::mock_hw::{setup_sequence, DisplayCall, Rig, COLOR_HANDLE, TEXT_HANDLE};

fn write(handle: u16, payload: &[u8]) -> GattsEvent {
    GattsEvent::Write(WriteRequest::new(1, 7, handle, payload))
}

fn read(handle: u16, offset: u16) -> GattsEvent {
    GattsEvent::Read {
        conn_id: 1,
        trans_id: 8,
        handle,
        offset,
        need_rsp: true,
    }
}

// ── Colour ────────────────────────────────────────────────────

#[test]
fn rgb565_write_sets_color_and_acknowledges() {
    let mut rig = Rig::ready();
    rig.gatts(write(COLOR_HANDLE, &[0xF8, 0x00]));

    assert_eq!(rig.display.color, Rgb565(0xF800));
    assert_eq!(rig.link.last_write_response(), Some(GattStatus::Ok));
    assert!(rig.sink.events.contains(&AppEvent::ColorApplied(Rgb565::RED)));
}

#[test]
fn hex_writes_with_and_without_hash() {
    let mut rig = Rig::ready();
    rig.gatts(write(COLOR_HANDLE, b"00FF00"));
    assert_eq!(rig.display.color, Rgb565(0x07E0));
    rig.gatts(write(COLOR_HANDLE, b"#0000FF"));
    assert_eq!(rig.display.color, Rgb565(0x001F));
}

#[test]
fn bad_color_length_leaves_display_unchanged() {
    let mut rig = Rig::ready();
    rig.gatts(write(COLOR_HANDLE, &[0x12; 9]));

    assert_eq!(rig.display.color, Rgb565::BLACK);
    assert!(rig.display.calls.is_empty());
    assert_eq!(rig.link.last_write_response(), Some(GattStatus::InvalidAttrLen));
    assert!(rig.sink.events.contains(&AppEvent::WriteRejected {
        handle: COLOR_HANDLE,
        error: DecodeError::InvalidLength { len: 9 },
    }));
}

#[test]
fn non_hex_string_is_rejected() {
    let mut rig = Rig::ready();
    rig.gatts(write(COLOR_HANDLE, b"GG0000"));
    assert_eq!(rig.display.color, Rgb565::BLACK);
    assert_eq!(rig.link.last_write_response(), Some(GattStatus::IllegalParameter));
}

// ── Text ──────────────────────────────────────────────────────

#[test]
fn text_write_replaces_label() {
    let mut rig = Rig::ready();
    rig.gatts(write(TEXT_HANDLE, b"Hello, display"));

    assert_eq!(rig.display.text.as_slice(), b"Hello, display");
    assert_eq!(rig.link.last_write_response(), Some(GattStatus::Ok));
    assert!(rig.sink.events.contains(&AppEvent::TextApplied { len: 14 }));
}

#[test]
fn text_at_limit_is_accepted_and_over_limit_is_not() {
    let mut rig = Rig::ready();
    rig.gatts(write(TEXT_HANDLE, &[b'a'; 100]));
    assert_eq!(rig.display.text.len(), 100);

    rig.gatts(write(TEXT_HANDLE, &[b'b'; 101]));
    assert_eq!(rig.display.text.as_slice(), &[b'a'; 100][..]);
    assert_eq!(rig.link.last_write_response(), Some(GattStatus::InvalidAttrLen));
}

#[test]
fn empty_text_clears_label() {
    let mut rig = Rig::ready();
    rig.gatts(write(TEXT_HANDLE, b"x"));
    rig.gatts(write(TEXT_HANDLE, b""));
    assert!(rig.display.text.is_empty());
    assert_eq!(
        rig.display.calls.last(),
        Some(&DisplayCall::SetText(Vec::new()))
    );
}

// ── Handles and responses ─────────────────────────────────────

#[test]
fn write_before_handle_is_recorded_is_unknown() {
    let mut rig = Rig::new();
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    let seq = setup_sequence(rig.app_id);
    rig.feed(seq[0].clone());
    rig.feed(seq[1].clone());

    rig.gatts(write(COLOR_HANDLE, &[0xF8, 0x00]));
    assert_eq!(rig.display.color, Rgb565::BLACK);
    assert_eq!(rig.link.last_write_response(), Some(GattStatus::InvalidHandle));

    rig.feed(seq[3].clone());
    rig.gatts(write(COLOR_HANDLE, &[0xF8, 0x00]));
    assert_eq!(rig.display.color, Rgb565::RED);
}

#[test]
fn write_without_response_is_applied_silently() {
    let mut rig = Rig::ready();
    let mut req = WriteRequest::new(1, 7, COLOR_HANDLE, &[0x07, 0xE0]);
    req.need_rsp = false;
    rig.gatts(GattsEvent::Write(req));

    assert_eq!(rig.display.color, Rgb565::GREEN);
    assert_eq!(rig.link.last_write_response(), None);
}

#[test]
fn prepared_write_is_refused() {
    let mut rig = Rig::ready();
    let mut req = WriteRequest::new(1, 7, TEXT_HANDLE, b"part");
    req.is_prep = true;
    rig.gatts(GattsEvent::Write(req));

    assert!(rig.display.calls.is_empty());
    assert_eq!(rig.link.last_write_response(), Some(GattStatus::RequestNotSupported));
}

#[test]
fn reads_return_current_values() {
    let mut rig = Rig::ready();
    rig.gatts(write(COLOR_HANDLE, &[0xF8, 0x1F]));
    rig.gatts(write(TEXT_HANDLE, b"abc"));

    rig.gatts(read(COLOR_HANDLE, 0));
    assert_eq!(rig.link.last_read_response(), Some((GattStatus::Ok, vec![0xF8, 0x1F])));

    rig.gatts(read(TEXT_HANDLE, 1));
    assert_eq!(rig.link.last_read_response(), Some((GattStatus::Ok, b"bc".to_vec())));
}

#[test]
fn read_past_end_or_unknown_handle_is_an_error() {
    let mut rig = Rig::ready();
    rig.gatts(read(COLOR_HANDLE, 3));
    assert_eq!(rig.link.last_read_response(), Some((GattStatus::InvalidOffset, Vec::new())));

    rig.gatts(read(99, 0));
    assert_eq!(rig.link.last_read_response(), Some((GattStatus::InvalidHandle, Vec::new())));
}
