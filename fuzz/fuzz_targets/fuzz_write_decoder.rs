//! Fuzz target: `decoder::decode`
//!
//! Feeds arbitrary payloads and reported lengths to both characteristic
//! handles and an unknown one.  The decoder must never panic, and any text
//! it accepts must fit the label.
//!
//! cargo fuzz run fuzz_write_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use iotdisplay::app::commands::Command;
use iotdisplay::config::MAX_TEXT_LEN;
use iotdisplay::gatt::decoder::{decode, AttrHandles};

fuzz_target!(|data: &[u8]| {
    let Some((&first, payload)) = data.split_first() else {
        return;
    };
    let handles = AttrHandles {
        color: Some(42),
        text: Some(44),
    };
    // The stack may report more bytes than it copied.
    let reported = payload.len() + usize::from(first >> 6);
    let handle = 41 + u16::from(first & 0x03);

    match decode(handle, payload, reported, &handles) {
        Ok(Command::SetText(text)) => {
            assert_eq!(handle, 44);
            assert!(text.len() <= MAX_TEXT_LEN);
        }
        Ok(cmd) => {
            assert_eq!(handle, 42);
            assert!(cmd.color().is_some());
        }
        Err(_) => {}
    }
});
