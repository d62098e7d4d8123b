//! Integration tests for connect / disconnect handling.

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use iotdisplay::adapters::framebuffer::FrameBuffer;
use iotdisplay::adapters::label::TextLabel;
use iotdisplay::app::display::{lock_screen, DisplayController, FlashRequest, Screen};
use iotdisplay::app::events::AppEvent;
use iotdisplay::app::ports::DisplayPort;
use iotdisplay::channels::{post_stack_event, STACK_EVENTS};
use iotdisplay::color::Rgb565;
use iotdisplay::config::DeviceConfig;
use iotdisplay::gatt::registry::ProfileRegistry;
use iotdisplay::gatt::{BdAddr, GapEvent, GattStatus, GattsEvent, StackEvent, WriteRequest};

use crate::mock_hw::{setup_sequence, CollectingSink, MockLink, Rig, COLOR_HANDLE, IFACE};

const BURST: u32 = 16;

const REMOTE: BdAddr = BdAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

fn connect(conn_id: u16) -> GattsEvent {
    GattsEvent::Connected {
        conn_id,
        remote: REMOTE,
    }
}

fn disconnect(conn_id: u16) -> GattsEvent {
    GattsEvent::Disconnected {
        conn_id,
        remote: REMOTE,
        reason: 0x13,
    }
}

#[test]
fn connect_flashes_green_and_records_link() {
    let mut rig = Rig::ready();
    rig.gatts(connect(0));

    assert_eq!(rig.display.flashes(), vec![Rgb565::GREEN]);
    assert_eq!(rig.registry.profile(rig.app_id).unwrap().conn_id, Some(0));
    assert!(rig.sink.events.contains(&AppEvent::LinkUp {
        conn_id: 0,
        remote: REMOTE
    }));
}

#[test]
fn disconnect_readvertises_then_flashes_red() {
    let mut rig = Rig::ready();
    rig.gatts(connect(0));
    let before = rig.link.advertising_requests();

    rig.gatts(disconnect(0));

    assert_eq!(rig.link.advertising_requests(), before + 1);
    assert_eq!(rig.display.flashes(), vec![Rgb565::GREEN, Rgb565::RED]);
    assert_eq!(rig.registry.profile(rig.app_id).unwrap().conn_id, None);
    assert!(rig.sink.events.contains(&AppEvent::LinkDown {
        conn_id: 0,
        reason: 0x13
    }));
}

#[test]
fn flashes_leave_background_color_alone() {
    let mut rig = Rig::ready();
    rig.gatts(GattsEvent::Write(WriteRequest::new(0, 1, COLOR_HANDLE, b"FF00FF")));
    let color = rig.display.color;

    rig.gatts(connect(0));
    rig.gatts(disconnect(0));

    assert_eq!(rig.display.color, color);
}

#[test]
fn repeated_cycles_keep_readvertising() {
    let mut rig = Rig::ready();
    for conn_id in 0..3 {
        rig.gatts(connect(conn_id));
        rig.gatts(disconnect(conn_id));
        rig.feed(StackEvent::Gap(GapEvent::AdvStarted {
            status: GattStatus::Ok,
        }));
    }
    // One from setup, one per disconnect.
    assert_eq!(rig.link.advertising_requests(), 4);
    assert!(rig.registry.advertising().is_active());
    assert_eq!(rig.display.flashes().len(), 6);
}

#[test]
fn disconnect_after_write_burst_still_readvertises() {
    let mut rig = Rig::ready();
    rig.gatts(connect(0));
    let before = rig.link.advertising_requests();

    // Posted from another thread, the way the stack's callback task does.
    let stack = std::thread::spawn(|| {
        for trans_id in 0..BURST {
            post_stack_event(StackEvent::Gatts {
                interface: IFACE,
                event: GattsEvent::Write(WriteRequest::new(0, trans_id, COLOR_HANDLE, &[0x07, 0xE0])),
            });
        }
        post_stack_event(StackEvent::Gatts {
            interface: IFACE,
            event: disconnect(0),
        });
    });

    std::thread::sleep(Duration::from_millis(20));
    for _ in 0..=BURST {
        let event = futures_lite::future::block_on(STACK_EVENTS.receive());
        rig.feed(event);
    }
    stack.join().unwrap();

    assert_eq!(rig.link.advertising_requests(), before + 1);
    assert_eq!(rig.display.color, Rgb565::GREEN);
    let profile = rig.registry.profile(rig.app_id).unwrap();
    assert_eq!(profile.conn_id, None);
    assert!(!profile.is_connected());
}

#[test]
fn connect_reaches_real_display_as_queued_flash() {
    static FLASHES: Channel<CriticalSectionRawMutex, FlashRequest, 4> = Channel::new();

    let config = DeviceConfig::default();
    let label = TextLabel::new(config.panel.width, config.panel.height, &config.label);
    let surface = FrameBuffer::new(config.panel.width, config.panel.height);
    let mut screen = Screen::new(surface, label, Rgb565::BLUE, config.feedback.band_height);
    screen.apply_color(Rgb565::BLUE);
    let screen = screen.into_shared();
    let mut display = DisplayController::new(screen.clone(), FLASHES.dyn_sender());

    let mut registry = ProfileRegistry::new(&config);
    let mut link = MockLink::new();
    let mut sink = CollectingSink::default();
    registry.register(config.gatt.app_id, &mut link, 0).unwrap();
    for event in setup_sequence(config.gatt.app_id) {
        registry.handle(&event, &mut link, &mut display, &mut sink);
    }
    registry.handle(
        &StackEvent::Gatts {
            interface: IFACE,
            event: connect(5),
        },
        &mut link,
        &mut display,
        &mut sink,
    );

    let queued = FLASHES.try_receive().unwrap();
    assert_eq!(
        queued,
        FlashRequest {
            color: Rgb565::GREEN,
            hold: Duration::from_millis(u64::from(config.feedback.hold_ms)),
        }
    );
    // Nothing painted until the flash worker picks it up.
    let guard = lock_screen(&screen);
    assert_eq!(guard.surface().pixel(0, 0), Some(Rgb565::BLUE));
    assert_eq!(guard.state().color, Rgb565::BLUE);
    drop(guard);
    assert_eq!(display.current_color(), Rgb565::BLUE);
}
