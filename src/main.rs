//! IoT Display Firmware: main entry point
//!
//! Hexagonal architecture: Bluedroid callbacks feed a serial dispatcher,
//! the display lives behind one mutex shared with the flash worker and the
//! refresh tick.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BluedroidLink     St7789Panel    TextLabel     LogEventSink   │
//! │  (LinkStackPort)   (SurfacePort)  (LabelPort)   (EventSink)    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ProfileRegistry · Provisioner · Monitor · decoder     │    │
//! │  │  DisplayController (pure logic)                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Dispatcher (main thread) · flash + refresh (display thread)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use log::info;

use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use iotdisplay::adapters::bluedroid::{self, BluedroidLink};
use iotdisplay::adapters::label::TextLabel;
use iotdisplay::adapters::log_sink::LogEventSink;
use iotdisplay::adapters::panel::St7789Panel;
use iotdisplay::adapters::time::MonotonicClock;
use iotdisplay::app::display::{DisplayController, Screen};
use iotdisplay::channels::{FLASH_REQUESTS, STACK_EVENTS};
use iotdisplay::config::DeviceConfig;
use iotdisplay::drivers::hw_init;
use iotdisplay::gatt::registry::ProfileRegistry;
use iotdisplay::gatt::{COLOR_CHAR_UUID, TEXT_CHAR_UUID};
use iotdisplay::tasks;
use iotdisplay::tasks::dispatch::Dispatcher;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  IoT Display v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = DeviceConfig::default();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    // Erases and retries when the partition is full or from a newer IDF.
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Panel + initial screen ─────────────────────────────
    let panel = St7789Panel::new(&config.panel)?;
    let label = TextLabel::new(config.panel.width, config.panel.height, &config.label);
    let mut screen = Screen::new(
        panel,
        label,
        config.label.initial_color,
        config.feedback.band_height,
    );
    screen.show(config.label.initial_text.as_bytes());
    let screen = screen.into_shared();
    hw_init::init_backlight()?;

    tasks::spawn_display(
        screen.clone(),
        &FLASH_REQUESTS,
        Duration::from_millis(u64::from(config.refresh_tick_ms)),
    )?;

    // ── 3. BLE stack ──────────────────────────────────────────
    // Held for the life of the program; dropping it stops the controller.
    let _bt = bluedroid::start_stack(peripherals.modem, nvs)?;

    let display = DisplayController::new(screen, FLASH_REQUESTS.dyn_sender());
    let mut dispatcher = Dispatcher::new(
        ProfileRegistry::new(&config),
        BluedroidLink::new(),
        display,
        LogEventSink::new(),
        MonotonicClock::new(),
    );
    dispatcher.register(config.gatt.app_id)?;

    info!("System ready. Waiting for BLE connections...");
    info!("Device name: {}", config.advertising.device_name);
    info!("Color characteristic UUID: 0x{:04X}", COLOR_CHAR_UUID);
    info!("Text characteristic UUID: 0x{:04X}", TEXT_CHAR_UUID);

    // ── 4. Dispatch forever ───────────────────────────────────
    futures_lite::future::block_on(dispatcher.run(STACK_EVENTS.dyn_receiver()));
    Ok(())
}
