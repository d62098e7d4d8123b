//! ST7789 panel adapter.
//!
//! Implements [`SurfacePort`] over the ESP-IDF `esp_lcd` component.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: SPI2 bus + `esp_lcd_new_panel_st7789`, raw
//!   sys calls like the rest of the hardware init.
//! - **all other targets**: an in-memory [`FrameBuffer`] with log output.
//!
//! Pixels travel as RGB565 in panel byte order (big-endian), so every push
//! is copied through a swap buffer.  `esp_lcd_panel_draw_bitmap` returns
//! before the DMA transfer finishes; the adapter waits for the
//! colour-transfer-done callback before touching the buffer again.

use log::info;

use crate::app::ports::{Region, SurfacePort};
use crate::color::Rgb565;
use crate::config::PanelConfig;
use crate::error::{InitError, SurfaceError};

#[cfg(not(target_os = "espidf"))]
use super::framebuffer::FrameBuffer;

#[cfg(target_os = "espidf")]
use crate::error::AllocError;
#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};

/// Rows moved per DMA transfer.
pub const CHUNK_ROWS: u16 = 40;

/// Largest single transfer on the bus, in bytes.
pub const fn max_transfer_bytes(width: u16) -> usize {
    width as usize * CHUNK_ROWS as usize * 2
}

#[cfg(target_os = "espidf")]
static TRANSFER_DONE: AtomicBool = AtomicBool::new(true);

#[cfg(target_os = "espidf")]
unsafe extern "C" fn on_color_trans_done(
    _io: esp_idf_svc::sys::esp_lcd_panel_io_handle_t,
    _edata: *mut esp_idf_svc::sys::esp_lcd_panel_io_event_data_t,
    _ctx: *mut core::ffi::c_void,
) -> bool {
    TRANSFER_DONE.store(true, Ordering::Release);
    false
}

pub struct St7789Panel {
    width: u16,
    height: u16,
    #[cfg(target_os = "espidf")]
    handle: esp_idf_svc::sys::esp_lcd_panel_handle_t,
    #[cfg(target_os = "espidf")]
    swap: Vec<u16>,
    #[cfg(not(target_os = "espidf"))]
    sim: FrameBuffer,
}

// SAFETY: the panel handle is only used through `&mut self`, and the
// adapter lives behind the display mutex.
#[cfg(target_os = "espidf")]
unsafe impl Send for St7789Panel {}

impl St7789Panel {
    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    pub fn new(cfg: &PanelConfig) -> Result<Self, InitError> {
        use crate::pins;
        use esp_idf_svc::sys::*;

        // SAFETY: called once from main before any task touches the panel.
        unsafe {
            let mut bus: spi_bus_config_t = Default::default();
            bus.__bindgen_anon_1.mosi_io_num = pins::LCD_MOSI_GPIO;
            bus.__bindgen_anon_2.miso_io_num = -1;
            bus.sclk_io_num = pins::LCD_CLK_GPIO;
            bus.__bindgen_anon_3.quadwp_io_num = -1;
            bus.__bindgen_anon_4.quadhd_io_num = -1;
            bus.max_transfer_sz = max_transfer_bytes(cfg.width) as i32;
            let ret = spi_bus_initialize(pins::LCD_SPI_HOST as _, &bus, spi_common_dma_t_SPI_DMA_CH_AUTO);
            if ret != ESP_OK as i32 {
                return Err(InitError::SpiBus(ret));
            }

            let io_cfg = esp_lcd_panel_io_spi_config_t {
                cs_gpio_num: pins::LCD_CS_GPIO,
                dc_gpio_num: pins::LCD_DC_GPIO,
                spi_mode: 0,
                pclk_hz: pins::LCD_PIXEL_CLOCK_HZ,
                trans_queue_depth: 10,
                on_color_trans_done: Some(on_color_trans_done),
                user_ctx: core::ptr::null_mut(),
                lcd_cmd_bits: 8,
                lcd_param_bits: 8,
                ..Default::default()
            };
            let mut io: esp_lcd_panel_io_handle_t = core::ptr::null_mut();
            let ret = esp_lcd_new_panel_io_spi(pins::LCD_SPI_HOST as _, &io_cfg, &mut io);
            if ret != ESP_OK as i32 {
                return Err(InitError::PanelIo(ret));
            }

            let mut dev_cfg: esp_lcd_panel_dev_config_t = Default::default();
            dev_cfg.reset_gpio_num = pins::LCD_RST_GPIO;
            dev_cfg.__bindgen_anon_1.rgb_ele_order = lcd_rgb_element_order_t_LCD_RGB_ELEMENT_ORDER_BGR;
            dev_cfg.bits_per_pixel = 16;
            let mut handle: esp_lcd_panel_handle_t = core::ptr::null_mut();
            let ret = esp_lcd_new_panel_st7789(io, &dev_cfg, &mut handle);
            if ret != ESP_OK as i32 {
                return Err(InitError::Panel(ret));
            }

            for ret in [
                esp_lcd_panel_reset(handle),
                esp_lcd_panel_init(handle),
                esp_lcd_panel_invert_color(handle, cfg.invert_colors),
                esp_lcd_panel_swap_xy(handle, cfg.swap_xy),
                esp_lcd_panel_mirror(handle, cfg.mirror_x, cfg.mirror_y),
                esp_lcd_panel_set_gap(handle, i32::from(cfg.gap_x), i32::from(cfg.gap_y)),
                esp_lcd_panel_disp_on_off(handle, true),
            ] {
                if ret != ESP_OK as i32 {
                    return Err(InitError::Panel(ret));
                }
            }

            info!(
                "PANEL: ST7789 {}x{} on SPI{} @ {} MHz",
                cfg.width,
                cfg.height,
                pins::LCD_SPI_HOST + 1,
                pins::LCD_PIXEL_CLOCK_HZ / 1_000_000
            );
            Ok(Self {
                width: cfg.width,
                height: cfg.height,
                handle,
                swap: Vec::new(),
            })
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(cfg: &PanelConfig) -> Result<Self, InitError> {
        info!("PANEL(sim): {}x{} frame buffer", cfg.width, cfg.height);
        Ok(Self {
            width: cfg.width,
            height: cfg.height,
            sim: FrameBuffer::new(cfg.width, cfg.height),
        })
    }

    /// In-memory pixels behind the simulated panel.
    #[cfg(not(target_os = "espidf"))]
    pub fn frame(&self) -> &FrameBuffer {
        &self.sim
    }

    fn check(&self, area: Region) -> Result<(), SurfaceError> {
        if area.fits(self.width, self.height) {
            Ok(())
        } else {
            Err(SurfaceError::OutOfBounds)
        }
    }

    #[cfg(target_os = "espidf")]
    fn ensure_swap(&mut self, len: usize) -> Result<(), SurfaceError> {
        if self.swap.len() < len {
            self.swap
                .try_reserve_exact(len - self.swap.len())
                .map_err(|_| AllocError { bytes: len * 2 })?;
            self.swap.resize(len, 0);
        }
        Ok(())
    }

    /// Send `rows` rows starting at `y` from the first part of the swap
    /// buffer and wait for the DMA to drain.
    #[cfg(target_os = "espidf")]
    fn draw_rows(&mut self, x: u16, y: u16, width: u16, rows: u16) -> Result<(), SurfaceError> {
        use esp_idf_svc::sys::*;

        TRANSFER_DONE.store(false, Ordering::Release);
        // SAFETY: `swap` holds at least `width * rows` pixels and is not
        // touched again until the transfer-done callback fires.
        let ret = unsafe {
            esp_lcd_panel_draw_bitmap(
                self.handle,
                i32::from(x),
                i32::from(y),
                i32::from(x + width),
                i32::from(y + rows),
                self.swap.as_ptr().cast(),
            )
        };
        if ret != ESP_OK as i32 {
            TRANSFER_DONE.store(true, Ordering::Release);
            return Err(SurfaceError::Bus(ret));
        }
        // 100 ms is far beyond a 25 KB transfer at 40 MHz.
        for _ in 0..10_000 {
            if TRANSFER_DONE.load(Ordering::Acquire) {
                return Ok(());
            }
            esp_idf_hal::delay::Ets::delay_us(10);
        }
        Err(SurfaceError::Bus(ESP_ERR_TIMEOUT as i32))
    }
}

#[cfg(target_os = "espidf")]
impl SurfacePort for St7789Panel {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn fill_region(&mut self, area: Region, color: Rgb565) -> Result<(), SurfaceError> {
        self.check(area)?;
        if area.is_empty() {
            return Ok(());
        }
        let chunk = CHUNK_ROWS.min(area.height);
        let len = area.width as usize * chunk as usize;
        self.ensure_swap(len)?;
        self.swap[..len].fill(color.raw().to_be());

        let mut y = area.y;
        let end = area.y + area.height;
        while y < end {
            let rows = chunk.min(end - y);
            self.draw_rows(area.x, y, area.width, rows)?;
            y += rows;
        }
        Ok(())
    }

    fn push_frame(&mut self, area: Region, pixels: &[u16]) -> Result<(), SurfaceError> {
        self.check(area)?;
        if pixels.len() < area.pixel_count() {
            return Err(SurfaceError::OutOfBounds);
        }
        if area.is_empty() {
            return Ok(());
        }
        let width = area.width as usize;
        let chunk = CHUNK_ROWS.min(area.height);
        self.ensure_swap(width * chunk as usize)?;

        let mut y = 0u16;
        while y < area.height {
            let rows = chunk.min(area.height - y);
            let start = y as usize * width;
            let len = rows as usize * width;
            for (dst, src) in self.swap[..len].iter_mut().zip(&pixels[start..start + len]) {
                *dst = src.to_be();
            }
            self.draw_rows(area.x, area.y + y, area.width, rows)?;
            y += rows;
        }
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl SurfacePort for St7789Panel {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn fill_region(&mut self, area: Region, color: Rgb565) -> Result<(), SurfaceError> {
        self.check(area)?;
        log::debug!("PANEL(sim): fill {:?} with {}", area, color);
        self.sim.fill_region(area, color)
    }

    fn push_frame(&mut self, area: Region, pixels: &[u16]) -> Result<(), SurfaceError> {
        self.check(area)?;
        self.sim.push_frame(area, pixels)
    }
}
