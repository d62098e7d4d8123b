//! GPIO pin assignments for the 1.47" ST7789 board.
//!
//! All pin numbers are ESP32 GPIO numbers, not physical pin positions.

// ── SPI panel ─────────────────────────────────────────────────

/// SPI host used for the panel (`SPI2_HOST`).
pub const LCD_SPI_HOST: u32 = 1;
pub const LCD_MOSI_GPIO: i32 = 6;
pub const LCD_CLK_GPIO: i32 = 7;
pub const LCD_CS_GPIO: i32 = 14;
pub const LCD_DC_GPIO: i32 = 15;
pub const LCD_RST_GPIO: i32 = 21;

/// Panel pixel clock.
pub const LCD_PIXEL_CLOCK_HZ: u32 = 40 * 1000 * 1000;

// ── Backlight ─────────────────────────────────────────────────

/// Backlight enable, active high.
pub const LCD_BACKLIGHT_GPIO: i32 = 22;
pub const LCD_BACKLIGHT_ON_LEVEL: u32 = 1;
