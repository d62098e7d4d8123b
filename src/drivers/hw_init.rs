//! One-shot board bring-up.
//!
//! Configures the backlight GPIO with raw ESP-IDF sys calls.  Called once
//! from `main()` after the panel is initialised, so the first visible
//! frame is the initial screen rather than controller RAM noise.

use crate::error::InitError;

#[cfg(target_os = "espidf")]
pub fn init_backlight() -> Result<(), InitError> {
    use crate::pins;
    use esp_idf_svc::sys::*;

    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::LCD_BACKLIGHT_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    // SAFETY: called once from main() before any task starts.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::Backlight(ret));
    }
    // SAFETY: the pin was configured as an output above.
    let ret = unsafe { gpio_set_level(pins::LCD_BACKLIGHT_GPIO, pins::LCD_BACKLIGHT_ON_LEVEL) };
    if ret != ESP_OK as i32 {
        return Err(InitError::Backlight(ret));
    }
    log::info!("hw_init: backlight on (GPIO{})", pins::LCD_BACKLIGHT_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_backlight() -> Result<(), InitError> {
    log::info!("hw_init(sim): backlight skipped");
    Ok(())
}
