//! Device configuration parameters
//!
//! All tunable parameters for the display peripheral: GATT identity,
//! advertising payload, panel geometry, label layout and the lifecycle
//! feedback flashes.  Defaults match the shipped hardware; nothing here is
//! persisted across restarts.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::color::Rgb565;

/// Largest text payload accepted on the text characteristic.
pub const MAX_TEXT_LEN: usize = 100;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub gatt: GattConfig,
    pub advertising: AdvertisingConfig,
    pub panel: PanelConfig,
    pub label: LabelConfig,
    pub feedback: FeedbackConfig,
    /// Refresh task tick (milliseconds)
    pub refresh_tick_ms: u32,
}

/// GATT server identity and provisioning limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GattConfig {
    /// Application id passed to the GATT server registration
    pub app_id: u16,
    /// Handles reserved for the service (service + 2 × (decl + value) + spare)
    pub num_handles: u16,
    /// Local MTU requested from the stack
    pub local_mtu: u16,
    /// Deadline for reaching `Ready` after registration is requested
    pub provisioning_deadline_ms: u64,
}

/// Advertising payload and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvertisingConfig {
    pub device_name: heapless::String<29>,
    pub include_tx_power: bool,
    /// Preferred connection interval hint, in 1.25 ms units
    pub min_conn_interval: u16,
    pub max_conn_interval: u16,
    /// Advertising interval, in 0.625 ms units
    pub adv_interval_min: u16,
    pub adv_interval_max: u16,
}

/// Panel geometry (after rotation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub width: u16,
    pub height: u16,
    /// Column / row offset of the visible window inside controller RAM
    pub gap_x: u16,
    pub gap_y: u16,
    pub swap_xy: bool,
    pub mirror_x: bool,
    pub mirror_y: bool,
    pub invert_colors: bool,
}

/// On-screen label layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub initial_text: heapless::String<32>,
    pub initial_color: Rgb565,
    pub text_color: Rgb565,
    /// Horizontal margin subtracted from the panel width for wrapping
    pub margin_px: u16,
    /// Rows rendered per partial redraw band
    pub band_rows: u16,
}

/// Connect / disconnect flash feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub connect_color: Rgb565,
    pub disconnect_color: Rgb565,
    pub hold_ms: u32,
    /// Height of the full-width band painted at the top of the panel
    pub band_height: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            gatt: GattConfig::default(),
            advertising: AdvertisingConfig::default(),
            panel: PanelConfig::default(),
            label: LabelConfig::default(),
            feedback: FeedbackConfig::default(),
            refresh_tick_ms: 10,
        }
    }
}

impl Default for GattConfig {
    fn default() -> Self {
        Self {
            app_id: 0,
            num_handles: 8,
            local_mtu: 500,
            provisioning_deadline_ms: 10_000,
        }
    }
}

impl Default for AdvertisingConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("ESP32_IoT_Display");
        Self {
            device_name,
            include_tx_power: true,
            min_conn_interval: 0x0006, // 7.5 ms
            max_conn_interval: 0x0010, // 20 ms
            adv_interval_min: 0x20,    // 20 ms
            adv_interval_max: 0x40,    // 40 ms
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 172,
            gap_x: 0,
            gap_y: 34,
            swap_xy: true,
            mirror_x: false,
            mirror_y: true,
            invert_colors: true,
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        let mut initial_text = heapless::String::new();
        let _ = initial_text.push_str("Ready");
        Self {
            initial_text,
            initial_color: Rgb565::BLACK,
            text_color: Rgb565::WHITE,
            margin_px: 40,
            band_rows: 40,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            connect_color: Rgb565::GREEN,
            disconnect_color: Rgb565::RED,
            hold_ms: 300,
            band_height: 30,
        }
    }
}

impl DeviceConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.advertising.device_name.is_empty() {
            return Err(ConfigError::ValidationFailed("device_name must not be empty"));
        }
        // 7.5 ms .. 4 s, min <= max
        let (lo, hi) = (self.advertising.min_conn_interval, self.advertising.max_conn_interval);
        if lo < 0x0006 || hi > 0x0C80 || lo > hi {
            return Err(ConfigError::ValidationFailed("connection interval hint out of range"));
        }
        let (lo, hi) = (self.advertising.adv_interval_min, self.advertising.adv_interval_max);
        if lo < 0x20 || hi > 0x4000 || lo > hi {
            return Err(ConfigError::ValidationFailed("advertising interval out of range"));
        }
        if !(23..=517).contains(&self.gatt.local_mtu) {
            return Err(ConfigError::ValidationFailed("local_mtu must be 23..=517"));
        }
        // service decl + 2 × (char decl + value)
        if self.gatt.num_handles < 5 {
            return Err(ConfigError::ValidationFailed("num_handles too small for two characteristics"));
        }
        if self.gatt.provisioning_deadline_ms == 0 {
            return Err(ConfigError::ValidationFailed("provisioning deadline must be non-zero"));
        }
        if self.panel.width == 0 || self.panel.height == 0 {
            return Err(ConfigError::ValidationFailed("panel dimensions must be non-zero"));
        }
        if self.label.margin_px >= self.panel.width {
            return Err(ConfigError::ValidationFailed("label margin wider than panel"));
        }
        if self.label.band_rows == 0 || self.label.band_rows > self.panel.height {
            return Err(ConfigError::ValidationFailed("band_rows must be 1..=panel height"));
        }
        if self.feedback.band_height == 0 || self.feedback.band_height > self.panel.height {
            return Err(ConfigError::ValidationFailed("flash band height out of range"));
        }
        if self.refresh_tick_ms == 0 {
            return Err(ConfigError::ValidationFailed("refresh tick must be non-zero"));
        }
        Ok(())
    }

    /// Parse a JSON override and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
