//! Player preferences
//!
//! Persisted in LocalStorage, separate from the tuning config.

use serde::{Deserialize, Serialize};

use crate::tuning::DriveConfig;

/// Effect quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Particles spawned by one crash explosion
    pub fn burst_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 24,
            QualityPreset::Medium => 60,
            QualityPreset::High => 120,
        }
    }
}

/// Which input drives the steering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ControlScheme {
    /// Tilt if the device grants it, otherwise keys
    #[default]
    Auto,
    Tilt,
    Keyboard,
}

impl ControlScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlScheme::Auto => "Auto",
            ControlScheme::Tilt => "Tilt",
            ControlScheme::Keyboard => "Keyboard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(ControlScheme::Auto),
            "tilt" => Some(ControlScheme::Tilt),
            "keyboard" | "keys" => Some(ControlScheme::Keyboard),
            _ => None,
        }
    }

    pub fn uses_tilt(&self) -> bool {
        matches!(self, ControlScheme::Auto | ControlScheme::Tilt)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Particle quality
    pub quality: QualityPreset,
    pub controls: ControlScheme,
    /// Multiplier on the base steering sensitivity (0.25 - 3.0)
    pub steer_sensitivity: f32,

    // === HUD ===
    /// Telemetry line under the speedometer
    pub debug_overlay: bool,

    // === Audio ===
    pub sound_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Stop driving when the page is hidden
    pub pause_on_blur: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            controls: ControlScheme::Auto,
            steer_sensitivity: 1.0,
            debug_overlay: false,
            sound_enabled: true,
            master_volume: 0.8,
            pause_on_blur: true,
        }
    }
}

impl Settings {
    /// Apply `key=value` overrides from a URL query string such as
    /// `?quality=high&controls=keyboard`. Returns how many were applied;
    /// unknown keys and unparsable values are logged and skipped.
    pub fn apply_query(&mut self, query: &str) -> usize {
        let mut applied = 0;
        let pairs = query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")));

        for (key, value) in pairs {
            let ok = match key {
                "quality" => QualityPreset::from_str(value).map(|q| self.quality = q),
                "controls" => ControlScheme::from_str(value).map(|c| self.controls = c),
                "sensitivity" => value
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| self.steer_sensitivity = v.clamp(0.25, 3.0)),
                "volume" => value
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| self.master_volume = v.clamp(0.0, 1.0)),
                "sound" => parse_flag(value).map(|on| self.sound_enabled = on),
                "debug" => parse_flag(value).map(|on| self.debug_overlay = on),
                "pause_on_blur" => parse_flag(value).map(|on| self.pause_on_blur = on),
                _ => {
                    log::warn!("Unknown setting override '{}'", key);
                    continue;
                }
            };
            match ok {
                Some(()) => applied += 1,
                None => log::warn!("Bad value '{}' for setting '{}'", value, key),
            }
        }

        if applied > 0 {
            log::info!(
                "Settings overridden: quality {}, controls {}",
                self.quality.as_str(),
                self.controls.as_str()
            );
        }
        applied
    }

    /// Flip the sound flag; returns the new value
    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }

    /// Flip the debug overlay; returns the new value
    pub fn toggle_debug(&mut self) -> bool {
        self.debug_overlay = !self.debug_overlay;
        self.debug_overlay
    }

    /// Volume actually applied to audio (0 when muted)
    pub fn effective_volume(&self) -> f32 {
        if self.sound_enabled {
            self.master_volume.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Fold preferences into the drive config
    pub fn apply_to(&self, config: &mut DriveConfig) {
        config.burst_particles = self.quality.burst_particles();
        config.steer_sensitivity *= self.steer_sensitivity.clamp(0.25, 3.0);
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "tilt_drive_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                if storage.set_item(Self::STORAGE_KEY, &json).is_err() {
                    log::warn!("Failed to save settings");
                } else {
                    log::debug!("Settings saved");
                }
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "" | "1" | "on" | "true" => Some(true),
        "0" | "off" | "false" => Some(false),
        _ => None,
    }
}
