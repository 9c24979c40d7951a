//! Simulation settings
//!
//! Persisted in LocalStorage on the web, read from a JSON file by the native CLI.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Simulation and script-host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Scene ===
    /// Simulation width in logical units
    pub width: f32,
    /// Simulation height in logical units (floor at the bottom)
    pub height: f32,

    // === Physics ===
    /// Downward acceleration per tick
    pub gravity: f32,
    /// Fraction of speed kept per bounce, in (0, 1)
    pub restitution: f32,
    /// Landing speed treated as settled
    pub bounce_threshold: f32,

    // === Ball ===
    /// Radius used before any script sets one
    pub default_radius: f32,
    /// Largest accepted radius
    pub max_radius: f32,
    /// Ball colour (RGBA)
    pub ball_color: [f32; 4],

    // === Script host ===
    /// Loop iterations allowed per run
    pub loop_budget: u32,
    /// Longest string a script may build, in bytes
    pub max_string_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: SIM_WIDTH,
            height: SIM_HEIGHT,

            gravity: GRAVITY,
            restitution: RESTITUTION,
            bounce_threshold: BOUNCE_THRESHOLD,

            default_radius: DEFAULT_BALL_RADIUS,
            max_radius: MAX_BALL_RADIUS,
            ball_color: colors::BALL,

            loop_budget: SCRIPT_LOOP_BUDGET,
            max_string_len: SCRIPT_STRING_LIMIT,
        }
    }
}

/// Reason a settings document was rejected
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid setting {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl Settings {
    /// Parse and validate a JSON settings document (missing fields use defaults)
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the integrator cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field: &'static str, reason: &'static str| -> Result<(), SettingsError> {
            Err(SettingsError::Invalid { field, reason })
        };

        if !(self.width.is_finite() && self.width > 0.0) {
            return invalid("width", "must be positive");
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return invalid("height", "must be positive");
        }
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return invalid("gravity", "must be positive");
        }
        if !(self.restitution > 0.0 && self.restitution < 1.0) {
            return invalid("restitution", "must be between 0 and 1");
        }
        if !(self.bounce_threshold.is_finite() && self.bounce_threshold >= 0.0) {
            return invalid("bounce_threshold", "must not be negative");
        }
        if !(self.max_radius > 0.0 && self.max_radius <= self.width / 2.0) {
            return invalid("max_radius", "must fit half the simulation width");
        }
        if !(self.default_radius > 0.0 && self.default_radius <= self.max_radius) {
            return invalid("default_radius", "must be within max_radius");
        }
        if self.loop_budget == 0 {
            return invalid("loop_budget", "must be at least 1");
        }
        if self.max_string_len == 0 {
            return invalid("max_string_len", "must be at least 1");
        }
        Ok(())
    }

    /// Horizontal bounds of the logical domain
    pub fn x_range(&self) -> (f32, f32) {
        (-self.width / 2.0, self.width / 2.0)
    }

    /// Vertical bounds of the logical domain
    pub fn y_range(&self) -> (f32, f32) {
        (0.0, self.height)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "ball_drop_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
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

    /// Native stub; the CLI reads `--config` instead
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.x_range(), (-250.0, 250.0));
        assert_eq!(settings.y_range(), (0.0, 400.0));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "gravity": 0.8 }"#).unwrap();
        assert_eq!(settings.gravity, 0.8);
        assert_eq!(settings.restitution, RESTITUTION);
        assert_eq!(settings.max_radius, MAX_BALL_RADIUS);
    }

    #[test]
    fn test_rejects_bad_restitution() {
        let err = Settings::from_json(r#"{ "restitution": 1.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "restitution",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Settings::from_json("{ gravity"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_preserves_custom_values() {
        let settings = Settings {
            bounce_threshold: 1.5,
            loop_budget: 42,
            ..Settings::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }
}
