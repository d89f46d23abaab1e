//! # Power & Volume Scaling
//!
//! Maps the 0-100 % settings sliders onto the reader's native ranges.
//!
//! ## Power Curve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  scaled = min_allowed + (original - min_allowed) * (percent / 100)      │
//! │                                                                         │
//! │   percent   0 ─────────────── 50 ─────────────── 100                    │
//! │   scaled    min_allowed ──── midpoint ──────── original                 │
//! │                                                                         │
//! │  Applied to each of init / min / max independently.                     │
//! │  Volume is simply percent / 100.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use grok_core::scaling::PowerVolumeScaler;
//! use grok_core::types::PowerRange;
//!
//! let base = PowerRange { init: 30.0, min: 20.0, max: 30.0 };
//! let scaled = PowerVolumeScaler::scale(base, 100, 50, 10.0);
//! assert_eq!(scaled.power, base);
//! assert_eq!(scaled.volume, 0.5);
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{KeyboardSettings, PowerRange, RfidConfiguration};

// =============================================================================
// Scaled Output
// =============================================================================

/// Scaled power levels plus the volume fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledPower {
    pub power: PowerRange,
    /// Volume fraction in [0, 1].
    pub volume: f64,
}

// =============================================================================
// Scaler
// =============================================================================

/// Pure slider-to-device transform.
pub struct PowerVolumeScaler;

impl PowerVolumeScaler {
    /// Scales `base` by `power_percent` toward `min_allowed` and converts
    /// `volume_percent` to a fraction.
    pub fn scale(
        base: PowerRange,
        power_percent: u8,
        volume_percent: u8,
        min_allowed: f64,
    ) -> ScaledPower {
        let factor = f64::from(power_percent) / 100.0;
        let scale_one = |original: f64| min_allowed + (original - min_allowed) * factor;

        ScaledPower {
            power: PowerRange {
                init: scale_one(base.init),
                min: scale_one(base.min),
                max: scale_one(base.max),
            },
            volume: f64::from(volume_percent) / 100.0,
        }
    }

    /// Builds the inventory configuration for a new session from the
    /// reader's base configuration and the settings snapshot.
    pub fn configure(
        base: RfidConfiguration,
        settings: &KeyboardSettings,
        min_allowed: f64,
    ) -> RfidConfiguration {
        let scaled = Self::scale(
            base.power,
            settings.power_percent,
            settings.volume_percent,
            min_allowed,
        );
        RfidConfiguration {
            inventory_type: settings.inventory_type(),
            volume: scaled.volume,
            power: scaled.power,
        }
    }

    /// Label under the power slider. The slider covers 5-100 % of the
    /// reader's usable range, so 0 reads "5%".
    pub fn power_label(power_percent: u8) -> String {
        let shown = (95.0 * (f64::from(power_percent) / 100.0)) as i32 + 5;
        format!("{}%", shown)
    }

    /// Label under the volume slider.
    pub fn volume_label(volume_percent: u8) -> String {
        if volume_percent == 0 {
            "Off".to_string()
        } else {
            format!("{}%", volume_percent)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
