//! # Domain Types
//!
//! Core domain types shared by the composing engine and the scan controller.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ ConnectionState  │   │  KeyboardMode    │   │   ShiftState     │    │
//! │  │ ───────────────  │   │ ───────────────  │   │ ───────────────  │    │
//! │  │ NotConnected     │   │ Alphabetic       │   │ Unshifted        │    │
//! │  │ Connecting       │   │ Symbols          │   │ Shifted          │    │
//! │  │ Connected        │   │ SymbolsShifted   │   │ CapsLocked       │    │
//! │  │ IncompatibleRdr  │   └──────────────────┘   └──────────────────┘    │
//! │  └──────────────────┘                                                   │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ KeyboardSettings │   │ RfidConfiguration│   │ InventoryResult  │    │
//! │  │ ───────────────  │──►│ ───────────────  │   │ ───────────────  │    │
//! │  │ power/volume %   │   │ volume 0.0-1.0   │   │ Ok, LostConn,    │    │
//! │  │ find_one_only    │   │ power init/min/  │   │ BatteryTooLow,   │    │
//! │  │ ascii_decode ... │   │ max (device)     │   │ ... Other(code)  │    │
//! │  └──────────────────┘   └──────────────────┘   └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of the Grokker as reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No reader attached.
    #[default]
    NotConnected,
    /// Reader attached, handshake in progress.
    Connecting,
    /// Reader ready for inventory.
    Connected,
    /// Something is attached but it is not a Grokker we can drive.
    IncompatibleReader,
}

impl ConnectionState {
    /// Returns true only for [`ConnectionState::Connected`].
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::NotConnected => write!(f, "not_connected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::IncompatibleReader => write!(f, "incompatible_reader"),
        }
    }
}

// =============================================================================
// Keyboard Mode & Shift
// =============================================================================

/// The active key layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardMode {
    /// QWERTY letters.
    #[default]
    Alphabetic,
    /// Digits and punctuation.
    Symbols,
    /// Second page of symbols.
    SymbolsShifted,
}

impl KeyboardMode {
    /// Returns true for either symbols page.
    #[inline]
    pub fn is_symbols(&self) -> bool {
        matches!(self, KeyboardMode::Symbols | KeyboardMode::SymbolsShifted)
    }
}

/// Shift state of the alphabetic layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    #[default]
    Unshifted,
    /// Next letter is uppercased.
    Shifted,
    /// Every letter is uppercased until shift is pressed again.
    CapsLocked,
}

impl ShiftState {
    /// Returns true when letters should be uppercased.
    #[inline]
    pub fn is_shifted(&self) -> bool {
        !matches!(self, ShiftState::Unshifted)
    }
}

// =============================================================================
// RFID Configuration
// =============================================================================

/// Inventory mode requested from the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryType {
    /// Continuous reading at distance; the default keyboard mode.
    InventoryDistance,
    /// Stop-after-first-tag mode, used when only one tag is wanted.
    SingleFind,
}

impl InventoryType {
    /// Picks the inventory type for the find-one setting.
    pub fn for_find_one(find_one_only: bool) -> Self {
        if find_one_only {
            InventoryType::SingleFind
        } else {
            InventoryType::InventoryDistance
        }
    }
}

/// Device-native power levels for one inventory type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerRange {
    pub init: f64,
    pub min: f64,
    pub max: f64,
}

/// Configuration handed to the reader when an inventory starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RfidConfiguration {
    /// Which inventory algorithm to run.
    pub inventory_type: InventoryType,
    /// Beep volume as a fraction in [0, 1].
    pub volume: f64,
    /// Device-native power levels.
    pub power: PowerRange,
}

// =============================================================================
// Keyboard Settings
// =============================================================================

/// The six persisted user settings.
///
/// Read once when a scan session starts; edits made while a session is
/// running apply to the next session.
///
/// ## Example Config File
/// ```toml
/// power_percent = 100
/// volume_percent = 100
/// find_one_only = false
/// stay_connected = true
/// ascii_decode = true
/// always_add_comma_at_start = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KeyboardSettings {
    /// Transmit power slider, 0-100.
    #[serde(default = "default_percent")]
    pub power_percent: u8,

    /// Beep volume slider, 0-100.
    #[serde(default = "default_percent")]
    pub volume_percent: u8,

    /// Stop after the first tag of each scan.
    #[serde(default)]
    pub find_one_only: bool,

    /// Keep the reader connection open while the keyboard is idle.
    #[serde(default = "default_true")]
    pub stay_connected: bool,

    /// Decode EPCs as ASCII text when possible.
    #[serde(default = "default_true")]
    pub ascii_decode: bool,

    /// Prefix every scanned tag with a comma, even at the start of a field.
    #[serde(default)]
    pub always_add_comma_at_start: bool,
}

fn default_percent() -> u8 {
    100
}

fn default_true() -> bool {
    true
}

/// Inactivity delay before the reader closes its connection when the user
/// does not want to stay connected.
pub const DISCONNECT_DELAY_MS: u64 = 100;

impl Default for KeyboardSettings {
    fn default() -> Self {
        KeyboardSettings {
            power_percent: default_percent(),
            volume_percent: default_percent(),
            find_one_only: false,
            stay_connected: true,
            ascii_decode: true,
            always_add_comma_at_start: false,
        }
    }
}

impl KeyboardSettings {
    /// Delay before the reader drops an idle connection.
    /// Zero means "never drop".
    pub fn disconnect_delay(&self) -> Duration {
        if self.stay_connected {
            Duration::ZERO
        } else {
            Duration::from_millis(DISCONNECT_DELAY_MS)
        }
    }

    /// Inventory type derived from the find-one toggle.
    #[inline]
    pub fn inventory_type(&self) -> InventoryType {
        InventoryType::for_find_one(self.find_one_only)
    }
}

// =============================================================================
// Inventory Result
// =============================================================================

/// Terminal result reported by the reader when an inventory stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryResult {
    Ok,
    LostConnection,
    BatteryTooLow,
    TemperatureTooHigh,
    NotProvisioned,
    RegionNotSet,
    ErrorSending,
    /// Any code this keyboard does not know about.
    Other(i32),
}

impl InventoryResult {
    pub const CODE_OK: i32 = 0;
    pub const CODE_LOST_CONNECTION: i32 = 1;
    pub const CODE_BATTERY_TOO_LOW: i32 = 2;
    pub const CODE_TEMPERATURE_TOO_HIGH: i32 = 3;
    pub const CODE_NOT_PROVISIONED: i32 = 4;
    pub const CODE_REGION_NOT_SET: i32 = 5;
    pub const CODE_ERROR_SENDING: i32 = 6;

    /// Maps a raw reader code to a result.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::CODE_OK => InventoryResult::Ok,
            Self::CODE_LOST_CONNECTION => InventoryResult::LostConnection,
            Self::CODE_BATTERY_TOO_LOW => InventoryResult::BatteryTooLow,
            Self::CODE_TEMPERATURE_TOO_HIGH => InventoryResult::TemperatureTooHigh,
            Self::CODE_NOT_PROVISIONED => InventoryResult::NotProvisioned,
            Self::CODE_REGION_NOT_SET => InventoryResult::RegionNotSet,
            Self::CODE_ERROR_SENDING => InventoryResult::ErrorSending,
            other => InventoryResult::Other(other),
        }
    }

    /// Returns the raw reader code.
    pub fn code(&self) -> i32 {
        match self {
            InventoryResult::Ok => Self::CODE_OK,
            InventoryResult::LostConnection => Self::CODE_LOST_CONNECTION,
            InventoryResult::BatteryTooLow => Self::CODE_BATTERY_TOO_LOW,
            InventoryResult::TemperatureTooHigh => Self::CODE_TEMPERATURE_TOO_HIGH,
            InventoryResult::NotProvisioned => Self::CODE_NOT_PROVISIONED,
            InventoryResult::RegionNotSet => Self::CODE_REGION_NOT_SET,
            InventoryResult::ErrorSending => Self::CODE_ERROR_SENDING,
            InventoryResult::Other(code) => *code,
        }
    }

    /// Returns the message shown to the user, or `None` when the result is
    /// not worth surfacing (success, or a lost connection which the
    /// connection icon already reports).
    pub fn user_message(&self) -> Option<String> {
        let message = match self {
            InventoryResult::Ok | InventoryResult::LostConnection => return None,
            InventoryResult::BatteryTooLow => {
                "Battery level too low\nPlease charge the Grokker".to_string()
            }
            InventoryResult::TemperatureTooHigh => {
                "Temperature too high\nAllow the Grokker to cool down".to_string()
            }
            InventoryResult::NotProvisioned => "Grokker is not provisioned".to_string(),
            InventoryResult::RegionNotSet => "Region is not set".to_string(),
            InventoryResult::ErrorSending => "Error communicating with Grokker".to_string(),
            InventoryResult::Other(code) => format!("Grokker error: {}", code),
        };
        Some(message)
    }
}

// =============================================================================
// Battery
// =============================================================================

/// Battery report from the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryInfo {
    pub external_power_connected: bool,
    pub is_charging: bool,
    pub percent_remaining: u8,
}

/// What the settings dialog shows in its battery row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatteryDisplay {
    Charging,
    FullyCharged,
    Remaining { percent: u8 },
    /// Connected, but the reader has not answered yet.
    Pending,
    /// Nothing to show.
    Hidden,
}

impl BatteryDisplay {
    /// Derives the battery row from a (possibly missing) report.
    pub fn resolve(info: Option<BatteryInfo>, connected: bool) -> Self {
        match info {
            Some(info) if info.external_power_connected => {
                if info.is_charging {
                    BatteryDisplay::Charging
                } else {
                    BatteryDisplay::FullyCharged
                }
            }
            Some(info) => BatteryDisplay::Remaining {
                percent: info.percent_remaining,
            },
            None if connected => BatteryDisplay::Pending,
            None => BatteryDisplay::Hidden,
        }
    }

    /// Text for the battery row; `None` hides the row.
    pub fn label(&self) -> Option<String> {
        match self {
            BatteryDisplay::Charging => Some("Battery charging".to_string()),
            BatteryDisplay::FullyCharged => Some("Battery fully charged".to_string()),
            BatteryDisplay::Remaining { percent } => Some(format!("Battery: {}%", percent)),
            BatteryDisplay::Pending => Some("Battery level: checking".to_string()),
            BatteryDisplay::Hidden => None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
