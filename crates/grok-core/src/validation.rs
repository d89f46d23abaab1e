//! # Validation Module
//!
//! Validation for settings coming from the settings dialog or a config file.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: View (sliders, toggles)                                      │
//! │  └── Sliders are bounded, but a config file is not                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Deserialization (serde)                                      │
//! │  └── Types and per-field defaults                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE                                                  │
//! │  ├── Percentages in [0, 100]                                           │
//! │  └── Word separator list non-empty, no duplicates                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use grok_core::types::KeyboardSettings;
//! use grok_core::validation::validate_settings;
//!
//! assert!(validate_settings(&KeyboardSettings::default()).is_ok());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::KeyboardSettings;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for both sliders.
pub const MAX_PERCENT: u8 = 100;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a slider percentage.
///
/// ## Example
/// ```rust
/// use grok_core::validation::validate_percent;
///
/// assert!(validate_percent("power_percent", 0).is_ok());
/// assert!(validate_percent("power_percent", 100).is_ok());
/// assert!(validate_percent("power_percent", 101).is_err());
/// ```
pub fn validate_percent(field: &str, value: u8) -> ValidationResult<()> {
    if value > MAX_PERCENT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PERCENT as i64,
        });
    }

    Ok(())
}

/// Validates all six persisted settings.
///
/// The boolean toggles cannot be invalid, so only the sliders are checked.
pub fn validate_settings(settings: &KeyboardSettings) -> ValidationResult<()> {
    validate_percent("power_percent", settings.power_percent)?;
    validate_percent("volume_percent", settings.volume_percent)?;
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a word separator list.
///
/// ## Rules
/// - Must not be empty
/// - Each character may appear only once
pub fn validate_word_separators(separators: &str) -> ValidationResult<()> {
    if separators.is_empty() {
        return Err(ValidationError::Required {
            field: "word_separators".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for c in separators.chars() {
        if !seen.insert(c) {
            return Err(ValidationError::InvalidFormat {
                field: "word_separators".to_string(),
                reason: format!("'{}' appears more than once", c.escape_default()),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::DEFAULT_WORD_SEPARATORS;

    #[test]
    fn test_validate_percent() {
        assert!(validate_percent("volume_percent", 0).is_ok());
        assert!(validate_percent("volume_percent", 55).is_ok());
        assert!(validate_percent("volume_percent", 100).is_ok());
        assert!(validate_percent("volume_percent", 101).is_err());
        assert!(validate_percent("volume_percent", 255).is_err());
    }

    #[test]
    fn test_validate_settings() {
        let mut settings = KeyboardSettings::default();
        assert!(validate_settings(&settings).is_ok());

        settings.volume_percent = 120;
        let err = validate_settings(&settings).unwrap_err();
        assert_eq!(err.to_string(), "volume_percent must be between 0 and 100");
    }

    #[test]
    fn test_validate_word_separators() {
        assert!(validate_word_separators(DEFAULT_WORD_SEPARATORS).is_ok());
        assert!(validate_word_separators(" ,").is_ok());
        assert!(validate_word_separators("").is_err());
        assert!(matches!(
            validate_word_separators(",,"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
