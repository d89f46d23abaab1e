//! # Error Types
//!
//! Domain-specific error types for grok-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  grok-core errors (this file)                                          │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Settings / input validation failures           │
//! │                                                                         │
//! │  grok-scan errors (separate crate)                                     │
//! │  └── ScanError        - Controller, device and config failures         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ScanError → user message          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tag decoding and the status icon have no error outcome at all: a
//! malformed EPC falls back to hex display, and every combination of
//! signals maps to some icon.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A primary key code from the keyboard layout is not recognised.
    ///
    /// ## When This Occurs
    /// - The view layer sends a negative code that is not one of the
    ///   framework's special keys (shift, delete, mode change, ...)
    /// - The code is not a valid Unicode scalar value
    #[error("Unknown key code: {0}")]
    UnknownKeyCode(i32),

    /// Completion index outside the current candidate list.
    #[error("Suggestion index {index} out of range ({len} candidates)")]
    SuggestionOutOfRange { index: usize, len: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used when settings arrive from the dialog or from a config file.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g. a word separator list with duplicates).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SuggestionOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Suggestion index 4 out of range (2 candidates)");

        assert_eq!(CoreError::UnknownKeyCode(-42).to_string(), "Unknown key code: -42");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::OutOfRange {
            field: "power_percent".to_string(),
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "power_percent must be between 0 and 100");

        let err = ValidationError::Required {
            field: "word_separators".to_string(),
        };
        assert_eq!(err.to_string(), "word_separators is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "word_separators".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
