//! # Scan Error Types
//!
//! Error types for the scan controller, the reader and settings persistence.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Device      │  │     Controller          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  StartFailed    │  │  ShuttingDown           │ │
//! │  │  ConfigLoad     │  │  NotConnected   │  │  ChannelError           │ │
//! │  │  ConfigSave     │  │                 │  │  Core (key, suggestion) │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inventory results reported by the reader are not errors here: they are
//! [`grok_core::InventoryResult`] values turned into a user message.

use grok_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Scan error type covering every runtime failure.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid settings or controller configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Device Errors
    // =========================================================================
    /// The reader refused to start an inventory.
    #[error("Failed to start inventory: {0}")]
    StartFailed(String),

    /// The reader is not connected.
    #[error("Grokker is not connected")]
    NotConnected,

    // =========================================================================
    // Controller Errors
    // =========================================================================
    /// A key code or suggestion index the engine rejected.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Controller is shutting down.
    #[error("Scan controller is shutting down")]
    ShuttingDown,

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ScanError {
    fn from(err: ValidationError) -> Self {
        ScanError::InvalidConfig(err.to_string())
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::ConfigSaveFailed(err.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ScanError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ScanError::ShuttingDown
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for ScanError {
    fn from(err: tokio::sync::oneshot::error::RecvError) -> Self {
        ScanError::ChannelError(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if the user can simply try again.
    ///
    /// ## Retryable Errors
    /// - The reader refused to start (busy, still connecting)
    /// - The reader is not connected yet
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanError::StartFailed(_) | ScanError::NotConnected)
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_)
                | ScanError::ConfigLoadFailed(_)
                | ScanError::ConfigSaveFailed(_)
        )
    }
}
