//! # grok-core: Pure Keyboard Logic for the Grok Keyboard
//!
//! This crate holds everything about the RFID soft keyboard that can be
//! expressed without touching a device, a channel or a file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Grok Keyboard Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  View layer (keys, icon, dialog)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ key codes / emitter events            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          grok-scan (controller actor, device, settings)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ grok-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ composer  │  │    epc    │  │  scaling  │  │  status   │  │   │
//! │  │   │ buffer,   │  │ hex/ascii │  │ power &   │  │ icon      │  │   │
//! │  │   │ shift     │  │ decode    │  │ volume    │  │ priority  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO ASYNC • NO LOGGING • DETERMINISTIC               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (settings, connection state, inventory results)
//! - [`composer`] - Composing buffer, shift / caps lock, candidates
//! - [`keys`] - Key code decoding
//! - [`epc`] - Tag identifier decoding
//! - [`scaling`] - Slider to device power / volume transform
//! - [`status`] - Status icon derivation
//! - [`error`] - Domain error types
//! - [`validation`] - Settings validation
//!
//! ## Example Usage
//!
//! ```rust
//! use grok_core::epc::EpcCodec;
//! use grok_core::status::{resolve, StatusIcon};
//! use grok_core::types::ConnectionState;
//!
//! assert_eq!(EpcCodec::decode("414243", true), "ABC");
//! assert_eq!(
//!     resolve(false, false, ConnectionState::Connected, true),
//!     StatusIcon::Scanning
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod composer;
pub mod epc;
pub mod error;
pub mod keys;
pub mod scaling;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use composer::{EditorInfo, InputConnection, TextComposingEngine};
pub use epc::EpcCodec;
pub use error::{CoreError, CoreResult, ValidationError};
pub use keys::{EditorKey, Key};
pub use scaling::PowerVolumeScaler;
pub use status::StatusIcon;
pub use types::*;
