//! # grok-scan: Scan Controller for the Grok Keyboard
//!
//! Runtime layer around `grok-core`: owns the reader, the settings file and
//! the scan lifecycle, and drives the text engine from a single task.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Controller Architecture                     │
//! │                                                                         │
//! │   host keyboard view          Grokker reader           settings file    │
//! │          │                          │                        │          │
//! │          │ key / toggle / dialog    │ sink events            │          │
//! │          ▼                          ▼                        ▼          │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 ScanController (one tokio task)                  │  │
//! │  │                                                                  │  │
//! │  │  TextComposingEngine  ConnectionStateTracker  ScanPhase          │  │
//! │  │  (grok-core)          (connection.rs)         Idle/Starting/     │  │
//! │  │                                               Active/Stopping    │  │
//! │  └───────────────┬───────────────────────────────────┬──────────────┘  │
//! │                  │ InputConnection                   │ emitter          │
//! │                  ▼                                   ▼                  │
//! │            host editor                 icon, candidates, dialog,       │
//! │                                        battery, error messages         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`controller`] - `ScanController` actor and its handle
//! - [`device`] - Reader contract and the per-session event sink
//! - [`connection`] - Connection state mirror
//! - [`config`] - `keyboard.toml` loading and the settings store
//! - [`emitter`] - Notifications to the view layer
//! - [`sim`] - Simulated reader and shared editor
//! - [`error`] - Scan error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use grok_scan::{ScanController, SimulatedGrokker, TomlSettingsStore};
//!
//! let file = SettingsFile::load_or_default(None);
//! let controller = ScanController::new(
//!     Arc::new(SimulatedGrokker::new(SimConfig::default())),
//!     Arc::new(NoOpEmitter),
//!     Arc::new(TomlSettingsStore::new(None)),
//!     file.controller,
//!     Box::new(SharedEditor::new()),
//! );
//! let handle = controller.start();
//! handle.toggle_scan()?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod connection;
pub mod controller;
pub mod device;
pub mod emitter;
pub mod error;
pub mod sim;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{
    ControllerConfig, MemorySettingsStore, SettingsFile, SettingsStore, TomlSettingsStore,
};
pub use connection::{ConnectionStateTracker, ConnectionUpdate};
pub use controller::{ControllerSnapshot, ScanController, ScanControllerHandle, ScanPhaseKind};
pub use device::{BatteryCallback, GrokkerDevice, InventoryEventSink, StopCompletion};
pub use emitter::{EventSinkEmitter, KeyboardEvent, KeyboardEventEmitter, NoOpEmitter, SettingsView};
pub use error::{ScanError, ScanResult};
pub use sim::{SharedEditor, SimConfig, SimulatedGrokker};
