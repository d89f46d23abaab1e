//! # Status Icon
//!
//! Derives the single status icon shown on the scan key from the signals
//! that race each other during a session.
//!
//! ## Priority
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stopping?            ──yes──► StoppingInventory                        │
//! │     │ no                                                                │
//! │  dialog visible?      ──yes──► SettingsDisplayed                        │
//! │     │ no                                                                │
//! │  connecting?          ──yes──► Connecting                               │
//! │     │ no                                                                │
//! │  connected + scan?    ──yes──► Scanning                                 │
//! │     │ no                                                                │
//! │  connected?           ──yes──► Connected                                │
//! │     │ no                                                                │
//! │  (not connected, incompatible reader) ──► NotConnected                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::ConnectionState;

/// Icon shown on the scan key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StatusIcon {
    StoppingInventory,
    SettingsDisplayed,
    Connecting,
    Scanning,
    Connected,
    NotConnected,
}

impl std::fmt::Display for StatusIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusIcon::StoppingInventory => "stopping_inventory",
            StatusIcon::SettingsDisplayed => "settings_displayed",
            StatusIcon::Connecting => "connecting",
            StatusIcon::Scanning => "scanning",
            StatusIcon::Connected => "connected",
            StatusIcon::NotConnected => "not_connected",
        };
        f.write_str(name)
    }
}

/// Resolves the icon. First match wins.
pub fn resolve(
    stopping: bool,
    dialog_visible: bool,
    connection: ConnectionState,
    scan_active: bool,
) -> StatusIcon {
    if stopping {
        return StatusIcon::StoppingInventory;
    }
    if dialog_visible {
        return StatusIcon::SettingsDisplayed;
    }
    match connection {
        ConnectionState::Connecting => StatusIcon::Connecting,
        ConnectionState::Connected if scan_active => StatusIcon::Scanning,
        ConnectionState::Connected => StatusIcon::Connected,
        ConnectionState::NotConnected | ConnectionState::IncompatibleReader => {
            StatusIcon::NotConnected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopping_wins() {
        assert_eq!(
            resolve(true, true, ConnectionState::Connected, true),
            StatusIcon::StoppingInventory
        );
        assert_eq!(
            resolve(true, false, ConnectionState::NotConnected, false),
            StatusIcon::StoppingInventory
        );
    }

    #[test]
    fn test_dialog_beats_connection() {
        assert_eq!(
            resolve(false, true, ConnectionState::Connected, true),
            StatusIcon::SettingsDisplayed
        );
        assert_eq!(
            resolve(false, true, ConnectionState::Connecting, false),
            StatusIcon::SettingsDisplayed
        );
    }

    #[test]
    fn test_connection_states() {
        assert_eq!(
            resolve(false, false, ConnectionState::Connecting, true),
            StatusIcon::Connecting
        );
        assert_eq!(
            resolve(false, false, ConnectionState::Connected, true),
            StatusIcon::Scanning
        );
        assert_eq!(
            resolve(false, false, ConnectionState::Connected, false),
            StatusIcon::Connected
        );
        assert_eq!(
            resolve(false, false, ConnectionState::NotConnected, false),
            StatusIcon::NotConnected
        );
        assert_eq!(
            resolve(false, false, ConnectionState::IncompatibleReader, true),
            StatusIcon::NotConnected
        );
    }
}
