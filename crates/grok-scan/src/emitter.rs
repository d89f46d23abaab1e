//! # View Notifications
//!
//! Everything the controller tells the view layer goes through
//! [`KeyboardEventEmitter`].
//!
//! ## Events
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  status_icon       - scan key icon changed                              │
//! │  candidates        - candidate strip contents changed                   │
//! │  keyboard_state    - layout or shift state changed                      │
//! │  settings_dialog   - slider values / labels for the settings dialog     │
//! │  settings_changed  - settings confirmed and persisted                   │
//! │  battery           - battery row of the settings dialog                 │
//! │  error             - { title: "Inventory Error", message: "..." }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use grok_core::scaling::PowerVolumeScaler;
use grok_core::status::StatusIcon;
use grok_core::types::{BatteryDisplay, KeyboardMode, KeyboardSettings, ShiftState};

/// Title of the dialog shown for inventory failures.
pub const INVENTORY_ERROR_TITLE: &str = "Inventory Error";

/// Title of the dialog shown when settings cannot be saved.
pub const SETTINGS_ERROR_TITLE: &str = "Settings Error";

// =============================================================================
// Settings Dialog Model
// =============================================================================

/// Slider values and their labels as the settings dialog shows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsView {
    pub settings: KeyboardSettings,
    pub power_label: String,
    pub volume_label: String,
}

impl SettingsView {
    pub fn new(settings: KeyboardSettings) -> Self {
        SettingsView {
            power_label: PowerVolumeScaler::power_label(settings.power_percent),
            volume_label: PowerVolumeScaler::volume_label(settings.volume_percent),
            settings,
        }
    }
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Trait for pushing controller state to the view layer.
pub trait KeyboardEventEmitter: Send + Sync {
    /// The scan key icon changed.
    fn emit_status_icon(&self, icon: StatusIcon);

    /// The candidate strip changed.
    fn emit_candidates(&self, candidates: &[String]);

    /// Layout or shift state changed.
    fn emit_keyboard_state(&self, mode: KeyboardMode, shift: ShiftState);

    /// The settings dialog should show these values.
    fn emit_settings_dialog(&self, view: &SettingsView);

    /// Settings were confirmed and persisted.
    fn emit_settings_changed(&self, settings: &KeyboardSettings);

    /// Battery row of the settings dialog.
    fn emit_battery(&self, display: BatteryDisplay);

    /// A message the user must acknowledge.
    fn emit_error(&self, title: &str, message: &str);
}

/// No-op event emitter.
pub struct NoOpEmitter;

impl KeyboardEventEmitter for NoOpEmitter {
    fn emit_status_icon(&self, _icon: StatusIcon) {}
    fn emit_candidates(&self, _candidates: &[String]) {}
    fn emit_keyboard_state(&self, _mode: KeyboardMode, _shift: ShiftState) {}
    fn emit_settings_dialog(&self, _view: &SettingsView) {}
    fn emit_settings_changed(&self, _settings: &KeyboardSettings) {}
    fn emit_battery(&self, _display: BatteryDisplay) {}
    fn emit_error(&self, _title: &str, _message: &str) {}
}

// =============================================================================
// Event Value
// =============================================================================

/// One emitted notification as a value, for emitters that queue, record or
/// serialize what they receive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KeyboardEvent {
    StatusIcon { icon: StatusIcon },
    Candidates { candidates: Vec<String> },
    KeyboardState { mode: KeyboardMode, shift: ShiftState },
    SettingsDialog { view: SettingsView },
    SettingsChanged { settings: KeyboardSettings },
    /// `label` is the row text, absent when the row is hidden.
    Battery {
        display: BatteryDisplay,
        label: Option<String>,
    },
    Error { title: String, message: String },
}

impl KeyboardEvent {
    pub fn battery(display: BatteryDisplay) -> Self {
        KeyboardEvent::Battery {
            display,
            label: display.label(),
        }
    }
}

/// Adapts a closure receiving [`KeyboardEvent`] values into an emitter.
pub struct EventSinkEmitter<F> {
    sink: F,
}

impl<F> EventSinkEmitter<F>
where
    F: Fn(KeyboardEvent) + Send + Sync,
{
    pub fn new(sink: F) -> Self {
        EventSinkEmitter { sink }
    }
}

impl<F> KeyboardEventEmitter for EventSinkEmitter<F>
where
    F: Fn(KeyboardEvent) + Send + Sync,
{
    fn emit_status_icon(&self, icon: StatusIcon) {
        (self.sink)(KeyboardEvent::StatusIcon { icon });
    }

    fn emit_candidates(&self, candidates: &[String]) {
        (self.sink)(KeyboardEvent::Candidates {
            candidates: candidates.to_vec(),
        });
    }

    fn emit_keyboard_state(&self, mode: KeyboardMode, shift: ShiftState) {
        (self.sink)(KeyboardEvent::KeyboardState { mode, shift });
    }

    fn emit_settings_dialog(&self, view: &SettingsView) {
        (self.sink)(KeyboardEvent::SettingsDialog { view: view.clone() });
    }

    fn emit_settings_changed(&self, settings: &KeyboardSettings) {
        (self.sink)(KeyboardEvent::SettingsChanged {
            settings: *settings,
        });
    }

    fn emit_battery(&self, display: BatteryDisplay) {
        (self.sink)(KeyboardEvent::battery(display));
    }

    fn emit_error(&self, title: &str, message: &str) {
        (self.sink)(KeyboardEvent::Error {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_settings_view_labels() {
        let view = SettingsView::new(KeyboardSettings {
            power_percent: 0,
            volume_percent: 0,
            ..KeyboardSettings::default()
        });
        assert_eq!(view.power_label, "5%");
        assert_eq!(view.volume_label, "Off");
    }

    #[test]
    fn test_sink_emitter_forwards_events() {
        let events = Mutex::new(Vec::new());
        let emitter = EventSinkEmitter::new(|event| events.lock().unwrap().push(event));

        emitter.emit_status_icon(StatusIcon::Scanning);
        emitter.emit_error(INVENTORY_ERROR_TITLE, "Region is not set");
        drop(emitter);

        let events = events.into_inner().unwrap();
        assert_eq!(
            events,
            vec![
                KeyboardEvent::StatusIcon {
                    icon: StatusIcon::Scanning
                },
                KeyboardEvent::Error {
                    title: "Inventory Error".to_string(),
                    message: "Region is not set".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(KeyboardEvent::StatusIcon {
            icon: StatusIcon::StoppingInventory,
        })
        .unwrap();
        assert_eq!(json["event"], "status_icon");
        assert_eq!(json["icon"], "stopping_inventory");
    }

    #[test]
    fn test_battery_event_carries_label() {
        let json =
            serde_json::to_value(KeyboardEvent::battery(BatteryDisplay::Remaining { percent: 42 }))
                .unwrap();
        assert_eq!(json["event"], "battery");
        assert_eq!(json["label"], "Battery: 42%");

        let hidden = serde_json::to_value(KeyboardEvent::battery(BatteryDisplay::Hidden)).unwrap();
        assert!(hidden["label"].is_null());
    }
}
