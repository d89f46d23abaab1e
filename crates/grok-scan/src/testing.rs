//! Test doubles for the reader and the view layer.

use std::sync::Mutex;
use std::time::Duration;

use uuid::Uuid;

use grok_core::status::StatusIcon;
use grok_core::types::{
    BatteryDisplay, BatteryInfo, ConnectionState, InventoryType, KeyboardMode, KeyboardSettings,
    PowerRange, RfidConfiguration, ShiftState,
};

use crate::device::{BatteryCallback, GrokkerDevice, InventoryEventSink, StopCompletion};
use crate::emitter::{KeyboardEvent, KeyboardEventEmitter, SettingsView};
use crate::error::{ScanError, ScanResult};

// =============================================================================
// Scripted Device
// =============================================================================

#[derive(Default)]
struct DeviceState {
    starts: Vec<(RfidConfiguration, InventoryEventSink)>,
    active: Option<Uuid>,
    pending_stops: Vec<StopCompletion>,
    stop_count: usize,
    battery_requests: usize,
    disconnect_delays: Vec<Duration>,
    start_error: Option<String>,
}

/// Reader whose callbacks fire only when the test says so. Stop
/// completions are held until [`ScriptedDevice::complete_stops`].
pub struct ScriptedDevice {
    connection: ConnectionState,
    battery: Option<BatteryInfo>,
    state: Mutex<DeviceState>,
}

impl ScriptedDevice {
    pub fn new(connection: ConnectionState) -> Self {
        ScriptedDevice {
            connection,
            battery: Some(BatteryInfo {
                external_power_connected: false,
                is_charging: false,
                percent_remaining: 80,
            }),
            state: Mutex::new(DeviceState::default()),
        }
    }

    pub fn min_power(&self) -> f64 {
        12.0
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().unwrap().starts.len()
    }

    pub fn last_sink(&self) -> Option<InventoryEventSink> {
        let state = self.state.lock().unwrap();
        state.starts.last().map(|(_, sink)| sink.clone())
    }

    pub fn last_config(&self) -> Option<RfidConfiguration> {
        let state = self.state.lock().unwrap();
        state.starts.last().map(|(config, _)| *config)
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().unwrap().stop_count
    }

    pub fn battery_requests(&self) -> usize {
        self.state.lock().unwrap().battery_requests
    }

    pub fn disconnect_delays(&self) -> Vec<Duration> {
        self.state.lock().unwrap().disconnect_delays.clone()
    }

    /// The next start request fails with `reason`.
    pub fn fail_next_start(&self, reason: &str) {
        self.state.lock().unwrap().start_error = Some(reason.to_string());
    }

    /// Finishes every hardware stop requested so far.
    pub fn complete_stops(&self) {
        let pending = {
            let mut state = self.state.lock().unwrap();
            state.active = None;
            std::mem::take(&mut state.pending_stops)
        };
        for on_stopped in pending {
            on_stopped();
        }
    }
}

impl GrokkerDevice for ScriptedDevice {
    fn start_inventory(
        &self,
        config: RfidConfiguration,
        events: InventoryEventSink,
    ) -> ScanResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.start_error.take() {
            return Err(ScanError::StartFailed(reason));
        }
        state.active = Some(events.session_id());
        state.starts.push((config, events));
        Ok(())
    }

    fn active_session(&self) -> Option<Uuid> {
        self.state.lock().unwrap().active
    }

    fn stop_inventory(&self, on_stopped: StopCompletion) {
        let mut state = self.state.lock().unwrap();
        state.stop_count += 1;
        state.pending_stops.push(on_stopped);
    }

    fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    fn get_battery_info(&self, on_result: BatteryCallback) {
        self.state.lock().unwrap().battery_requests += 1;
        on_result(self.battery);
    }

    fn base_configuration(&self, kind: InventoryType) -> RfidConfiguration {
        RfidConfiguration {
            inventory_type: kind,
            volume: 1.0,
            power: PowerRange {
                init: 20.0,
                min: 15.0,
                max: 28.0,
            },
        }
    }

    fn min_allowable_power_level(&self) -> f64 {
        self.min_power()
    }

    fn set_disconnect_delay(&self, delay: Duration) {
        self.state.lock().unwrap().disconnect_delays.push(delay);
    }
}

// =============================================================================
// Recording Emitter
// =============================================================================

/// Emitter that keeps every event it receives.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<KeyboardEvent>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<KeyboardEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn icons(&self) -> Vec<StatusIcon> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                KeyboardEvent::StatusIcon { icon } => Some(icon),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                KeyboardEvent::Error { title, message } => Some((title, message)),
                _ => None,
            })
            .collect()
    }

    pub fn batteries(&self) -> Vec<BatteryDisplay> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                KeyboardEvent::Battery { display, .. } => Some(display),
                _ => None,
            })
            .collect()
    }

    pub fn settings_changed(&self) -> Vec<KeyboardSettings> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                KeyboardEvent::SettingsChanged { settings } => Some(settings),
                _ => None,
            })
            .collect()
    }

    pub fn keyboard_states(&self) -> Vec<(KeyboardMode, ShiftState)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                KeyboardEvent::KeyboardState { mode, shift } => Some((mode, shift)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: KeyboardEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl KeyboardEventEmitter for RecordingEmitter {
    fn emit_status_icon(&self, icon: StatusIcon) {
        self.push(KeyboardEvent::StatusIcon { icon });
    }

    fn emit_candidates(&self, candidates: &[String]) {
        self.push(KeyboardEvent::Candidates {
            candidates: candidates.to_vec(),
        });
    }

    fn emit_keyboard_state(&self, mode: KeyboardMode, shift: ShiftState) {
        self.push(KeyboardEvent::KeyboardState { mode, shift });
    }

    fn emit_settings_dialog(&self, view: &SettingsView) {
        self.push(KeyboardEvent::SettingsDialog { view: view.clone() });
    }

    fn emit_settings_changed(&self, settings: &KeyboardSettings) {
        self.push(KeyboardEvent::SettingsChanged {
            settings: *settings,
        });
    }

    fn emit_battery(&self, display: BatteryDisplay) {
        self.push(KeyboardEvent::battery(display));
    }

    fn emit_error(&self, title: &str, message: &str) {
        self.push(KeyboardEvent::Error {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
