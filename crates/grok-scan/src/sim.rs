//! # Simulated Grokker
//!
//! An in-process reader for demos and integration tests. Each inventory is
//! a tokio task that confirms the start, then reports one tag per tick from
//! a fixed EPC list until it is stopped.
//!
//! ```text
//! start_inventory ──► spawn ──► sleep(start_delay) ──► inventory_started
//!                                   │
//!                                   ▼
//!                       ┌── select! ───────────────────────────┐
//!                       │ tick      → tag_found(next epc)      │
//!                       │ stop_rx   → inventory_did_stop(OK)   │
//!                       │             on_stopped()             │
//!                       └──────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use grok_core::composer::{InputConnection, RecordingEditor};
use grok_core::keys::EditorKey;
use grok_core::types::{
    BatteryInfo, ConnectionState, InventoryResult, InventoryType, PowerRange, RfidConfiguration,
};

use crate::device::{BatteryCallback, GrokkerDevice, InventoryEventSink, StopCompletion};
use crate::error::{ScanError, ScanResult};

/// Power floor of the simulated reader, in dBm.
pub const SIM_MIN_POWER: f64 = 10.0;

/// Power range of the simulated reader's factory configuration, in dBm.
pub const SIM_BASE_POWER: PowerRange = PowerRange {
    init: 25.0,
    min: 15.0,
    max: 30.0,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Simulated Reader
// =============================================================================

struct RunningInventory {
    session_id: Uuid,
    stop_tx: oneshot::Sender<StopCompletion>,
}

struct SimState {
    connection: ConnectionState,
    running: Option<RunningInventory>,
    battery: Option<BatteryInfo>,
    disconnect_delay: Duration,
}

/// Configuration of a [`SimulatedGrokker`].
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// EPCs reported in order, then repeated.
    pub epcs: Vec<String>,
    /// Time between tags.
    pub tag_interval: Duration,
    /// Time from the start request to the start confirmation.
    pub start_delay: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            epcs: vec!["414243".to_string(), "31323334".to_string()],
            tag_interval: Duration::from_millis(250),
            start_delay: Duration::from_millis(50),
        }
    }
}

/// A reader that lives in the process.
pub struct SimulatedGrokker {
    config: SimConfig,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedGrokker {
    /// A connected reader with a 75 % battery.
    pub fn new(config: SimConfig) -> Self {
        SimulatedGrokker {
            config,
            state: Arc::new(Mutex::new(SimState {
                connection: ConnectionState::Connected,
                running: None,
                battery: Some(BatteryInfo {
                    external_power_connected: false,
                    is_charging: false,
                    percent_remaining: 75,
                }),
                disconnect_delay: Duration::ZERO,
            })),
        }
    }

    /// Changes the reported connection state. The caller forwards the change
    /// to the controller. Losing the connection ends the running inventory
    /// with a lost-connection result.
    pub fn set_connection(&self, connection: ConnectionState) {
        let mut state = lock(&self.state);
        state.connection = connection;
        if !connection.is_connected() {
            state.running = None;
        }
    }

    pub fn set_battery(&self, battery: Option<BatteryInfo>) {
        lock(&self.state).battery = battery;
    }

    pub fn disconnect_delay(&self) -> Duration {
        lock(&self.state).disconnect_delay
    }
}

impl GrokkerDevice for SimulatedGrokker {
    fn start_inventory(
        &self,
        config: RfidConfiguration,
        events: InventoryEventSink,
    ) -> ScanResult<()> {
        let mut state = lock(&self.state);
        if !state.connection.is_connected() {
            return Err(ScanError::NotConnected);
        }
        if let Some(running) = &state.running {
            return Err(ScanError::StartFailed(format!(
                "inventory {} already running",
                running.session_id
            )));
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<StopCompletion>();
        state.running = Some(RunningInventory {
            session_id: events.session_id(),
            stop_tx,
        });
        drop(state);

        info!(
            session_id = %events.session_id(),
            power = config.power.max,
            volume = config.volume,
            "Simulated inventory starting"
        );

        let epcs = self.config.epcs.clone();
        let tag_interval = self.config.tag_interval;
        let start_delay = self.config.start_delay;
        let shared = self.state.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(start_delay) => events.inventory_started(),
                stopped = &mut stop_rx => {
                    finish(&shared, &events, stopped.ok());
                    return;
                }
            }

            let mut ticker = tokio::time::interval(tag_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut next = epcs.iter().cycle();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(epc) = next.next() {
                            events.tag_found(epc.clone());
                        }
                    }
                    stopped = &mut stop_rx => {
                        finish(&shared, &events, stopped.ok());
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    fn active_session(&self) -> Option<Uuid> {
        lock(&self.state).running.as_ref().map(|r| r.session_id)
    }

    fn stop_inventory(&self, on_stopped: StopCompletion) {
        let running = lock(&self.state).running.take();
        match running {
            Some(running) => {
                debug!(session_id = %running.session_id, "Simulated stop requested");
                // the task is gone if the connection dropped meanwhile
                if let Err(on_stopped) = running.stop_tx.send(on_stopped) {
                    on_stopped();
                }
            }
            None => on_stopped(),
        }
    }

    fn connection_state(&self) -> ConnectionState {
        lock(&self.state).connection
    }

    fn get_battery_info(&self, on_result: BatteryCallback) {
        let battery = lock(&self.state).battery;
        on_result(battery);
    }

    fn base_configuration(&self, kind: InventoryType) -> RfidConfiguration {
        RfidConfiguration {
            inventory_type: kind,
            volume: 1.0,
            power: SIM_BASE_POWER,
        }
    }

    fn min_allowable_power_level(&self) -> f64 {
        SIM_MIN_POWER
    }

    fn set_disconnect_delay(&self, delay: Duration) {
        debug!(delay_ms = delay.as_millis() as u64, "Simulated disconnect delay");
        lock(&self.state).disconnect_delay = delay;
    }
}

/// Ends the inventory task. A closed stop channel means the connection
/// dropped, which the reader reports as a lost connection.
fn finish(state: &Mutex<SimState>, events: &InventoryEventSink, on_stopped: Option<StopCompletion>) {
    {
        let mut state = lock(state);
        if state
            .running
            .as_ref()
            .is_some_and(|r| r.session_id == events.session_id())
        {
            state.running = None;
        }
    }
    match on_stopped {
        Some(on_stopped) => {
            events.inventory_did_stop(InventoryResult::Ok.code());
            on_stopped();
        }
        None => {
            warn!(session_id = %events.session_id(), "Simulated inventory lost its connection");
            events.inventory_did_stop(InventoryResult::LostConnection.code());
        }
    }
}

// =============================================================================
// Shared Editor
// =============================================================================

/// A [`RecordingEditor`] the controller can own while the caller keeps a
/// handle to inspect it.
#[derive(Debug, Clone, Default)]
pub struct SharedEditor {
    inner: Arc<Mutex<RecordingEditor>>,
}

impl SharedEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed text plus the composing region.
    pub fn visible(&self) -> String {
        lock(&self.inner).visible()
    }

    /// Whether the editor asks for a capital at the cursor.
    pub fn set_caps_mode(&self, caps_mode: bool) {
        lock(&self.inner).caps_mode = caps_mode;
    }
}

impl InputConnection for SharedEditor {
    fn commit_text(&mut self, text: &str) {
        lock(&self.inner).commit_text(text);
    }

    fn set_composing_text(&mut self, text: &str) {
        lock(&self.inner).set_composing_text(text);
    }

    fn cursor_caps_mode(&self) -> bool {
        lock(&self.inner).cursor_caps_mode()
    }

    fn text_before_cursor(&self, n: usize) -> String {
        lock(&self.inner).text_before_cursor(n)
    }

    fn send_key_event(&mut self, key: EditorKey) {
        lock(&self.inner).send_key_event(key);
    }

    fn finish_composing_text(&mut self) {
        lock(&self.inner).finish_composing_text();
    }

    fn commit_completion(&mut self, index: usize, text: &str) {
        lock(&self.inner).commit_completion(index, text);
    }

    fn hide_keyboard(&mut self) {
        lock(&self.inner).hide_keyboard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use grok_core::composer::EditorInfo;
    use grok_core::types::{BatteryDisplay, KeyboardSettings};

    use crate::config::{ControllerConfig, MemorySettingsStore};
    use crate::controller::{ScanController, ScanPhaseKind};
    use crate::emitter::NoOpEmitter;
    use crate::testing::RecordingEmitter;

    fn sim_config() -> SimConfig {
        SimConfig {
            epcs: vec!["414243".to_string(), "444546".to_string()],
            tag_interval: Duration::from_millis(10),
            start_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_shared_editor_clones_share_text() {
        let editor = SharedEditor::new();
        let mut writer = editor.clone();
        writer.set_composing_text("ab");
        writer.commit_text("abc");
        assert_eq!(editor.visible(), "abc");
        assert_eq!(editor.text_before_cursor(2), "bc");
    }

    #[test]
    fn test_stop_without_inventory_completes() {
        let sim = SimulatedGrokker::new(SimConfig::default());
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        sim.stop_inventory(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_scan_routes_tags() {
        let sim = Arc::new(SimulatedGrokker::new(sim_config()));
        let editor = SharedEditor::new();
        let controller = ScanController::new(
            sim.clone(),
            Arc::new(NoOpEmitter),
            Arc::new(MemorySettingsStore::new(KeyboardSettings::default())),
            ControllerConfig::default(),
            Box::new(editor.clone()),
        );
        let handle = controller.start();
        handle.start_input(EditorInfo::text(), false).unwrap();

        handle.toggle_scan().unwrap();
        tokio::time::sleep(Duration::from_millis(18)).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Active);

        handle.stop_and_wait("test").await.unwrap();
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert!(sim.active_session().is_none());
        assert!(editor.visible().starts_with("ABC,DEF"));
    }

    #[tokio::test]
    async fn test_settings_show_simulated_battery() {
        let sim = Arc::new(SimulatedGrokker::new(sim_config()));
        sim.set_battery(Some(BatteryInfo {
            external_power_connected: true,
            is_charging: true,
            percent_remaining: 40,
        }));
        let emitter = Arc::new(RecordingEmitter::default());
        let handle = ScanController::new(
            sim,
            emitter.clone(),
            Arc::new(MemorySettingsStore::default()),
            ControllerConfig::default(),
            Box::new(SharedEditor::new()),
        )
        .start();

        handle.show_settings().unwrap();
        handle.snapshot().await.unwrap();
        // the battery report queues behind the first snapshot
        handle.snapshot().await.unwrap();
        assert_eq!(
            emitter.batteries(),
            vec![BatteryDisplay::Pending, BatteryDisplay::Charging]
        );
    }

    #[tokio::test]
    async fn test_start_rejected_when_disconnected() {
        let sim = Arc::new(SimulatedGrokker::new(sim_config()));
        sim.set_connection(ConnectionState::NotConnected);

        let editor = SharedEditor::new();
        let handle = ScanController::new(
            sim.clone(),
            Arc::new(NoOpEmitter),
            Arc::new(MemorySettingsStore::default()),
            ControllerConfig::default(),
            Box::new(editor),
        )
        .start();

        handle.toggle_scan().unwrap();
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(snap.connection, ConnectionState::NotConnected);
    }
}
