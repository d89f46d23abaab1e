//! # Scan Controller
//!
//! Single actor that owns the text engine, the editor handle and the scan
//! lifecycle. Host calls, reader callbacks and connection notifications are
//! all messages on one unbounded channel, handled one at a time.
//!
//! ## Scan Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────┐  toggle (connected)  ┌──────────┐  inventory_started         │
//! │   │ Idle │ ───────────────────► │ Starting │ ─────────────────┐         │
//! │   └──────┘                      └──────────┘                  ▼         │
//! │      ▲  ▲                            │ stop            ┌──────────┐     │
//! │      │  │ did_stop(result)           ▼                 │  Active  │     │
//! │      │  └──────────────────────  ┌──────────┐  stop   └──────────┘     │
//! │      │                           │ Stopping │ ◄──────────────┘          │
//! │      └──── hardware stop done ── │ waiters  │                           │
//! │            (run every waiter)    └──────────┘                           │
//! │                                                                         │
//! │  Stopping owns the waiter list: a second stop queues its completion     │
//! │  and issues no hardware stop. Tags are routed only in Starting/Active   │
//! │  and only for the current session id.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let controller = ScanController::new(device, emitter, store, ControllerConfig::default(), editor);
//! let handle = controller.start();
//!
//! handle.start_input(EditorInfo::text(), false)?;
//! handle.key(KEYCODE_TOGGLE_SCAN)?;
//! handle.stop_and_wait("user").await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use grok_core::composer::{Clock, EditorInfo, InputConnection, SystemClock, TextComposingEngine};
use grok_core::epc::EpcCodec;
use grok_core::keys::Key;
use grok_core::scaling::PowerVolumeScaler;
use grok_core::status::{self, StatusIcon};
use grok_core::types::{
    BatteryDisplay, BatteryInfo, ConnectionState, InventoryResult, KeyboardMode,
    KeyboardSettings, ShiftState,
};
use grok_core::validation::validate_settings;

use crate::config::{ControllerConfig, SettingsStore};
use crate::connection::ConnectionStateTracker;
use crate::device::{GrokkerDevice, InventoryEventSink, StopCompletion};
use crate::emitter::{
    KeyboardEventEmitter, SettingsView, INVENTORY_ERROR_TITLE, SETTINGS_ERROR_TITLE,
};
use crate::error::{ScanError, ScanResult};

// =============================================================================
// Scan Session & Phase
// =============================================================================

/// One inventory, from a successful start request until the reader
/// confirms the stop.
#[derive(Debug, Clone)]
struct ScanSession {
    id: Uuid,
    /// True until the first tag of the session has been routed.
    awaiting_first_tag: bool,
    /// Settings snapshot taken at start.
    settings: KeyboardSettings,
}

impl ScanSession {
    fn new(settings: KeyboardSettings) -> Self {
        ScanSession {
            id: Uuid::new_v4(),
            awaiting_first_tag: true,
            settings,
        }
    }
}

enum ScanPhase {
    Idle,
    Starting(ScanSession),
    Active(ScanSession),
    Stopping {
        session: ScanSession,
        waiters: Vec<StopCompletion>,
    },
}

impl ScanPhase {
    fn kind(&self) -> ScanPhaseKind {
        match self {
            ScanPhase::Idle => ScanPhaseKind::Idle,
            ScanPhase::Starting(_) => ScanPhaseKind::Starting,
            ScanPhase::Active(_) => ScanPhaseKind::Active,
            ScanPhase::Stopping { .. } => ScanPhaseKind::Stopping,
        }
    }

    fn session_id(&self) -> Option<Uuid> {
        match self {
            ScanPhase::Idle => None,
            ScanPhase::Starting(s) | ScanPhase::Active(s) => Some(s.id),
            ScanPhase::Stopping { session, .. } => Some(session.id),
        }
    }

    fn is_running(&self) -> bool {
        matches!(self, ScanPhase::Starting(_) | ScanPhase::Active(_))
    }

    fn is_stopping(&self) -> bool {
        matches!(self, ScanPhase::Stopping { .. })
    }
}

/// Phase of the scan lifecycle, as reported by [`ControllerSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhaseKind {
    Idle,
    Starting,
    Active,
    Stopping,
}

impl std::fmt::Display for ScanPhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhaseKind::Idle => write!(f, "idle"),
            ScanPhaseKind::Starting => write!(f, "starting"),
            ScanPhaseKind::Active => write!(f, "active"),
            ScanPhaseKind::Stopping => write!(f, "stopping"),
        }
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub phase: ScanPhaseKind,
    pub session_id: Option<Uuid>,
    pub pending_stop_waiters: usize,
    pub connection: ConnectionState,
    pub icon: StatusIcon,
    pub dialog_visible: bool,
    pub settings: KeyboardSettings,
    pub composing: String,
    pub mode: KeyboardMode,
    pub shift: ShiftState,
}

// =============================================================================
// Commands
// =============================================================================

/// Messages processed by the controller task.
pub(crate) enum Command {
    // Host: keys and text
    Key(Key),
    HardwareDelete {
        reply: oneshot::Sender<bool>,
    },
    InsertText(String),

    // Host: input session
    StartInput {
        editor: EditorInfo,
        restarting: bool,
    },
    StartInputView,
    FinishInput,
    FinishInputView,
    UpdateSelection {
        new_start: usize,
        new_end: usize,
        candidates_end: usize,
    },
    DisplayCompletions(Vec<String>),
    PickSuggestion {
        index: usize,
        reply: oneshot::Sender<ScanResult<()>>,
    },

    // Host: scanning and settings
    ToggleScan,
    Stop {
        requested_by: String,
        on_stopped: Option<StopCompletion>,
    },
    ShowSettings,
    UpdateSettings {
        settings: KeyboardSettings,
        reply: oneshot::Sender<ScanResult<()>>,
    },
    ConfirmSettings,
    DismissSettings,

    // Reader
    ConnectionChanged(ConnectionState),
    InventoryStarted {
        session: Uuid,
    },
    TagFound {
        session: Uuid,
        epc: String,
    },
    InventoryDidStop {
        session: Uuid,
        code: i32,
    },
    HardwareStopped {
        session: Uuid,
    },
    BatteryReport(Option<BatteryInfo>),
    RefreshBattery,

    // Control
    Snapshot(oneshot::Sender<ControllerSnapshot>),
    Shutdown,
}

// =============================================================================
// Controller Handle
// =============================================================================

/// Cloneable handle to a running [`ScanController`].
///
/// Fire-and-forget operations return as soon as the message is queued;
/// they only fail once the controller has shut down.
#[derive(Clone)]
pub struct ScanControllerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl ScanControllerHandle {
    fn send(&self, cmd: Command) -> ScanResult<()> {
        self.cmd_tx.send(cmd).map_err(|_| ScanError::ShuttingDown)
    }

    /// A key from the on-screen keyboard, by primary code.
    pub fn key(&self, primary_code: i32) -> ScanResult<()> {
        let key = Key::from_primary_code(primary_code)?;
        self.send(Command::Key(key))
    }

    /// A physical Delete key. Resolves to true when it was consumed.
    pub async fn hardware_delete(&self) -> ScanResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::HardwareDelete { reply })?;
        Ok(rx.await?)
    }

    /// Text from outside the key grid.
    pub fn insert_text(&self, text: impl Into<String>) -> ScanResult<()> {
        self.send(Command::InsertText(text.into()))
    }

    pub fn start_input(&self, editor: EditorInfo, restarting: bool) -> ScanResult<()> {
        self.send(Command::StartInput { editor, restarting })
    }

    pub fn start_input_view(&self) -> ScanResult<()> {
        self.send(Command::StartInputView)
    }

    pub fn finish_input(&self) -> ScanResult<()> {
        self.send(Command::FinishInput)
    }

    pub fn finish_input_view(&self) -> ScanResult<()> {
        self.send(Command::FinishInputView)
    }

    pub fn update_selection(
        &self,
        new_start: usize,
        new_end: usize,
        candidates_end: usize,
    ) -> ScanResult<()> {
        self.send(Command::UpdateSelection {
            new_start,
            new_end,
            candidates_end,
        })
    }

    pub fn display_completions(&self, completions: Vec<String>) -> ScanResult<()> {
        self.send(Command::DisplayCompletions(completions))
    }

    pub async fn pick_suggestion(&self, index: usize) -> ScanResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PickSuggestion { index, reply })?;
        rx.await?
    }

    /// Starts a scan when idle, stops it otherwise.
    pub fn toggle_scan(&self) -> ScanResult<()> {
        self.send(Command::ToggleScan)
    }

    /// Requests a stop. `on_stopped` runs exactly once, after the hardware
    /// stop in flight (if any) has completed.
    pub fn stop(
        &self,
        requested_by: impl Into<String>,
        on_stopped: Option<StopCompletion>,
    ) -> ScanResult<()> {
        self.send(Command::Stop {
            requested_by: requested_by.into(),
            on_stopped,
        })
    }

    /// Requests a stop and waits for it to complete.
    pub async fn stop_and_wait(&self, requested_by: impl Into<String>) -> ScanResult<()> {
        let (tx, rx) = oneshot::channel();
        self.stop(
            requested_by,
            Some(Box::new(move || {
                let _ = tx.send(());
            })),
        )?;
        Ok(rx.await?)
    }

    pub fn show_settings(&self) -> ScanResult<()> {
        self.send(Command::ShowSettings)
    }

    /// Stages new settings from the dialog. They apply from the next scan.
    pub async fn update_settings(&self, settings: KeyboardSettings) -> ScanResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateSettings { settings, reply })?;
        rx.await?
    }

    pub fn confirm_settings(&self) -> ScanResult<()> {
        self.send(Command::ConfirmSettings)
    }

    pub fn dismiss_settings(&self) -> ScanResult<()> {
        self.send(Command::DismissSettings)
    }

    /// Reader connection notification.
    pub fn connection_state_changed(&self, state: ConnectionState) -> ScanResult<()> {
        self.send(Command::ConnectionChanged(state))
    }

    /// Current state. Every message sent before this one has been handled
    /// by the time it resolves.
    pub async fn snapshot(&self) -> ScanResult<ControllerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        Ok(rx.await?)
    }

    /// Stops any scan, releases pending stop waiters and ends the task.
    pub fn shutdown(&self) -> ScanResult<()> {
        self.send(Command::Shutdown)
    }
}

// =============================================================================
// Scan Controller
// =============================================================================

/// The controller actor. Build it with [`ScanController::new`], then call
/// [`ScanController::start`] from inside a tokio runtime.
pub struct ScanController {
    engine: TextComposingEngine,
    editor: Box<dyn InputConnection + Send>,
    device: Arc<dyn GrokkerDevice>,
    emitter: Arc<dyn KeyboardEventEmitter>,
    store: Arc<dyn SettingsStore>,

    /// Current settings, including unconfirmed dialog edits.
    settings: KeyboardSettings,
    tracker: ConnectionStateTracker,
    phase: ScanPhase,
    dialog_visible: bool,

    last_icon: Option<StatusIcon>,
    last_keyboard: (KeyboardMode, ShiftState),
    /// Session that most recently returned to idle. Its result may still be
    /// in flight behind the stop completion.
    last_ended: Option<Uuid>,

    /// Sender for continuations handed to the reader. Weak, so that the
    /// task ends once every handle and sink is gone.
    self_tx: Option<mpsc::WeakUnboundedSender<Command>>,
}

impl ScanController {
    /// Creates a controller using the system clock.
    pub fn new(
        device: Arc<dyn GrokkerDevice>,
        emitter: Arc<dyn KeyboardEventEmitter>,
        store: Arc<dyn SettingsStore>,
        config: ControllerConfig,
        editor: Box<dyn InputConnection + Send>,
    ) -> Self {
        Self::with_clock(device, emitter, store, config, editor, Arc::new(SystemClock))
    }

    /// Creates a controller with an injected clock for the shift double tap.
    pub fn with_clock(
        device: Arc<dyn GrokkerDevice>,
        emitter: Arc<dyn KeyboardEventEmitter>,
        store: Arc<dyn SettingsStore>,
        config: ControllerConfig,
        editor: Box<dyn InputConnection + Send>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load keyboard settings. Using defaults.");
            KeyboardSettings::default()
        });
        let engine = TextComposingEngine::new(clock).with_word_separators(config.word_separators);
        let last_keyboard = (engine.mode(), engine.shift());
        let tracker = ConnectionStateTracker::new(device.connection_state());

        ScanController {
            engine,
            editor,
            device,
            emitter,
            store,
            settings,
            tracker,
            phase: ScanPhase::Idle,
            dialog_visible: false,
            last_icon: None,
            last_keyboard,
            last_ended: None,
            self_tx: None,
        }
    }

    /// Spawns the controller task and returns its handle.
    pub fn start(mut self) -> ScanControllerHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        self.self_tx = Some(cmd_tx.downgrade());

        tokio::spawn(async move {
            self.run(cmd_rx).await;
        });

        ScanControllerHandle { cmd_tx }
    }

    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        info!(
            connection = %self.tracker.state(),
            stay_connected = self.settings.stay_connected,
            "Scan controller started"
        );
        self.device.set_disconnect_delay(self.settings.disconnect_delay());
        self.refresh_icon();

        while let Some(cmd) = cmd_rx.recv().await {
            if let Command::Shutdown = cmd {
                self.shutdown();
                break;
            }
            self.handle(cmd);
        }

        info!("Scan controller stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Key(key) => self.on_key(key),
            Command::HardwareDelete { reply } => {
                let consumed = self.engine.hardware_delete(self.editor.as_mut());
                self.sync_engine_outputs();
                let _ = reply.send(consumed);
            }
            Command::InsertText(text) => {
                self.engine.insert_external_text(&text, self.editor.as_mut());
                self.sync_engine_outputs();
            }
            Command::StartInput { editor, restarting } => {
                debug!(?editor, restarting, "Input started");
                self.engine.start_input(editor, self.editor.as_mut());
                self.sync_engine_outputs();
            }
            Command::StartInputView => {
                // the view is new and has no icon yet
                self.last_icon = None;
                self.refresh_icon();
            }
            Command::FinishInput => {
                self.engine.finish_input();
                self.sync_engine_outputs();
                self.stop("finish_input", None);
            }
            Command::FinishInputView => {
                self.dialog_visible = false;
                self.persist_settings();
                self.stop("finish_input_view", None);
                self.refresh_icon();
            }
            Command::UpdateSelection {
                new_start,
                new_end,
                candidates_end,
            } => {
                self.engine
                    .update_selection(new_start, new_end, candidates_end, self.editor.as_mut());
                self.sync_engine_outputs();
            }
            Command::DisplayCompletions(completions) => {
                self.engine.display_completions(completions);
                self.sync_engine_outputs();
            }
            Command::PickSuggestion { index, reply } => {
                let result = self
                    .engine
                    .pick_suggestion(index, self.editor.as_mut())
                    .map_err(ScanError::from);
                if let Err(e) = &result {
                    warn!(index, error = %e, "Suggestion pick rejected");
                }
                self.sync_engine_outputs();
                let _ = reply.send(result);
            }
            Command::ToggleScan => self.toggle_scan(),
            Command::Stop {
                requested_by,
                on_stopped,
            } => self.stop(&requested_by, on_stopped),
            Command::ShowSettings => self.show_settings(),
            Command::UpdateSettings { settings, reply } => {
                let _ = reply.send(self.update_settings(settings));
            }
            Command::ConfirmSettings => self.confirm_settings(),
            Command::DismissSettings => {
                self.dialog_visible = false;
                self.refresh_icon();
            }
            Command::ConnectionChanged(state) => self.connection_changed(state),
            Command::InventoryStarted { session } => self.inventory_started(session),
            Command::TagFound { session, epc } => self.tag_found(session, &epc),
            Command::InventoryDidStop { session, code } => self.inventory_did_stop(session, code),
            Command::HardwareStopped { session } => self.hardware_stopped(session),
            Command::BatteryReport(info) => {
                if self.dialog_visible {
                    let display = BatteryDisplay::resolve(info, self.tracker.is_connected());
                    self.emitter.emit_battery(display);
                }
            }
            Command::RefreshBattery => self.refresh_battery(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    // =========================================================================
    // Keys
    // =========================================================================

    fn on_key(&mut self, key: Key) {
        match key {
            Key::ToggleScan => self.toggle_scan(),
            Key::Settings => self.show_settings(),
            other => {
                self.engine.on_key(other, self.editor.as_mut());
                self.sync_engine_outputs();
                if other == Key::ModeChange {
                    self.refresh_icon();
                }
            }
        }
    }

    // =========================================================================
    // Scan Lifecycle
    // =========================================================================

    fn toggle_scan(&mut self) {
        match self.phase {
            ScanPhase::Stopping { .. } => {
                debug!("Scan key ignored while stopping");
            }
            ScanPhase::Idle => self.start_scan(),
            ScanPhase::Starting(_) | ScanPhase::Active(_) => self.stop("toggle_scan", None),
        }
    }

    fn start_scan(&mut self) {
        if !self.tracker.is_connected() {
            debug!(connection = %self.tracker.state(), "Scan requested while not connected");
            self.refresh_icon();
            return;
        }
        if let Some(running) = self.device.active_session() {
            warn!(session_id = %running, "Reader already running an inventory");
            return;
        }
        let Some(tx) = self.sender() else {
            return;
        };

        let session = ScanSession::new(self.settings);
        let base = self.device.base_configuration(session.settings.inventory_type());
        let config = PowerVolumeScaler::configure(
            base,
            &session.settings,
            self.device.min_allowable_power_level(),
        );
        let sink = InventoryEventSink::new(session.id, tx);

        match self.device.start_inventory(config, sink) {
            Ok(()) => {
                info!(
                    session_id = %session.id,
                    inventory_type = ?config.inventory_type,
                    volume = config.volume,
                    "Inventory starting"
                );
                self.set_phase(ScanPhase::Starting(session));
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Failed to start inventory");
                self.emitter.emit_error(INVENTORY_ERROR_TITLE, &e.to_string());
            }
        }
        self.refresh_icon();
    }

    fn stop(&mut self, requested_by: &str, on_stopped: Option<StopCompletion>) {
        match std::mem::replace(&mut self.phase, ScanPhase::Idle) {
            ScanPhase::Stopping {
                session,
                mut waiters,
            } => {
                debug!(
                    session_id = %session.id,
                    requested_by = %requested_by,
                    "Stop already in progress"
                );
                waiters.extend(on_stopped);
                self.phase = ScanPhase::Stopping { session, waiters };
            }
            ScanPhase::Idle => {
                debug!(requested_by = %requested_by, "Stop requested with no scan");
                if let Some(on_stopped) = on_stopped {
                    on_stopped();
                }
            }
            ScanPhase::Starting(session) | ScanPhase::Active(session) => {
                info!(session_id = %session.id, requested_by = %requested_by, "Stopping inventory");
                let id = session.id;
                self.set_phase(ScanPhase::Stopping {
                    session,
                    waiters: on_stopped.into_iter().collect(),
                });
                self.refresh_icon();

                let tx = self.sender();
                self.device.stop_inventory(Box::new(move || {
                    if let Some(tx) = tx {
                        let _ = tx.send(Command::HardwareStopped { session: id });
                    }
                }));
            }
        }
    }

    fn hardware_stopped(&mut self, session_id: Uuid) {
        if self.phase.session_id() != Some(session_id) || !self.phase.is_stopping() {
            debug!(session_id = %session_id, "Stale stop completion");
            return;
        }
        if let ScanPhase::Stopping { waiters, .. } =
            std::mem::replace(&mut self.phase, ScanPhase::Idle)
        {
            info!(session_id = %session_id, waiters = waiters.len(), "Inventory stopped");
            self.end_session(session_id);
            self.refresh_icon();
            for waiter in waiters {
                waiter();
            }
        }
    }

    fn inventory_started(&mut self, session_id: Uuid) {
        match std::mem::replace(&mut self.phase, ScanPhase::Idle) {
            ScanPhase::Starting(session) if session.id == session_id => {
                debug!(session_id = %session_id, "Inventory running");
                self.set_phase(ScanPhase::Active(session));
                self.refresh_icon();
            }
            other => {
                debug!(session_id = %session_id, phase = %other.kind(), "Ignoring start confirmation");
                self.phase = other;
            }
        }
    }

    fn tag_found(&mut self, session_id: Uuid, epc: &str) {
        let session = match &mut self.phase {
            ScanPhase::Starting(s) | ScanPhase::Active(s) if s.id == session_id => s,
            other => {
                debug!(session_id = %session_id, phase = %other.kind(), "Dropping tag");
                return;
            }
        };

        let settings = session.settings;
        let first = std::mem::replace(&mut session.awaiting_first_tag, false);
        let decoded = EpcCodec::decode(epc, settings.ascii_decode);

        if settings.find_one_only {
            if !first {
                return;
            }
            debug!(session_id = %session_id, epc, "Routing single tag");
            self.insert_tag(&decoded);
            self.stop("tag_found", None);
        } else {
            let needs_comma = settings.always_add_comma_at_start
                || !self.editor.text_before_cursor(1).is_empty();
            let text = if needs_comma {
                format!(",{}", decoded)
            } else {
                decoded
            };
            debug!(session_id = %session_id, epc, "Routing tag");
            self.insert_tag(&text);
        }
    }

    fn insert_tag(&mut self, text: &str) {
        self.engine.insert_external_text(text, self.editor.as_mut());
        self.sync_engine_outputs();
    }

    fn inventory_did_stop(&mut self, session_id: Uuid, code: i32) {
        let current = self.phase.session_id() == Some(session_id);
        if self.last_ended == Some(session_id) {
            // one result per session
            self.last_ended = None;
        } else if !current {
            debug!(session_id = %session_id, code, "Result for stale session");
            return;
        }
        if current && self.phase.is_running() {
            // the reader ended the inventory on its own
            self.set_phase(ScanPhase::Idle);
        }

        let result = InventoryResult::from_code(code);
        match result {
            InventoryResult::Ok => {
                debug!(session_id = %session_id, "Inventory completed");
                self.refresh_icon();
            }
            InventoryResult::LostConnection => {
                debug!(session_id = %session_id, "Inventory ended by lost connection");
            }
            other => {
                self.refresh_icon();
                if let Some(message) = other.user_message() {
                    warn!(session_id = %session_id, code, "Inventory failed");
                    self.emitter.emit_error(INVENTORY_ERROR_TITLE, &message);
                }
            }
        }
    }

    fn connection_changed(&mut self, state: ConnectionState) {
        let update = self.tracker.update(state);
        if !update.is_change() {
            return;
        }
        info!(from = %update.previous, to = %update.current, "Reader connection changed");

        if update.resolves_pending_scan() {
            match std::mem::replace(&mut self.phase, ScanPhase::Idle) {
                ScanPhase::Stopping { session, waiters } => {
                    info!(session_id = %session.id, "Connection lost while stopping");
                    self.end_session(session.id);
                    self.refresh_icon();
                    for waiter in waiters {
                        waiter();
                    }
                    return;
                }
                ScanPhase::Starting(session) | ScanPhase::Active(session) => {
                    info!(session_id = %session.id, "Connection lost during inventory");
                    self.end_session(session.id);
                }
                ScanPhase::Idle => {}
            }
        }
        self.refresh_icon();
    }

    // =========================================================================
    // Settings Dialog
    // =========================================================================

    fn show_settings(&mut self) {
        if self.phase.is_stopping() {
            debug!("Settings ignored while stopping");
            return;
        }
        self.dialog_visible = true;
        self.emitter
            .emit_settings_dialog(&SettingsView::new(self.settings));
        self.refresh_icon();

        if self.phase.is_running() {
            let tx = self.sender();
            self.stop(
                "show_settings",
                Some(Box::new(move || {
                    if let Some(tx) = tx {
                        let _ = tx.send(Command::RefreshBattery);
                    }
                })),
            );
        }
        self.refresh_battery();
    }

    fn refresh_battery(&mut self) {
        let connected = self.tracker.is_connected();
        self.emitter
            .emit_battery(BatteryDisplay::resolve(None, connected));
        if !connected {
            return;
        }
        let tx = self.sender();
        self.device.get_battery_info(Box::new(move |info| {
            if let Some(tx) = tx {
                let _ = tx.send(Command::BatteryReport(info));
            }
        }));
    }

    fn update_settings(&mut self, settings: KeyboardSettings) -> ScanResult<()> {
        validate_settings(&settings)?;
        if settings.stay_connected != self.settings.stay_connected {
            debug!(stay_connected = settings.stay_connected, "Updating disconnect delay");
            self.device.set_disconnect_delay(settings.disconnect_delay());
        }
        self.settings = settings;
        if self.dialog_visible {
            self.emitter
                .emit_settings_dialog(&SettingsView::new(self.settings));
        }
        Ok(())
    }

    fn confirm_settings(&mut self) {
        self.dialog_visible = false;
        self.refresh_icon();
        if self.persist_settings() {
            self.emitter.emit_settings_changed(&self.settings);
        }
    }

    fn persist_settings(&mut self) -> bool {
        match self.store.save(&self.settings) {
            Ok(()) => {
                debug!("Keyboard settings saved");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to save keyboard settings");
                self.emitter.emit_error(SETTINGS_ERROR_TITLE, &e.to_string());
                false
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn sender(&self) -> Option<mpsc::UnboundedSender<Command>> {
        self.self_tx.as_ref().and_then(|weak| weak.upgrade())
    }

    fn set_phase(&mut self, phase: ScanPhase) {
        self.tracker.set_scan_active(phase.is_running());
        self.phase = phase;
    }

    /// Returns to idle, remembering the session so a trailing result is
    /// still reported.
    fn end_session(&mut self, session_id: Uuid) {
        self.last_ended = Some(session_id);
        self.set_phase(ScanPhase::Idle);
    }

    fn current_icon(&self) -> StatusIcon {
        status::resolve(
            self.phase.is_stopping(),
            self.dialog_visible,
            self.tracker.state(),
            self.tracker.scan_active(),
        )
    }

    /// Re-derives the icon and emits it if it changed.
    fn refresh_icon(&mut self) {
        let icon = self.current_icon();
        if self.last_icon != Some(icon) {
            debug!(icon = %icon, "Status icon changed");
            self.last_icon = Some(icon);
            self.emitter.emit_status_icon(icon);
        }
    }

    fn sync_engine_outputs(&mut self) {
        if let Some(candidates) = self.engine.take_candidates_update() {
            self.emitter.emit_candidates(&candidates);
        }
        let keyboard = (self.engine.mode(), self.engine.shift());
        if keyboard != self.last_keyboard {
            self.last_keyboard = keyboard;
            self.emitter.emit_keyboard_state(keyboard.0, keyboard.1);
        }
    }

    fn snapshot(&self) -> ControllerSnapshot {
        let pending_stop_waiters = match &self.phase {
            ScanPhase::Stopping { waiters, .. } => waiters.len(),
            _ => 0,
        };
        ControllerSnapshot {
            phase: self.phase.kind(),
            session_id: self.phase.session_id(),
            pending_stop_waiters,
            connection: self.tracker.state(),
            icon: self.current_icon(),
            dialog_visible: self.dialog_visible,
            settings: self.settings,
            composing: self.engine.composing().to_string(),
            mode: self.engine.mode(),
            shift: self.engine.shift(),
        }
    }

    fn shutdown(&mut self) {
        info!(phase = %self.phase.kind(), "Scan controller shutting down");
        match std::mem::replace(&mut self.phase, ScanPhase::Idle) {
            ScanPhase::Starting(_) | ScanPhase::Active(_) => {
                self.device.stop_inventory(Box::new(|| {}));
            }
            ScanPhase::Stopping { waiters, .. } => {
                for waiter in waiters {
                    waiter();
                }
            }
            ScanPhase::Idle => {}
        }
        self.tracker.set_scan_active(false);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use grok_core::composer::ManualClock;
    use grok_core::keys::{KEYCODE_DELETE, KEYCODE_SETTINGS, KEYCODE_SHIFT, KEYCODE_TOGGLE_SCAN};
    use grok_core::types::InventoryType;

    use crate::config::MemorySettingsStore;
    use crate::sim::SharedEditor;
    use crate::testing::{RecordingEmitter, ScriptedDevice};

    struct Fixture {
        handle: ScanControllerHandle,
        device: Arc<ScriptedDevice>,
        emitter: Arc<RecordingEmitter>,
        store: Arc<MemorySettingsStore>,
        editor: SharedEditor,
        clock: Arc<ManualClock>,
    }

    fn fixture_with(settings: KeyboardSettings, connection: ConnectionState) -> Fixture {
        let device = Arc::new(ScriptedDevice::new(connection));
        let emitter = Arc::new(RecordingEmitter::default());
        let store = Arc::new(MemorySettingsStore::new(settings));
        let editor = SharedEditor::default();
        let clock = Arc::new(ManualClock::new(50_000));

        let controller = ScanController::with_clock(
            device.clone(),
            emitter.clone(),
            store.clone(),
            ControllerConfig::default(),
            Box::new(editor.clone()),
            clock.clone(),
        );
        let handle = controller.start();
        handle.start_input(EditorInfo::text(), false).unwrap();

        Fixture {
            handle,
            device,
            emitter,
            store,
            editor,
            clock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(KeyboardSettings::default(), ConnectionState::Connected)
    }

    fn counter() -> (Arc<AtomicUsize>, StopCompletion) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (
            count,
            Box::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    async fn finish_scan(f: &Fixture) {
        f.handle.stop("test", None).unwrap();
        f.handle.snapshot().await.unwrap();
        f.device.complete_stops();
        f.handle.snapshot().await.unwrap();
    }

    async fn start_active_scan(f: &Fixture) -> InventoryEventSink {
        f.handle.toggle_scan().unwrap();
        f.handle.snapshot().await.unwrap();
        let sink = f.device.last_sink().expect("inventory started");
        sink.inventory_started();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Active);
        sink
    }

    #[tokio::test]
    async fn test_toggle_starts_and_stops() {
        let f = fixture();
        f.handle.toggle_scan().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Starting);
        assert_eq!(snap.icon, StatusIcon::Scanning);
        assert_eq!(f.device.start_count(), 1);

        f.handle.toggle_scan().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Stopping);
        assert_eq!(snap.icon, StatusIcon::StoppingInventory);

        f.device.complete_stops();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(snap.icon, StatusIcon::Connected);
        assert_eq!(
            f.emitter.icons(),
            vec![
                StatusIcon::Connected,
                StatusIcon::Scanning,
                StatusIcon::StoppingInventory,
                StatusIcon::Connected,
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_while_disconnected_is_noop() {
        let f = fixture_with(KeyboardSettings::default(), ConnectionState::NotConnected);
        f.handle.toggle_scan().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(f.device.start_count(), 0);
        assert_eq!(f.emitter.icons(), vec![StatusIcon::NotConnected]);
    }

    #[tokio::test]
    async fn test_start_failure_reported() {
        let f = fixture();
        f.device.fail_next_start("reader busy");
        f.handle.toggle_scan().unwrap();
        let snap = f.handle.snapshot().await.unwrap();

        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(
            f.emitter.errors(),
            vec![(
                "Inventory Error".to_string(),
                "Failed to start inventory: reader busy".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_candidates_follow_composing() {
        let f = fixture();
        f.handle.key('h' as i32).unwrap();
        f.handle.key('i' as i32).unwrap();
        f.handle.snapshot().await.unwrap();
        let last = f.emitter.events().into_iter().rev().find_map(|e| match e {
            crate::emitter::KeyboardEvent::Candidates { candidates } => Some(candidates),
            _ => None,
        });
        assert_eq!(last, Some(vec!["hi".to_string()]));
    }

    #[tokio::test]
    async fn test_scan_key_code_toggles() {
        let f = fixture();
        f.handle.key(KEYCODE_TOGGLE_SCAN).unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Starting);
    }

    #[tokio::test]
    async fn test_toggle_ignored_while_stopping() {
        let f = fixture();
        start_active_scan(&f).await;
        f.handle.toggle_scan().unwrap();
        f.handle.toggle_scan().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Stopping);
        assert_eq!(f.device.stop_count(), 1);
        assert_eq!(f.device.start_count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_stops_coalesce() {
        let f = fixture();
        start_active_scan(&f).await;

        let (first, first_cb) = counter();
        let (second, second_cb) = counter();
        f.handle.stop("first", Some(first_cb)).unwrap();
        f.handle.stop("second", Some(second_cb)).unwrap();

        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.pending_stop_waiters, 2);
        assert_eq!(f.device.stop_count(), 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        f.device.complete_stops();
        f.handle.snapshot().await.unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_without_session_completes_immediately() {
        let f = fixture();
        let (count, cb) = counter();
        f.handle.stop("idle", Some(cb)).unwrap();
        f.handle.snapshot().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(f.device.stop_count(), 0);

        f.handle.stop_and_wait("idle again").await.unwrap();
    }

    #[tokio::test]
    async fn test_tags_inserted_with_commas() {
        let f = fixture();
        let sink = start_active_scan(&f).await;

        sink.tag_found("414243");
        sink.tag_found("31323334");
        f.handle.snapshot().await.unwrap();

        assert_eq!(f.editor.visible(), "ABC,1234");
    }

    #[tokio::test]
    async fn test_always_add_comma() {
        let settings = KeyboardSettings {
            always_add_comma_at_start: true,
            ..KeyboardSettings::default()
        };
        let f = fixture_with(settings, ConnectionState::Connected);
        let sink = start_active_scan(&f).await;

        sink.tag_found("414243");
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), ",ABC");
    }

    #[tokio::test]
    async fn test_hex_mode_and_fallback() {
        let settings = KeyboardSettings {
            ascii_decode: false,
            ..KeyboardSettings::default()
        };
        let f = fixture_with(settings, ConnectionState::Connected);
        let sink = start_active_scan(&f).await;

        sink.tag_found("e2801160");
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), "E2801160");
    }

    #[tokio::test]
    async fn test_find_one_only_routes_first_tag() {
        let settings = KeyboardSettings {
            find_one_only: true,
            ..KeyboardSettings::default()
        };
        let f = fixture_with(settings, ConnectionState::Connected);
        let sink = start_active_scan(&f).await;
        assert_eq!(
            f.device.last_config().map(|c| c.inventory_type),
            Some(InventoryType::SingleFind)
        );

        sink.tag_found("41");
        sink.tag_found("42");
        sink.tag_found("43");
        let snap = f.handle.snapshot().await.unwrap();

        assert_eq!(f.editor.visible(), "A");
        assert_eq!(snap.phase, ScanPhaseKind::Stopping);
        assert_eq!(f.device.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_tags_dropped_when_idle_or_stale() {
        let f = fixture();
        let sink = start_active_scan(&f).await;
        finish_scan(&f).await;

        sink.tag_found("414243");
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), "");

        // a new session ignores the old sink
        let _new_sink = start_active_scan(&f).await;
        sink.tag_found("414243");
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), "");
    }

    #[tokio::test]
    async fn test_settings_snapshot_taken_at_start() {
        let f = fixture();
        let sink = start_active_scan(&f).await;

        let mut changed = KeyboardSettings::default();
        changed.ascii_decode = false;
        f.handle.update_settings(changed).await.unwrap();

        sink.tag_found("414243");
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), "ABC");
    }

    #[tokio::test]
    async fn test_power_scaled_from_settings() {
        let settings = KeyboardSettings {
            power_percent: 0,
            volume_percent: 50,
            ..KeyboardSettings::default()
        };
        let f = fixture_with(settings, ConnectionState::Connected);
        f.handle.toggle_scan().unwrap();
        f.handle.snapshot().await.unwrap();

        let config = f.device.last_config().expect("started");
        assert_eq!(config.volume, 0.5);
        assert_eq!(config.power.max, f.device.min_power());
        assert_eq!(config.power.init, f.device.min_power());
    }

    #[tokio::test]
    async fn test_inventory_error_surfaces_message() {
        let f = fixture();
        let sink = start_active_scan(&f).await;

        sink.inventory_did_stop(InventoryResult::CODE_BATTERY_TOO_LOW);
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(
            f.emitter.errors(),
            vec![(
                "Inventory Error".to_string(),
                "Battery level too low\nPlease charge the Grokker".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_result_embeds_code() {
        let f = fixture();
        let sink = start_active_scan(&f).await;
        sink.inventory_did_stop(99);
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.emitter.errors()[0].1, "Grokker error: 99");
    }

    #[tokio::test]
    async fn test_lost_connection_result_swallowed() {
        let f = fixture();
        let sink = start_active_scan(&f).await;
        sink.inventory_did_stop(InventoryResult::CODE_LOST_CONNECTION);
        f.handle.snapshot().await.unwrap();
        assert!(f.emitter.errors().is_empty());
    }

    #[tokio::test]
    async fn test_connection_loss_releases_waiters() {
        let f = fixture();
        start_active_scan(&f).await;

        let (count, cb) = counter();
        f.handle.stop("user", Some(cb)).unwrap();
        f.handle
            .connection_state_changed(ConnectionState::NotConnected)
            .unwrap();
        let snap = f.handle.snapshot().await.unwrap();

        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(snap.icon, StatusIcon::NotConnected);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // the late hardware completion is stale and harmless
        f.device.complete_stops();
        f.handle.snapshot().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_after_stop_completion_still_reported() {
        let f = fixture();
        let sink = start_active_scan(&f).await;
        f.handle.toggle_scan().unwrap();
        f.handle.snapshot().await.unwrap();
        f.device.complete_stops();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);

        sink.inventory_did_stop(InventoryResult::CODE_BATTERY_TOO_LOW);
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(
            f.emitter.errors(),
            vec![(
                "Inventory Error".to_string(),
                "Battery level too low\nPlease charge the Grokker".to_string()
            )]
        );

        // a repeated result for the same session is stale
        sink.inventory_did_stop(InventoryResult::CODE_REGION_NOT_SET);
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.emitter.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_connection_loss_while_active() {
        let f = fixture();
        let sink = start_active_scan(&f).await;

        f.handle
            .connection_state_changed(ConnectionState::NotConnected)
            .unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Idle);
        assert_eq!(snap.icon, StatusIcon::NotConnected);
        assert_eq!(snap.pending_stop_waiters, 0);
        assert_eq!(f.emitter.icons().last(), Some(&StatusIcon::NotConnected));

        sink.tag_found("414243");
        sink.inventory_did_stop(InventoryResult::CODE_LOST_CONNECTION);
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), "");
        assert!(f.emitter.errors().is_empty());
    }

    #[tokio::test]
    async fn test_connecting_icon() {
        let f = fixture_with(KeyboardSettings::default(), ConnectionState::NotConnected);
        f.handle
            .connection_state_changed(ConnectionState::Connecting)
            .unwrap();
        f.handle
            .connection_state_changed(ConnectionState::Connected)
            .unwrap();
        f.handle.snapshot().await.unwrap();
        assert_eq!(
            f.emitter.icons(),
            vec![
                StatusIcon::NotConnected,
                StatusIcon::Connecting,
                StatusIcon::Connected
            ]
        );
    }

    #[tokio::test]
    async fn test_show_settings_stops_scan_and_refreshes_battery() {
        let f = fixture();
        start_active_scan(&f).await;

        f.handle.key(KEYCODE_SETTINGS).unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert!(snap.dialog_visible);
        assert_eq!(snap.icon, StatusIcon::StoppingInventory);
        assert_eq!(f.device.battery_requests(), 1);

        f.device.complete_stops();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.icon, StatusIcon::SettingsDisplayed);
        // the stop completion asks for the battery again
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.device.battery_requests(), 2);
        assert!(f
            .emitter
            .batteries()
            .contains(&BatteryDisplay::Remaining { percent: 80 }));
    }

    #[tokio::test]
    async fn test_settings_ignored_while_stopping() {
        let f = fixture();
        start_active_scan(&f).await;
        f.handle.toggle_scan().unwrap();
        f.handle.show_settings().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert!(!snap.dialog_visible);
    }

    #[tokio::test]
    async fn test_battery_hidden_when_disconnected() {
        let f = fixture_with(KeyboardSettings::default(), ConnectionState::NotConnected);
        f.handle.show_settings().unwrap();
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.emitter.batteries(), vec![BatteryDisplay::Hidden]);
        assert_eq!(f.device.battery_requests(), 0);
    }

    #[tokio::test]
    async fn test_confirm_settings_persists() {
        let f = fixture();
        f.handle.show_settings().unwrap();

        let mut settings = KeyboardSettings::default();
        settings.stay_connected = false;
        settings.volume_percent = 30;
        f.handle.update_settings(settings).await.unwrap();
        assert_eq!(
            f.device.disconnect_delays().last().copied(),
            Some(std::time::Duration::from_millis(100))
        );

        f.handle.confirm_settings().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert!(!snap.dialog_visible);
        assert_eq!(snap.icon, StatusIcon::Connected);
        assert_eq!(f.store.save_count(), 1);
        assert_eq!(f.store.load().unwrap().volume_percent, 30);
        assert_eq!(f.emitter.settings_changed(), vec![settings]);
    }

    #[tokio::test]
    async fn test_update_settings_rejects_out_of_range() {
        let f = fixture();
        let mut settings = KeyboardSettings::default();
        settings.power_percent = 200;
        let err = f.handle.update_settings(settings).await.unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_dismiss_settings() {
        let f = fixture();
        f.handle.show_settings().unwrap();
        f.handle.dismiss_settings().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert!(!snap.dialog_visible);
        assert_eq!(f.store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_finish_input_view_stops_and_saves() {
        let f = fixture();
        start_active_scan(&f).await;
        f.handle.show_settings().unwrap();
        f.device.complete_stops();
        f.handle.snapshot().await.unwrap();

        f.handle.finish_input_view().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert!(!snap.dialog_visible);
        assert_eq!(f.store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_finish_input_stops_scan() {
        let f = fixture();
        start_active_scan(&f).await;
        f.handle.finish_input().unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.phase, ScanPhaseKind::Stopping);
    }

    #[tokio::test]
    async fn test_start_input_view_reemits_icon() {
        let f = fixture();
        f.handle.start_input_view().unwrap();
        f.handle.snapshot().await.unwrap();
        assert_eq!(
            f.emitter.icons(),
            vec![StatusIcon::Connected, StatusIcon::Connected]
        );
    }

    #[tokio::test]
    async fn test_typing_through_handle() {
        let f = fixture();
        f.handle.key(KEYCODE_SHIFT).unwrap();
        f.clock.advance(100);
        f.handle.key(KEYCODE_SHIFT).unwrap();
        for c in "ok".chars() {
            f.handle.key(c as i32).unwrap();
        }
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.composing, "OK");
        assert_eq!(snap.shift, ShiftState::CapsLocked);

        f.handle.key(KEYCODE_DELETE).unwrap();
        f.handle.key(' ' as i32).unwrap();
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), "O ");
        assert!(f
            .emitter
            .keyboard_states()
            .contains(&(KeyboardMode::Alphabetic, ShiftState::CapsLocked)));
    }

    #[tokio::test]
    async fn test_restart_in_caps_field_shifts() {
        let f = fixture();
        f.editor.set_caps_mode(true);
        f.handle.start_input(EditorInfo::text(), true).unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.shift, ShiftState::Shifted);

        f.handle.key('a' as i32).unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.composing, "A");
    }

    #[tokio::test]
    async fn test_tag_commits_composing_text_first() {
        let f = fixture();
        let sink = start_active_scan(&f).await;
        for c in "bin".chars() {
            f.handle.key(c as i32).unwrap();
        }
        sink.tag_found("414243");
        f.handle.snapshot().await.unwrap();
        assert_eq!(f.editor.visible(), "bin,ABC");
    }

    #[tokio::test]
    async fn test_unknown_key_code_rejected() {
        let f = fixture();
        assert!(matches!(f.handle.key(-42), Err(ScanError::Core(_))));
    }

    #[tokio::test]
    async fn test_hardware_delete_and_suggestions() {
        let f = fixture();
        assert!(!f.handle.hardware_delete().await.unwrap());

        f.handle
            .display_completions(vec!["alpha".to_string()])
            .unwrap();
        f.handle.pick_suggestion(0).await.unwrap();
        assert_eq!(f.editor.visible(), "alpha");
        assert!(f.handle.pick_suggestion(3).await.is_err());
    }

    #[tokio::test]
    async fn test_update_selection_finishes_composing() {
        let f = fixture();
        for c in "abc".chars() {
            f.handle.key(c as i32).unwrap();
        }
        f.handle.update_selection(0, 0, 3).unwrap();
        let snap = f.handle.snapshot().await.unwrap();
        assert_eq!(snap.composing, "");
        assert_eq!(f.editor.visible(), "abc");
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiters() {
        let f = fixture();
        start_active_scan(&f).await;
        let (count, cb) = counter();
        f.handle.stop("user", Some(cb)).unwrap();
        f.handle.snapshot().await.unwrap();

        f.handle.shutdown().unwrap();
        while f.handle.snapshot().await.is_ok() {
            tokio::task::yield_now().await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(matches!(f.handle.toggle_scan(), Err(ScanError::ShuttingDown)));
    }
}
