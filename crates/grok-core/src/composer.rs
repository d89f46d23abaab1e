//! # Text Composing Engine
//!
//! Tracks the composing buffer, shift / caps-lock state, the active key
//! layout and the candidate strip, and turns key presses into edits on the
//! host editor.
//!
//! ## Key Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          on_key(key)                                    │
//! │                                                                         │
//! │  separator? ──► commit composing ──► send separator ──► re-derive shift │
//! │  Delete     ──► backspace()                                             │
//! │  Shift      ──► shift toggle / caps-lock (800 ms double tap)            │
//! │  ModeChange ──► commit composing, Alphabetic <-> Symbols                │
//! │  Cancel     ──► commit composing, hide keyboard                         │
//! │  Char(c)    ──► append_character(c)                                    │
//! │                   │                                                     │
//! │                   ├── letter in Alphabetic with prediction/shift        │
//! │                   │     └── buffer + set_composing_text                 │
//! │                   └── otherwise commit_text(c)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine does no I/O of its own. Every edit goes through the
//! [`InputConnection`] passed into each call, which lets the scan controller
//! own both the engine and the editor handle.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::keys::{EditorKey, Key};
use crate::types::{KeyboardMode, ShiftState};

/// Characters that end a word.
pub const DEFAULT_WORD_SEPARATORS: &str = " .,;:!?\n()[]*&@{}/<>_+=\"|";

/// Two shift presses closer than this lock caps.
pub const CAPS_LOCK_WINDOW_MS: i64 = 800;

// =============================================================================
// Host Editor Contract
// =============================================================================

/// The host editor the keyboard types into.
pub trait InputConnection {
    /// Commits `text` and moves the cursor after it. Replaces any composing
    /// region.
    fn commit_text(&mut self, text: &str);

    /// Replaces the composing region with `text`.
    fn set_composing_text(&mut self, text: &str);

    /// Whether the editor wants a capital letter at the cursor.
    fn cursor_caps_mode(&self) -> bool;

    /// Up to `n` characters before the cursor.
    fn text_before_cursor(&self, n: usize) -> String;

    /// Sends a raw key down/up pair.
    fn send_key_event(&mut self, key: EditorKey);

    /// Keeps the composing region's text but stops treating it as composing.
    fn finish_composing_text(&mut self);

    /// Commits an editor-provided completion.
    fn commit_completion(&mut self, index: usize, text: &str);

    /// Asks the host to hide the keyboard.
    fn hide_keyboard(&mut self);
}

// =============================================================================
// Editor Description
// =============================================================================

/// Broad class of the field being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputClass {
    /// No editor type; caps mode is never queried.
    Null,
    #[default]
    Text,
    Number,
    Datetime,
    Phone,
    /// A class this keyboard does not special-case.
    Other,
}

/// Variation of a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextVariation {
    #[default]
    Normal,
    Password,
    VisiblePassword,
    EmailAddress,
    Uri,
    Filter,
    Other,
}

/// What the host tells the keyboard about the focused field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditorInfo {
    pub input_class: InputClass,
    pub variation: TextVariation,
    /// The editor shows its own auto-complete suggestions.
    pub auto_complete: bool,
}

impl EditorInfo {
    /// A plain text field.
    pub fn text() -> Self {
        EditorInfo::default()
    }

    fn suppresses_prediction(&self) -> bool {
        self.auto_complete
            || matches!(
                self.variation,
                TextVariation::Password
                    | TextVariation::VisiblePassword
                    | TextVariation::EmailAddress
                    | TextVariation::Uri
                    | TextVariation::Filter
            )
    }
}

// =============================================================================
// Clock
// =============================================================================

/// Millisecond clock used for the caps-lock double tap.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        ManualClock {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Composing buffer plus shift and layout state.
pub struct TextComposingEngine {
    composing: String,
    mode: KeyboardMode,
    shift: ShiftState,
    last_shift_millis: i64,

    prediction_on: bool,
    completion_on: bool,
    handle_shift: bool,
    editor: EditorInfo,

    candidates: Vec<String>,
    completions: Option<Vec<String>>,
    candidates_changed: bool,

    word_separators: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TextComposingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextComposingEngine")
            .field("composing", &self.composing)
            .field("mode", &self.mode)
            .field("shift", &self.shift)
            .field("prediction_on", &self.prediction_on)
            .field("completion_on", &self.completion_on)
            .finish()
    }
}

impl Default for TextComposingEngine {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TextComposingEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        TextComposingEngine {
            composing: String::new(),
            mode: KeyboardMode::Alphabetic,
            shift: ShiftState::Unshifted,
            last_shift_millis: 0,
            prediction_on: false,
            completion_on: false,
            handle_shift: false,
            editor: EditorInfo::default(),
            candidates: Vec::new(),
            completions: None,
            candidates_changed: false,
            word_separators: DEFAULT_WORD_SEPARATORS.to_string(),
            clock,
        }
    }

    /// Replaces the word separator set. Validate first with
    /// [`crate::validation::validate_word_separators`].
    pub fn with_word_separators(mut self, separators: impl Into<String>) -> Self {
        self.word_separators = separators.into();
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn composing(&self) -> &str {
        &self.composing
    }

    pub fn is_composing(&self) -> bool {
        !self.composing.is_empty()
    }

    pub fn mode(&self) -> KeyboardMode {
        self.mode
    }

    pub fn shift(&self) -> ShiftState {
        self.shift
    }

    pub fn prediction_on(&self) -> bool {
        self.prediction_on
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_word_separator(&self, c: char) -> bool {
        self.word_separators.contains(c)
    }

    /// Returns the candidate list if it changed since the last call.
    pub fn take_candidates_update(&mut self) -> Option<Vec<String>> {
        if std::mem::take(&mut self.candidates_changed) {
            Some(self.candidates.clone())
        } else {
            None
        }
    }

    // -------------------------------------------------------------------------
    // Input Session
    // -------------------------------------------------------------------------

    /// A new field gained focus, or the same field restarted.
    pub fn start_input(&mut self, editor: EditorInfo, ic: &mut dyn InputConnection) {
        self.composing.clear();
        self.completions = None;
        self.prediction_on = false;
        self.completion_on = false;
        self.handle_shift = false;
        self.editor = editor;
        self.update_candidates();

        self.mode = match editor.input_class {
            InputClass::Number | InputClass::Datetime | InputClass::Phone => {
                KeyboardMode::Symbols
            }
            InputClass::Text => {
                self.handle_shift = true;
                // auto-complete fields show the editor's own popup
                if !editor.suppresses_prediction() {
                    self.prediction_on = true;
                    self.completion_on = true;
                }
                KeyboardMode::Alphabetic
            }
            InputClass::Null | InputClass::Other => KeyboardMode::Alphabetic,
        };

        self.update_shift_key_state(ic);
    }

    /// The field lost focus.
    pub fn finish_input(&mut self) {
        self.composing.clear();
        self.completions = None;
        self.update_candidates();
        self.mode = KeyboardMode::Alphabetic;
    }

    /// The editor moved its selection. Drops the composing text if the
    /// cursor left the end of the composing region.
    pub fn update_selection(
        &mut self,
        new_start: usize,
        new_end: usize,
        candidates_end: usize,
        ic: &mut dyn InputConnection,
    ) {
        if self.is_composing() && (new_start != candidates_end || new_end != candidates_end) {
            self.composing.clear();
            self.update_candidates();
            ic.finish_composing_text();
        }
    }

    // -------------------------------------------------------------------------
    // Keys
    // -------------------------------------------------------------------------

    /// Handles one key from the on-screen keyboard. Scan keys are ignored;
    /// they belong to the scan controller.
    pub fn on_key(&mut self, key: Key, ic: &mut dyn InputConnection) {
        match key {
            Key::Char(c) if self.is_word_separator(c) => {
                self.commit_typed(ic);
                Self::send_separator(c, ic);
                self.update_shift_key_state(ic);
            }
            Key::Char(c) => self.append_character(c, ic),
            Key::Delete => self.backspace(ic),
            Key::Shift => self.handle_shift(),
            Key::ModeChange => self.switch_keyboard_mode(ic),
            Key::Cancel => {
                self.commit_typed(ic);
                ic.hide_keyboard();
            }
            Key::ToggleScan | Key::Settings => {}
        }
    }

    /// A physical Delete key. Returns true when the engine consumed it.
    pub fn hardware_delete(&mut self, ic: &mut dyn InputConnection) -> bool {
        if self.is_composing() {
            self.backspace(ic);
            true
        } else {
            false
        }
    }

    pub fn backspace(&mut self, ic: &mut dyn InputConnection) {
        match self.composing.chars().count() {
            0 => ic.send_key_event(EditorKey::Delete),
            1 => {
                self.composing.clear();
                ic.commit_text("");
                self.update_candidates();
            }
            _ => {
                self.composing.pop();
                ic.set_composing_text(&self.composing);
                self.update_candidates();
            }
        }
        self.update_shift_key_state(ic);
    }

    pub fn append_character(&mut self, c: char, ic: &mut dyn InputConnection) {
        let c = if self.mode == KeyboardMode::Alphabetic && self.shift.is_shifted() {
            c.to_uppercase().next().unwrap_or(c)
        } else {
            c
        };

        if c.is_alphabetic() && self.composable() {
            self.composing.push(c);
            ic.set_composing_text(&self.composing);
            self.update_shift_key_state(ic);
            if self.prediction_on {
                self.update_candidates();
            }
        } else {
            self.commit_typed(ic);
            let mut buf = [0u8; 4];
            ic.commit_text(c.encode_utf8(&mut buf));
        }
    }

    pub fn switch_keyboard_mode(&mut self, ic: &mut dyn InputConnection) {
        self.mode = if self.mode.is_symbols() {
            KeyboardMode::Alphabetic
        } else {
            KeyboardMode::Symbols
        };
        self.commit_typed(ic);
    }

    /// Commits pending composing text, then `text`, as one insertion.
    pub fn insert_external_text(&mut self, text: &str, ic: &mut dyn InputConnection) {
        self.commit_typed(ic);
        ic.commit_text(text);
        self.update_shift_key_state(ic);
    }

    /// Re-derives shift from caps lock and the editor's caps mode.
    pub fn update_shift_key_state(&mut self, ic: &dyn InputConnection) {
        if self.mode != KeyboardMode::Alphabetic || self.shift == ShiftState::CapsLocked {
            return;
        }
        let caps = self.editor.input_class != InputClass::Null && ic.cursor_caps_mode();
        self.shift = if caps {
            ShiftState::Shifted
        } else {
            ShiftState::Unshifted
        };
    }

    fn handle_shift(&mut self) {
        match self.mode {
            KeyboardMode::Alphabetic => {
                let now = self.clock.now_millis();
                if self.last_shift_millis + CAPS_LOCK_WINDOW_MS > now {
                    self.last_shift_millis = 0;
                    self.shift = match self.shift {
                        ShiftState::CapsLocked => ShiftState::Unshifted,
                        ShiftState::Unshifted | ShiftState::Shifted => ShiftState::CapsLocked,
                    };
                } else {
                    self.last_shift_millis = now;
                    self.shift = match self.shift {
                        ShiftState::Unshifted => ShiftState::Shifted,
                        ShiftState::Shifted | ShiftState::CapsLocked => ShiftState::Unshifted,
                    };
                }
            }
            KeyboardMode::Symbols => self.mode = KeyboardMode::SymbolsShifted,
            KeyboardMode::SymbolsShifted => self.mode = KeyboardMode::Symbols,
        }
    }

    // -------------------------------------------------------------------------
    // Candidates
    // -------------------------------------------------------------------------

    /// The editor offered its own completions.
    pub fn display_completions(&mut self, completions: Vec<String>) {
        if !self.completion_on {
            return;
        }
        self.candidates = completions.clone();
        self.completions = Some(completions);
        self.candidates_changed = true;
    }

    /// The user tapped a candidate.
    pub fn pick_suggestion(&mut self, index: usize, ic: &mut dyn InputConnection) -> CoreResult<()> {
        if self.completion_on {
            if let Some(text) = self.completions.as_ref().and_then(|c| c.get(index)).cloned() {
                ic.commit_completion(index, &text);
                self.candidates.clear();
                self.candidates_changed = true;
                self.update_shift_key_state(ic);
                return Ok(());
            }
        }

        if self.is_composing() {
            self.commit_typed(ic);
            return Ok(());
        }

        match &self.completions {
            Some(list) if self.completion_on => Err(CoreError::SuggestionOutOfRange {
                index,
                len: list.len(),
            }),
            _ => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn composable(&self) -> bool {
        self.mode == KeyboardMode::Alphabetic && (self.prediction_on || self.handle_shift)
    }

    fn commit_typed(&mut self, ic: &mut dyn InputConnection) {
        if self.is_composing() {
            ic.commit_text(&self.composing);
            self.composing.clear();
            self.update_candidates();
        }
    }

    fn update_candidates(&mut self) {
        if !self.completion_on {
            return;
        }
        self.candidates = if self.is_composing() {
            vec![self.composing.clone()]
        } else {
            Vec::new()
        };
        self.candidates_changed = true;
    }

    fn send_separator(c: char, ic: &mut dyn InputConnection) {
        match EditorKey::for_separator(c) {
            Some(key) => ic.send_key_event(key),
            None => {
                let mut buf = [0u8; 4];
                ic.commit_text(c.encode_utf8(&mut buf));
            }
        }
    }
}

// =============================================================================
// Test Editor
// =============================================================================

/// In-memory editor that applies edits to a string and records them.
#[derive(Debug, Default, Clone)]
pub struct RecordingEditor {
    /// Committed text.
    pub text: String,
    /// Current composing region, shown after `text`.
    pub composing: String,
    /// Every key event sent.
    pub key_events: Vec<EditorKey>,
    /// Every committed completion.
    pub completions: Vec<(usize, String)>,
    /// Whether the editor asks for a capital at the cursor.
    pub caps_mode: bool,
    pub hide_requests: usize,
    pub finish_composing_calls: usize,
}

impl RecordingEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed text plus the composing region.
    pub fn visible(&self) -> String {
        format!("{}{}", self.text, self.composing)
    }
}

impl InputConnection for RecordingEditor {
    fn commit_text(&mut self, text: &str) {
        self.composing.clear();
        self.text.push_str(text);
    }

    fn set_composing_text(&mut self, text: &str) {
        self.composing = text.to_string();
    }

    fn cursor_caps_mode(&self) -> bool {
        self.caps_mode
    }

    fn text_before_cursor(&self, n: usize) -> String {
        let visible = self.visible();
        let count = visible.chars().count();
        visible.chars().skip(count.saturating_sub(n)).collect()
    }

    fn send_key_event(&mut self, key: EditorKey) {
        self.key_events.push(key);
        match key {
            EditorKey::Enter => self.text.push('\n'),
            EditorKey::Delete => {
                self.text.pop();
            }
            EditorKey::Digit(d) => self.text.push(char::from(b'0' + d)),
        }
    }

    fn finish_composing_text(&mut self) {
        self.finish_composing_calls += 1;
        let composing = std::mem::take(&mut self.composing);
        self.text.push_str(&composing);
    }

    fn commit_completion(&mut self, index: usize, text: &str) {
        self.completions.push((index, text.to_string()));
        self.composing.clear();
        self.text.push_str(text);
    }

    fn hide_keyboard(&mut self) {
        self.hide_requests += 1;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
