//! # Keyboard Configuration
//!
//! Persistence of the six keyboard settings plus controller tuning.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     GROK_POWER_PERCENT=60                                              │
//! │     GROK_FIND_ONE=true                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/grok-keyboard/keyboard.toml (Linux)                      │
//! │     ~/Library/Application Support/com.ugrokit.grok-keyboard/... (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     power 100, volume 100, stay connected, ASCII decode                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # keyboard.toml
//! [keyboard]
//! power_percent = 100
//! volume_percent = 100
//! find_one_only = false
//! stay_connected = true
//! ascii_decode = true
//! always_add_comma_at_start = false
//!
//! [controller]
//! word_separators = " .,;:!?\n()[]*&@{}/<>_+=\"|"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use grok_core::composer::DEFAULT_WORD_SEPARATORS;
use grok_core::types::KeyboardSettings;
use grok_core::validation::{validate_settings, validate_word_separators};

use crate::error::{ScanError, ScanResult};

/// File name of the settings file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "keyboard.toml";

// =============================================================================
// Controller Configuration
// =============================================================================

/// Tuning for the scan controller and its text engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Characters that end a word and commit the composing text.
    #[serde(default = "default_word_separators")]
    pub word_separators: String,
}

fn default_word_separators() -> String {
    DEFAULT_WORD_SEPARATORS.to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            word_separators: default_word_separators(),
        }
    }
}

// =============================================================================
// Settings File
// =============================================================================

/// Complete contents of `keyboard.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// User-facing settings edited from the settings dialog.
    #[serde(default)]
    pub keyboard: KeyboardSettings,

    /// Controller tuning.
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl SettingsFile {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (keyboard.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if let Some(file) = Self::read_file(&path)? {
                config = file;
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load keyboard config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses the file at `path` without overrides. `None` when it does not
    /// exist.
    fn read_file(path: &Path) -> ScanResult<Option<Self>> {
        if !path.exists() {
            debug!(?path, "Config file not found, using defaults");
            return Ok(None);
        }
        info!(?path, "Loading keyboard config from file");
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&contents)?))
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Keyboard config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        validate_settings(&self.keyboard)?;
        validate_word_separators(&self.controller.word_separators)?;
        Ok(())
    }

    /// Applies `GROK_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are logged
    /// and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let keyboard = &mut self.keyboard;

        if let Some(value) = lookup("GROK_POWER_PERCENT") {
            match value.parse::<u8>() {
                Ok(p) => {
                    debug!(power_percent = p, "Overriding power from environment");
                    keyboard.power_percent = p;
                }
                Err(_) => warn!(value = %value, "Invalid GROK_POWER_PERCENT in environment"),
            }
        }

        if let Some(value) = lookup("GROK_VOLUME_PERCENT") {
            match value.parse::<u8>() {
                Ok(v) => {
                    debug!(volume_percent = v, "Overriding volume from environment");
                    keyboard.volume_percent = v;
                }
                Err(_) => warn!(value = %value, "Invalid GROK_VOLUME_PERCENT in environment"),
            }
        }

        let flags: [(&str, &mut bool); 4] = [
            ("GROK_FIND_ONE", &mut keyboard.find_one_only),
            ("GROK_STAY_CONNECTED", &mut keyboard.stay_connected),
            ("GROK_ASCII", &mut keyboard.ascii_decode),
            ("GROK_ALWAYS_ADD_COMMA", &mut keyboard.always_add_comma_at_start),
        ];
        for (key, slot) in flags {
            if let Some(value) = lookup(key) {
                match parse_flag(&value) {
                    Some(flag) => {
                        debug!(key, flag, "Overriding toggle from environment");
                        *slot = flag;
                    }
                    None => warn!(key, value = %value, "Invalid toggle in environment"),
                }
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "ugrokit", "grok-keyboard")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Settings Store
// =============================================================================

/// Where the controller reads and writes the six keyboard settings.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> ScanResult<KeyboardSettings>;
    fn save(&self, settings: &KeyboardSettings) -> ScanResult<()>;
}

/// Settings stored in `keyboard.toml`.
///
/// Saving rewrites only the `[keyboard]` table; other tables in the file are
/// preserved.
#[derive(Debug, Clone, Default)]
pub struct TomlSettingsStore {
    path: Option<PathBuf>,
}

impl TomlSettingsStore {
    /// Store at `path`, or at the platform default when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        TomlSettingsStore { path }
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> ScanResult<KeyboardSettings> {
        Ok(SettingsFile::load(self.path.clone())?.keyboard)
    }

    fn save(&self, settings: &KeyboardSettings) -> ScanResult<()> {
        validate_settings(settings)?;
        let path = self
            .path
            .clone()
            .or_else(SettingsFile::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;
        // an unreadable file is left alone rather than replaced
        let mut file = SettingsFile::read_file(&path)?.unwrap_or_default();
        file.keyboard = *settings;
        file.save(Some(path))
    }
}

/// Settings kept in memory. Counts saves so callers can tell when the
/// controller persisted.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<KeyboardSettings>,
    saves: Mutex<usize>,
}

impl MemorySettingsStore {
    pub fn new(settings: KeyboardSettings) -> Self {
        MemorySettingsStore {
            settings: Mutex::new(settings),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> ScanResult<KeyboardSettings> {
        self.settings
            .lock()
            .map(|s| *s)
            .map_err(|e| ScanError::ConfigLoadFailed(e.to_string()))
    }

    fn save(&self, settings: &KeyboardSettings) -> ScanResult<()> {
        validate_settings(settings)?;
        let mut current = self
            .settings
            .lock()
            .map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;
        *current = *settings;
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
