//! # Grok Keyboard Simulator
//!
//! Runs the scan controller against a simulated Grokker and prints every
//! view notification as a JSON line.
//!
//! ## Usage
//! ```bash
//! # Scan the default tags for one second
//! cargo run -p grok-scan --bin grok-sim
//!
//! # Custom tags, single-tag mode
//! cargo run -p grok-scan --bin grok-sim -- --tags 414243,444546 --find-one
//!
//! # Use a specific settings file
//! cargo run -p grok-scan --bin grok-sim -- --config ./keyboard.toml
//!
//! # Open the settings dialog afterwards with a 20% battery
//! cargo run -p grok-scan --bin grok-sim -- --battery 20
//! ```
//!
//! Logs go to stderr; `RUST_LOG=grok_scan=debug` shows the controller's
//! state transitions.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use grok_core::composer::EditorInfo;
use grok_core::types::BatteryInfo;
use grok_scan::{
    EventSinkEmitter, KeyboardEvent, MemorySettingsStore, ScanController, SettingsFile,
    SettingsStore, SharedEditor, SimConfig, SimulatedGrokker, TomlSettingsStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut tags: Option<Vec<String>> = None;
    let mut find_one = false;
    let mut duration_ms: u64 = 1000;
    let mut battery: Option<u8> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--tags" | "-t" => {
                if i + 1 < args.len() {
                    tags = Some(args[i + 1].split(',').map(str::to_string).collect());
                    i += 1;
                }
            }
            "--duration-ms" | "-d" => {
                if i + 1 < args.len() {
                    duration_ms = args[i + 1].parse().unwrap_or(1000);
                    i += 1;
                }
            }
            "--battery" | "-b" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<u8>() {
                        Ok(percent) if percent <= 100 => battery = Some(percent),
                        _ => warn!(value = %args[i + 1], "Ignoring invalid battery level"),
                    }
                    i += 1;
                }
            }
            "--find-one" => find_one = true,
            "--help" | "-h" => {
                println!("Grok Keyboard Simulator");
                println!();
                println!("Usage: grok-sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>      Settings file (default: platform config dir)");
                println!("  -t, --tags <EPC,...>     Hex EPCs the simulated reader reports");
                println!("  -d, --duration-ms <N>    How long to scan (default: 1000)");
                println!("      --find-one           Stop after the first tag");
                println!("  -b, --battery <PERCENT>  Show the settings dialog with this battery level");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let file = SettingsFile::load_or_default(config_path.clone());
    let store: Arc<dyn SettingsStore> = if find_one {
        let mut settings = file.keyboard;
        settings.find_one_only = true;
        Arc::new(MemorySettingsStore::new(settings))
    } else {
        Arc::new(TomlSettingsStore::new(config_path))
    };

    let mut sim_config = SimConfig::default();
    if let Some(tags) = tags {
        sim_config.epcs = tags;
    }
    let device = Arc::new(SimulatedGrokker::new(sim_config));
    if let Some(percent) = battery {
        device.set_battery(Some(BatteryInfo {
            external_power_connected: false,
            is_charging: false,
            percent_remaining: percent,
        }));
    }

    let emitter = Arc::new(EventSinkEmitter::new(|event: KeyboardEvent| {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to serialize event"),
        }
    }));

    let editor = SharedEditor::new();
    let handle = ScanController::new(
        device,
        emitter,
        store,
        file.controller,
        Box::new(editor.clone()),
    )
    .start();

    handle.start_input(EditorInfo::text(), false)?;
    handle.start_input_view()?;

    info!(duration_ms, "Scanning");
    handle.toggle_scan()?;
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    handle.stop_and_wait("grok-sim").await?;

    if battery.is_some() {
        handle.show_settings()?;
        // two round trips: the battery report queues behind the first
        handle.snapshot().await?;
        handle.snapshot().await?;
        handle.dismiss_settings()?;
    }

    let snapshot = handle.snapshot().await?;
    println!("{}", serde_json::to_string(&snapshot)?);
    println!("{}", serde_json::json!({ "editor": editor.visible() }));

    handle.shutdown()?;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
