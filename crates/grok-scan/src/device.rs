//! # Reader Contract
//!
//! The Grokker is an injected collaborator. Every call is fire-and-forget;
//! results come back through callbacks or through the session's
//! [`InventoryEventSink`], and all of them land on the controller's channel.
//!
//! ## Callback Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   controller ──start_inventory(config, sink)──► GrokkerDevice          │
//! │        ▲                                            │                   │
//! │        │           sink.inventory_started()         │                   │
//! │        ├────────── sink.tag_found(epc) ◄────────────┤ (any thread)      │
//! │        │           sink.inventory_did_stop(code)    │                   │
//! │        │                                            │                   │
//! │        └────────── on_stopped() ◄── stop_inventory ─┘                   │
//! │                                                                         │
//! │  Every sink event carries the session id it was created with, so       │
//! │  late events from a finished session are recognised and dropped.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use grok_core::types::{BatteryInfo, ConnectionState, InventoryType, RfidConfiguration};

use crate::controller::Command;
use crate::error::ScanResult;

/// Continuation run once a requested stop has completed.
pub type StopCompletion = Box<dyn FnOnce() + Send>;

/// Continuation receiving the battery report, if the reader has one.
pub type BatteryCallback = Box<dyn FnOnce(Option<BatteryInfo>) + Send>;

// =============================================================================
// Device Trait
// =============================================================================

/// An RFID reader.
pub trait GrokkerDevice: Send + Sync {
    /// Starts an inventory. Events for it must be reported through `events`.
    fn start_inventory(&self, config: RfidConfiguration, events: InventoryEventSink)
        -> ScanResult<()>;

    /// Session id of the inventory the reader is running, if any.
    fn active_session(&self) -> Option<Uuid>;

    /// Stops the running inventory and calls `on_stopped` when done.
    fn stop_inventory(&self, on_stopped: StopCompletion);

    fn connection_state(&self) -> ConnectionState;

    fn get_battery_info(&self, on_result: BatteryCallback);

    /// Factory configuration for an inventory type.
    fn base_configuration(&self, kind: InventoryType) -> RfidConfiguration;

    /// Lowest power level the reader accepts.
    fn min_allowable_power_level(&self) -> f64;

    /// Idle time before the reader drops its connection. Zero keeps it open.
    fn set_disconnect_delay(&self, delay: Duration);
}

// =============================================================================
// Inventory Event Sink
// =============================================================================

/// Where the reader reports events for one inventory session.
///
/// Cheap to clone and safe to call from any thread.
#[derive(Debug, Clone)]
pub struct InventoryEventSink {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<Command>,
}

impl InventoryEventSink {
    pub(crate) fn new(session_id: Uuid, tx: mpsc::UnboundedSender<Command>) -> Self {
        InventoryEventSink { session_id, tx }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The reader confirmed the inventory is running.
    pub fn inventory_started(&self) {
        let _ = self.tx.send(Command::InventoryStarted {
            session: self.session_id,
        });
    }

    /// A tag was read. `epc` is the identifier in hex.
    pub fn tag_found(&self, epc: impl Into<String>) {
        let _ = self.tx.send(Command::TagFound {
            session: self.session_id,
            epc: epc.into(),
        });
    }

    /// The inventory ended with a reader result code.
    pub fn inventory_did_stop(&self, code: i32) {
        let _ = self.tx.send(Command::InventoryDidStop {
            session: self.session_id,
            code,
        });
    }
}
