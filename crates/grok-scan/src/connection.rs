//! Mirror of the reader's connection state plus the scan-active flag, the two
//! device-side inputs of the status icon.

use grok_core::types::ConnectionState;

/// Result of feeding a connection notification to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionUpdate {
    pub previous: ConnectionState,
    pub current: ConnectionState,
}

impl ConnectionUpdate {
    /// The notification repeated the state already known.
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }

    /// The reader went from connected to anything else. Any inventory in
    /// flight is gone with it.
    pub fn resolves_pending_scan(&self) -> bool {
        self.previous.is_connected() && !self.current.is_connected()
    }
}

/// Tracks connection state and whether an inventory is running.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStateTracker {
    state: ConnectionState,
    scan_active: bool,
}

impl ConnectionStateTracker {
    pub fn new(initial: ConnectionState) -> Self {
        ConnectionStateTracker {
            state: initial,
            scan_active: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn scan_active(&self) -> bool {
        self.scan_active
    }

    pub fn set_scan_active(&mut self, active: bool) {
        self.scan_active = active;
    }

    /// Records a reader notification.
    pub fn update(&mut self, state: ConnectionState) -> ConnectionUpdate {
        let update = ConnectionUpdate {
            previous: self.state,
            current: state,
        };
        self.state = state;
        if update.resolves_pending_scan() {
            self.scan_active = false;
        }
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_reports_change() {
        let mut tracker = ConnectionStateTracker::new(ConnectionState::NotConnected);

        let update = tracker.update(ConnectionState::Connecting);
        assert!(update.is_change());
        assert!(!update.resolves_pending_scan());

        let update = tracker.update(ConnectionState::Connecting);
        assert!(!update.is_change());

        tracker.update(ConnectionState::Connected);
        assert!(tracker.is_connected());
    }

    #[test]
    fn test_connection_loss_clears_scan() {
        let mut tracker = ConnectionStateTracker::new(ConnectionState::Connected);
        tracker.set_scan_active(true);

        let update = tracker.update(ConnectionState::NotConnected);
        assert!(update.resolves_pending_scan());
        assert!(!tracker.scan_active());
        assert_eq!(tracker.state(), ConnectionState::NotConnected);
    }

    #[test]
    fn test_incompatible_reader_is_not_connected() {
        let mut tracker = ConnectionStateTracker::default();
        tracker.update(ConnectionState::IncompatibleReader);
        assert!(!tracker.is_connected());
    }
}
