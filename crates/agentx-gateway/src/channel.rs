// SPDX-License-Identifier: MIT
//! The Channel abstraction (spec §4.12): an ordered, reliable, bidirectional
//! stream of typed events with explicit connection states and a
//! state-change subscription.
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

/// One logical connection. A fresh axum WebSocket upgrade owns exactly one
/// `Channel` for its lifetime.
pub struct Channel {
    state: watch::Sender<ConnectionState>,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Idle);
        Self { state: tx }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Connection-state changes are themselves emitted as events (spec
    /// §4.12); subscribers observe them through the watch receiver.
    pub fn set_state(&self, state: ConnectionState) {
        let _ = self.state.send(state);
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_transitions_are_observable() {
        let channel = Channel::new();
        assert_eq!(channel.state(), ConnectionState::Idle);

        let mut sub = channel.subscribe_state();
        channel.set_state(ConnectionState::Connected);
        assert_eq!(*sub.borrow_and_update(), ConnectionState::Connected);
        assert_eq!(channel.state(), ConnectionState::Connected);
    }
}
