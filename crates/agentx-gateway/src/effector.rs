// SPDX-License-Identifier: MIT
//! The Effector (spec §4.12): forwards outbound bus events onto a Channel.
//! Events produced while the Channel isn't `connected` are dropped with a
//! warning — no hidden buffering, since a reconnect must rebuild state from
//! the Image rather than replay a backlog.
use std::sync::Arc;

use tracing::warn;

use crate::channel::{Channel, ConnectionState};
use crate::events::WsEnvelope;

pub struct Effector {
    channel: Arc<Channel>,
}

impl Effector {
    pub fn new(channel: Arc<Channel>) -> Self {
        Self { channel }
    }

    /// Returns `Some(envelope)` if the Channel is connected and the event
    /// should be sent; `None` if it was dropped.
    pub fn accept(&self, envelope: WsEnvelope) -> Option<WsEnvelope> {
        if self.channel.state() != ConnectionState::Connected {
            warn!(
                event_type = %envelope.event_type,
                state = self.channel.state().as_str(),
                "dropping outbound event: channel not connected"
            );
            return None;
        }
        Some(envelope)
    }
}
