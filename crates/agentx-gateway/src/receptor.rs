// SPDX-License-Identifier: MIT
//! The Receptor (spec §4.12): parses inbound Channel frames. Routing the
//! parsed request to the right agent/session operation is the caller's
//! job (the `ws` handler), since that requires [`crate::state::GatewayState`]
//! rather than anything the Receptor itself owns.
use crate::events::WsEnvelope;

pub struct Receptor;

impl Receptor {
    /// Parse one inbound text frame as a [`WsEnvelope`].
    pub fn parse(frame: &str) -> Result<WsEnvelope, serde_json::Error> {
        serde_json::from_str(frame)
    }
}
