// SPDX-License-Identifier: MIT
use agentx_engine::EngineOutput;
use agentx_types::AgentError;

/// The payload type carried by an [`agentx_bus::EventBus`] scoped to one
/// agent (spec §4.7, §4.9). Wraps every Engine output plus the two events
/// an Agent Instance produces on its own: the independent `error` event
/// (spec §7) and the destroy-lifecycle notification (spec §4.9).
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Engine(EngineOutput),
    Error(AgentError),
    Destroyed,
}

impl AgentEvent {
    /// The bus topic this event is published under.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Engine(output) => output.type_name(),
            Self::Error(_) => "error",
            Self::Destroyed => "destroyed",
        }
    }
}
