// SPDX-License-Identifier: MIT
//! The Engine (spec §4.6): composes the assembler/projector/turn-tracker
//! per agent and re-injects each processor's outputs as inputs to the
//! others, bounded because message/turn events never re-trigger the
//! assembler or projector (spec §9).
use std::collections::HashMap;

use agentx_driver::StreamEvent;
use agentx_types::{AgentError, AgentId};

use crate::assembler::MessageAssembler;
use crate::message_event::MessageEvent;
use crate::state_event::{AgentState, StateEvent};
use crate::state_projector::StateProjector;
use crate::turn_event::TurnEvent;
use crate::turn_tracker::TurnTracker;

/// One output of [`Engine::process_stream_event`]/[`Engine::process_user_message`].
/// `Stream` is the raw input, forwarded unchanged so pass-through subscribers
/// (e.g. a raw event log) see it alongside the higher-tier events it produced.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Stream(StreamEvent),
    Message(MessageEvent),
    State(StateEvent),
    Turn(TurnEvent),
}

impl EngineOutput {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Stream(e) => e.type_name(),
            Self::Message(e) => e.type_name(),
            Self::State(e) => e.type_name(),
            Self::Turn(e) => e.type_name(),
        }
    }
}

struct ProcessorState {
    assembler: MessageAssembler,
    projector: StateProjector,
    turn_tracker: TurnTracker,
}

impl Default for ProcessorState {
    fn default() -> Self {
        Self {
            assembler: MessageAssembler::new(),
            projector: StateProjector::new(),
            turn_tracker: TurnTracker::new(),
        }
    }
}

/// Holds per-agent processor state and drives the re-entrant composition.
#[derive(Default)]
pub struct Engine {
    agents: HashMap<AgentId, ProcessorState>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `user_message` pseudo-input (spec §4.2: emitted outside the
    /// assembler by the Agent when `receive()` is invoked). Drives the
    /// projector's `conversation_queued` and the turn tracker's
    /// `turn_request`, bypassing the assembler entirely.
    pub fn process_user_message(
        &mut self,
        agent_id: &AgentId,
        message: agentx_types::Message,
    ) -> Vec<EngineOutput> {
        let proc = self.agents.entry(agent_id.clone()).or_default();
        let message_event = MessageEvent::UserMessage(message);
        let mut outputs = vec![EngineOutput::Message(message_event.clone())];

        for state_event in proc.projector.on_user_message() {
            outputs.push(EngineOutput::State(state_event));
        }
        for turn_event in proc.turn_tracker.on_message_event(&message_event) {
            outputs.push(EngineOutput::Turn(turn_event));
        }
        outputs
    }

    /// Main entry point: one Driver stream event in, the full re-entrant
    /// chain of derived outputs out, in emission order (spec §4.6).
    pub fn process_stream_event(
        &mut self,
        agent_id: &AgentId,
        event: StreamEvent,
    ) -> Vec<EngineOutput> {
        let proc = self.agents.entry(agent_id.clone()).or_default();
        let mut outputs = vec![EngineOutput::Stream(event.clone())];

        let message_events = proc.assembler.handle(&event);
        let state_events = proc.projector.on_stream_event(&event);

        for message_event in &message_events {
            outputs.push(EngineOutput::Message(message_event.clone()));
        }
        for state_event in &state_events {
            outputs.push(EngineOutput::State(state_event.clone()));
        }

        // Re-injection: every message/state event produced this step feeds
        // the turn tracker. Turn events themselves are terminal — they are
        // never re-fed into any processor, which is what bounds the
        // recursion (spec §9).
        for message_event in &message_events {
            for turn_event in proc.turn_tracker.on_message_event(message_event) {
                outputs.push(EngineOutput::Turn(turn_event));
            }
        }
        for state_event in &state_events {
            for turn_event in proc.turn_tracker.on_state_event(state_event) {
                outputs.push(EngineOutput::Turn(turn_event));
            }
        }

        outputs
    }

    /// Classify a Driver exception (spec §4.9 step 5 / §4.4 "Driver throws")
    /// into an `error_occurred` state event, without going through the
    /// assembler (the Driver produced no stream event at all).
    pub fn process_driver_error(&mut self, agent_id: &AgentId, error: AgentError) -> Vec<EngineOutput> {
        let proc = self.agents.entry(agent_id.clone()).or_default();
        proc.projector
            .on_driver_error(error)
            .into_iter()
            .map(EngineOutput::State)
            .collect()
    }

    /// Frees an agent's processor state (spec §4.6 `clearState`).
    pub fn clear_state(&mut self, agent_id: &AgentId) {
        self.agents.remove(agent_id);
    }

    pub fn has_state(&self, agent_id: &AgentId) -> bool {
        self.agents.contains_key(agent_id)
    }

    /// The agent's current conversation state (spec §4.9 `state` attribute,
    /// delegated to the projector). Agents with no processor state yet are
    /// `idle` (they have never received a message).
    pub fn agent_state(&self, agent_id: &AgentId) -> AgentState {
        self.agents
            .get(agent_id)
            .map(|proc| proc.projector.state())
            .unwrap_or(AgentState::Idle)
    }
}
