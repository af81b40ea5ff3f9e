// SPDX-License-Identifier: MIT
//! State Projector (spec §4.4): a pure transducer from stream events (plus
//! the two external triggers "user message received" and "Driver threw")
//! to [`StateEvent`]s, with a deterministic highest-priority-rule-wins
//! mapping — encoded here simply as one match arm per stream event variant,
//! since the table names each trigger exactly once.
use agentx_driver::StreamEvent;
use agentx_types::AgentError;

use crate::state_event::{AgentState, StateEvent};

#[derive(Debug)]
pub struct StateProjector {
    state: AgentState,
    turn_started: bool,
}

impl Default for StateProjector {
    fn default() -> Self {
        Self {
            state: AgentState::Idle,
            turn_started: false,
        }
    }
}

impl StateProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Trigger: "user message received" (spec §4.4 table, row 1).
    pub fn on_user_message(&mut self) -> Vec<StateEvent> {
        self.state = AgentState::Queued;
        self.turn_started = false;
        vec![StateEvent::ConversationQueued]
    }

    /// Trigger: "Driver throws" (spec §4.4 table, last row).
    pub fn on_driver_error(&mut self, error: AgentError) -> Vec<StateEvent> {
        self.state = AgentState::Idle;
        vec![StateEvent::ErrorOccurred { error }]
    }

    pub fn on_stream_event(&mut self, event: &StreamEvent) -> Vec<StateEvent> {
        use agentx_driver::StopReason;

        match event {
            StreamEvent::MessageStart { .. } => {
                if self.turn_started {
                    vec![]
                } else {
                    self.turn_started = true;
                    self.state = AgentState::Thinking;
                    vec![StateEvent::ConversationStart]
                }
            }
            StreamEvent::TextDelta { .. } => {
                self.state = AgentState::Responding;
                vec![StateEvent::ConversationResponding]
            }
            StreamEvent::ToolUseContentBlockStart {
                tool_call_id,
                tool_name,
                ..
            } => {
                self.state = AgentState::PlanningTool;
                vec![StateEvent::ToolPlanned {
                    tool_call_id: tool_call_id.clone(),
                    tool_name: tool_name.clone(),
                }]
            }
            StreamEvent::ToolUseContentBlockStop {
                tool_call_id,
                tool_name,
                ..
            } => {
                self.state = AgentState::AwaitingToolResult;
                vec![StateEvent::ToolExecuting {
                    tool_call_id: tool_call_id.clone(),
                    tool_name: tool_name.clone(),
                }]
            }
            StreamEvent::ToolResult {
                tool_call_id,
                is_error,
                ..
            } => {
                self.state = AgentState::Responding;
                if *is_error {
                    vec![StateEvent::ToolFailed {
                        tool_call_id: tool_call_id.clone(),
                    }]
                } else {
                    vec![
                        StateEvent::ToolCompleted {
                            tool_call_id: tool_call_id.clone(),
                        },
                        StateEvent::ConversationThinking,
                    ]
                }
            }
            StreamEvent::MessageStop { stop_reason, .. } => match stop_reason {
                StopReason::Stop | StopReason::Length | StopReason::MaxTokens => {
                    self.state = AgentState::Idle;
                    vec![StateEvent::ConversationEnd {
                        stop_reason: *stop_reason,
                    }]
                }
                // tool-calls / error / interrupted message_stop variants are
                // not in the §4.4 table as independent triggers — the
                // awaiting-tool-result / error / interrupted states are
                // already established by the corresponding dedicated events.
                _ => vec![],
            },
            StreamEvent::Interrupted { .. } => {
                self.state = AgentState::Idle;
                vec![StateEvent::ConversationInterrupted]
            }
            StreamEvent::TextContentBlockStart { .. }
            | StreamEvent::TextContentBlockStop { .. }
            | StreamEvent::InputJsonDelta { .. }
            | StreamEvent::ToolCall { .. } => vec![],
        }
    }
}
