// SPDX-License-Identifier: MIT
use agentx_driver::StopReason;
use agentx_types::{AgentError, ToolCallId};

/// Conversation-level agent state (spec §3). Transitions are driven
/// exclusively by [`StateEvent`]s (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Queued,
    Thinking,
    Responding,
    PlanningTool,
    AwaitingToolResult,
    Initializing,
}

/// Output of the State Projector (spec §4.4): one per stream/message event
/// that causes a state transition. Carries enough payload for subscribers
/// (gateway, logging) to explain *why* the state changed.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    ConversationQueued,
    ConversationStart,
    ConversationResponding,
    ToolPlanned { tool_call_id: ToolCallId, tool_name: String },
    ToolExecuting { tool_call_id: ToolCallId, tool_name: String },
    ToolCompleted { tool_call_id: ToolCallId },
    ConversationThinking,
    ToolFailed { tool_call_id: ToolCallId },
    ConversationEnd { stop_reason: StopReason },
    ConversationInterrupted,
    ErrorOccurred { error: AgentError },
}

impl StateEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ConversationQueued => "conversation_queued",
            Self::ConversationStart => "conversation_start",
            Self::ConversationResponding => "conversation_responding",
            Self::ToolPlanned { .. } => "tool_planned",
            Self::ToolExecuting { .. } => "tool_executing",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::ConversationThinking => "conversation_thinking",
            Self::ToolFailed { .. } => "tool_failed",
            Self::ConversationEnd { .. } => "conversation_end",
            Self::ConversationInterrupted => "conversation_interrupted",
            Self::ErrorOccurred { .. } => "error_occurred",
        }
    }

    /// Whether this event ends the current turn (spec §4.5's Turn Tracker
    /// watches for exactly these two to close an open turn).
    pub fn ends_turn(&self) -> bool {
        matches!(
            self,
            Self::ConversationEnd { .. } | Self::ConversationInterrupted
        )
    }
}
