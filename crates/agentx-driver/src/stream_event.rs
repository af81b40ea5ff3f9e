// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agentx_types::{AgentId, EventId, MessageId, ToolCallId};

/// Why an assistant message's step terminated (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    Stop,
    ToolCalls,
    MaxTokens,
    Length,
    Error,
    Interrupted,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::ToolCalls => "tool-calls",
            Self::MaxTokens => "max-tokens",
            Self::Length => "length",
            Self::Error => "error",
            Self::Interrupted => "interrupted",
        }
    }
}

/// The canonical, provider-agnostic stream event alphabet (spec §4.1).
///
/// Every concrete Driver binding (out of scope for this repository) must
/// translate its upstream provider's native tokens into this alphabet
/// before handing events to the Engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        message_id: MessageId,
        model: String,
    },
    TextContentBlockStart {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
    },
    TextDelta {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        text: String,
    },
    TextContentBlockStop {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
    },
    ToolUseContentBlockStart {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        tool_call_id: ToolCallId,
        tool_name: String,
    },
    InputJsonDelta {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        partial_json: String,
    },
    ToolUseContentBlockStop {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        tool_call_id: ToolCallId,
        tool_name: String,
        input: Value,
    },
    ToolCall {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        tool_call_id: ToolCallId,
        tool_name: String,
        input: Value,
    },
    ToolResult {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        tool_call_id: ToolCallId,
        result: Value,
        is_error: bool,
    },
    MessageStop {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        stop_reason: StopReason,
    },
    Interrupted {
        uuid: EventId,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl StreamEvent {
    pub fn agent_id(&self) -> &AgentId {
        match self {
            Self::MessageStart { agent_id, .. }
            | Self::TextContentBlockStart { agent_id, .. }
            | Self::TextDelta { agent_id, .. }
            | Self::TextContentBlockStop { agent_id, .. }
            | Self::ToolUseContentBlockStart { agent_id, .. }
            | Self::InputJsonDelta { agent_id, .. }
            | Self::ToolUseContentBlockStop { agent_id, .. }
            | Self::ToolCall { agent_id, .. }
            | Self::ToolResult { agent_id, .. }
            | Self::MessageStop { agent_id, .. }
            | Self::Interrupted { agent_id, .. } => agent_id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::MessageStart { .. } => "message_start",
            Self::TextContentBlockStart { .. } => "text_content_block_start",
            Self::TextDelta { .. } => "text_delta",
            Self::TextContentBlockStop { .. } => "text_content_block_stop",
            Self::ToolUseContentBlockStart { .. } => "tool_use_content_block_start",
            Self::InputJsonDelta { .. } => "input_json_delta",
            Self::ToolUseContentBlockStop { .. } => "tool_use_content_block_stop",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::MessageStop { .. } => "message_stop",
            Self::Interrupted { .. } => "interrupted",
        }
    }
}
