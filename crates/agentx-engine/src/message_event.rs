// SPDX-License-Identifier: MIT
use agentx_types::Message;

/// Output of the Message Assembler (and, for `UserMessage`, of the Agent
/// Instance itself — spec §4.2 notes `user_message` is emitted outside the
/// assembler when `receive()` is invoked).
#[derive(Debug, Clone, PartialEq)]
pub enum MessageEvent {
    UserMessage(Message),
    AssistantMessage(Message),
    ToolCallMessage(Message),
    ToolResultMessage(Message),
}

impl MessageEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::UserMessage(_) => "user_message",
            Self::AssistantMessage(_) => "assistant_message",
            Self::ToolCallMessage(_) => "tool_call_message",
            Self::ToolResultMessage(_) => "tool_result_message",
        }
    }

    pub fn message(&self) -> &Message {
        match self {
            Self::UserMessage(m)
            | Self::AssistantMessage(m)
            | Self::ToolCallMessage(m)
            | Self::ToolResultMessage(m) => m,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Self::UserMessage(m)
            | Self::AssistantMessage(m)
            | Self::ToolCallMessage(m)
            | Self::ToolResultMessage(m) => m,
        }
    }
}
