// SPDX-License-Identifier: MIT
mod definition;
mod error;
mod ids;
pub mod invariants;
mod message;

pub use definition::Definition;
pub use error::{AgentError, ErrorCategory, Severity};
pub use ids::{AgentId, ContainerId, EventId, ImageId, MessageId, SessionId, ToolCallId};
pub use message::{
    AlternationSide, AssistantContent, AssistantContentPart, Message, ToolResultOutput,
    UserContent, UserContentPart,
};
