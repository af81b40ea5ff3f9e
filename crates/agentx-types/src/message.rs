// SPDX-License-Identifier: MIT
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{MessageId, ToolCallId};

/// A single content part of a user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContentPart {
    Text {
        text: String,
    },
    Image {
        /// Raw bytes, base64-encoded, or a data URL — opaque to this type.
        data: String,
        media_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    File {
        data: String,
        media_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

/// A single content part of an assistant message.
///
/// Text and tool-call parts may interleave in any order; the `Vec` they are
/// stored in preserves that order, which the [`crate::invariants`] helpers
/// and the message assembler both rely on (spec §3 ordering invariant).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantContentPart {
    Text {
        text: String,
    },
    Thinking {
        reasoning: String,
    },
    ToolCall {
        id: ToolCallId,
        name: String,
        input: Value,
    },
    Image {
        data: String,
        media_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    File {
        data: String,
        media_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

impl AssistantContentPart {
    pub fn as_tool_call(&self) -> Option<(&ToolCallId, &str, &Value)> {
        match self {
            Self::ToolCall { id, name, input } => Some((id, name, input)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Content of a `user` message: either plain text or an ordered list of parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<UserContentPart>),
}

/// Content of an `assistant` message: either plain text or an ordered list
/// of interleaved parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AssistantContent {
    Text(String),
    Parts(Vec<AssistantContentPart>),
}

impl AssistantContent {
    /// All tool-call parts, in message order. Empty for `Text`.
    pub fn tool_calls(&self) -> Vec<&AssistantContentPart> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, AssistantContentPart::ToolCall { .. }))
                .collect(),
        }
    }

    /// Concatenation of all text parts, in order. Returns the whole string
    /// for `Text`.
    pub fn text(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(AssistantContentPart::as_text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// The classified output of a tool-result, per spec §4.3.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ToolResultOutput {
    Text { value: String },
    Json { value: Value },
    ErrorText { value: String },
    ErrorJson { value: Value },
    ExecutionDenied { reason: String },
}

impl ToolResultOutput {
    /// The sentinel string the driver uses to signal a user-denied execution.
    pub const EXECUTION_DENIED_SENTINEL: &'static str = "execution denied by user";

    /// Classify a raw `(result, is_error)` pair per the §4.3 table.
    pub fn classify(result: &Value, is_error: bool) -> Self {
        if let Some(s) = result.as_str() {
            if s == Self::EXECUTION_DENIED_SENTINEL {
                return Self::ExecutionDenied {
                    reason: s.to_string(),
                };
            }
            return if is_error {
                Self::ErrorText { value: s.to_string() }
            } else {
                Self::Text { value: s.to_string() }
            };
        }
        if is_error {
            Self::ErrorJson {
                value: result.clone(),
            }
        } else {
            Self::Json {
                value: result.clone(),
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ErrorText { .. } | Self::ErrorJson { .. } | Self::ExecutionDenied { .. }
        )
    }
}

/// A single message in an agent's conversation history.
///
/// Tagged by `role` for (de)serialization; each variant's shape matches
/// spec §3 exactly. The split `ToolCall`/`ToolResult` variants (rather than
/// a merged `tool-use` message) are the resolved Open Question from spec §9.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User {
        id: MessageId,
        timestamp: DateTime<Utc>,
        content: UserContent,
    },
    Assistant {
        id: MessageId,
        timestamp: DateTime<Utc>,
        content: AssistantContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
    ToolCall {
        id: MessageId,
        timestamp: DateTime<Utc>,
        call_id: ToolCallId,
        name: String,
        input: Value,
    },
    ToolResult {
        id: MessageId,
        timestamp: DateTime<Utc>,
        tool_call_id: ToolCallId,
        output: ToolResultOutput,
    },
    System {
        id: MessageId,
        timestamp: DateTime<Utc>,
        text: String,
    },
}

impl Message {
    pub fn id(&self) -> &MessageId {
        match self {
            Self::User { id, .. }
            | Self::Assistant { id, .. }
            | Self::ToolCall { id, .. }
            | Self::ToolResult { id, .. }
            | Self::System { id, .. } => id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::User { timestamp, .. }
            | Self::Assistant { timestamp, .. }
            | Self::ToolCall { timestamp, .. }
            | Self::ToolResult { timestamp, .. }
            | Self::System { timestamp, .. } => *timestamp,
        }
    }

    /// The discriminator this message serializes under, matching its variant.
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::ToolCall { .. } => "tool-call",
            Self::ToolResult { .. } => "tool-result",
            Self::System { .. } => "system",
        }
    }

    /// Whether this message counts as "user-equivalent" in the strict
    /// alternation invariant (spec §3/P3): user and tool-result messages are
    /// user-equivalent, assistant and tool-call messages are not.
    ///
    /// `ToolCall` messages are assistant-originated and are grouped with the
    /// assistant side of the alternation; `System` messages are exempt from
    /// alternation entirely (they may appear anywhere, e.g. as message 0).
    pub fn alternation_side(&self) -> Option<AlternationSide> {
        match self {
            Self::User { .. } | Self::ToolResult { .. } => Some(AlternationSide::UserEquivalent),
            Self::Assistant { .. } | Self::ToolCall { .. } => Some(AlternationSide::Assistant),
            Self::System { .. } => None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            id: MessageId::new(),
            timestamp: Utc::now(),
            content: UserContent::Text(text.into()),
        }
    }

    pub fn assistant_text(text: impl Into<String>, stop_reason: Option<String>) -> Self {
        Self::Assistant {
            id: MessageId::new(),
            timestamp: Utc::now(),
            content: AssistantContent::Text(text.into()),
            stop_reason,
        }
    }

    pub fn tool_call(call_id: ToolCallId, name: impl Into<String>, input: Value) -> Self {
        Self::ToolCall {
            id: MessageId::new(),
            timestamp: Utc::now(),
            call_id,
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_call_id: ToolCallId, output: ToolResultOutput) -> Self {
        Self::ToolResult {
            id: MessageId::new(),
            timestamp: Utc::now(),
            tool_call_id,
            output,
        }
    }

    /// Approximate token count, 4-chars-per-token heuristic (teacher-
    /// identical constant; used only for Image/Session context bookkeeping,
    /// not for any correctness-bearing decision).
    pub fn approx_tokens(&self) -> usize {
        let chars = match self {
            Self::User { content: UserContent::Text(t), .. } => t.len(),
            Self::User { content: UserContent::Parts(parts), .. } => parts
                .iter()
                .map(|p| match p {
                    UserContentPart::Text { text } => text.len(),
                    UserContentPart::Image { .. } | UserContentPart::File { .. } => 765 * 4,
                })
                .sum(),
            Self::Assistant { content, .. } => content.text().len()
                + content.tool_calls().len() * 16,
            Self::ToolCall { name, input, .. } => name.len() + input.to_string().len(),
            Self::ToolResult { output, .. } => match output {
                ToolResultOutput::Text { value } | ToolResultOutput::ErrorText { value } => {
                    value.len()
                }
                ToolResultOutput::Json { value } | ToolResultOutput::ErrorJson { value } => {
                    value.to_string().len()
                }
                ToolResultOutput::ExecutionDenied { reason } => reason.len(),
            },
            Self::System { text, .. } => text.len(),
        };
        (chars / 4).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternationSide {
    UserEquivalent,
    Assistant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_text_ok() {
        let out = ToolResultOutput::classify(&Value::String("5".into()), false);
        assert_eq!(out, ToolResultOutput::Text { value: "5".into() });
    }

    #[test]
    fn classify_text_error() {
        let out = ToolResultOutput::classify(&Value::String("boom".into()), true);
        assert_eq!(out, ToolResultOutput::ErrorText { value: "boom".into() });
        assert!(out.is_error());
    }

    #[test]
    fn classify_json_ok() {
        let v = serde_json::json!({"a": 1});
        let out = ToolResultOutput::classify(&v, false);
        assert_eq!(out, ToolResultOutput::Json { value: v });
    }

    #[test]
    fn classify_json_error() {
        let v = serde_json::json!({"err": true});
        let out = ToolResultOutput::classify(&v, true);
        assert!(out.is_error());
        assert!(matches!(out, ToolResultOutput::ErrorJson { .. }));
    }

    #[test]
    fn classify_execution_denied_sentinel() {
        let v = Value::String(ToolResultOutput::EXECUTION_DENIED_SENTINEL.into());
        let out = ToolResultOutput::classify(&v, true);
        assert!(matches!(out, ToolResultOutput::ExecutionDenied { .. }));
    }

    #[test]
    fn message_round_trips_through_json() {
        let m = Message::user("hello");
        let json = serde_json::to_string(&m).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.subtype(), "user");
        assert_eq!(back.id(), m.id());
    }

    #[test]
    fn tool_result_round_trips_with_union_shape() {
        let m = Message::tool_result(
            ToolCallId::new(),
            ToolResultOutput::Json { value: serde_json::json!({"ok": true}) },
        );
        let json = serde_json::to_string(&m).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        match back {
            Message::ToolResult { output, .. } => {
                assert!(matches!(output, ToolResultOutput::Json { .. }));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn alternation_sides_match_spec() {
        assert_eq!(
            Message::user("hi").alternation_side(),
            Some(AlternationSide::UserEquivalent)
        );
        assert_eq!(
            Message::assistant_text("hi", None).alternation_side(),
            Some(AlternationSide::Assistant)
        );
        let tc = Message::tool_call(ToolCallId::new(), "bash", serde_json::json!({}));
        assert_eq!(tc.alternation_side(), Some(AlternationSide::Assistant));
        let tr = Message::tool_result(ToolCallId::new(), ToolResultOutput::Text { value: "x".into() });
        assert_eq!(tr.alternation_side(), Some(AlternationSide::UserEquivalent));
    }

    #[test]
    fn assistant_content_interleaves_text_and_tool_calls_in_order() {
        let call_id = ToolCallId::new();
        let content = AssistantContent::Parts(vec![
            AssistantContentPart::Text { text: "before".into() },
            AssistantContentPart::ToolCall {
                id: call_id.clone(),
                name: "bash".into(),
                input: serde_json::json!({"command": "ls"}),
            },
            AssistantContentPart::Text { text: "after".into() },
        ]);
        assert_eq!(content.text(), "beforeafter");
        assert_eq!(content.tool_calls().len(), 1);
    }

    #[test]
    fn approx_tokens_minimum_is_one() {
        assert_eq!(Message::user("").approx_tokens(), 1);
    }
}
