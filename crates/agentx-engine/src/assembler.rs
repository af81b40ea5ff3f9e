// SPDX-License-Identifier: MIT
//! Message Assembler (spec §4.2): a pure transducer from Driver stream
//! events to assembled [`Message`]s. Holds exactly one in-progress
//! assistant-message builder per agent; everything else (tool-result
//! messages) is stateless with respect to this builder.
//!
//! Determinism (P5): this type never calls `Uuid::new_v4`/`Utc::now`
//! itself. Assistant message ids come straight from the triggering
//! `message_start` event; tool-result message ids are derived
//! deterministically from the triggering event's own `uuid`, and
//! timestamps are copied from the triggering event. Two assemblers fed
//! byte-identical event sequences therefore emit byte-identical messages.
use serde_json::Value;
use tracing::warn;

use agentx_driver::{StopReason, StreamEvent};
use agentx_types::{AssistantContent, AssistantContentPart, Message, MessageId, ToolCallId, ToolResultOutput};

use crate::message_event::MessageEvent;

#[derive(Debug, Clone)]
enum PartBuilder {
    Text(String),
    ToolUse {
        id: ToolCallId,
        name: String,
        partial_json: String,
        input: Option<Value>,
    },
}

#[derive(Debug, Clone)]
struct AssistantBuilder {
    message_id: MessageId,
    timestamp: chrono::DateTime<chrono::Utc>,
    parts: Vec<PartBuilder>,
    open_index: Option<usize>,
}

/// Derive a deterministic message id from an event's own unique id, so the
/// assembler never injects randomness of its own.
fn derive_message_id(event_uuid: &agentx_types::EventId) -> MessageId {
    let suffix = event_uuid
        .as_str()
        .strip_prefix(agentx_types::EventId::PREFIX)
        .unwrap_or(event_uuid.as_str());
    MessageId::from_raw(format!("{}{}", MessageId::PREFIX, suffix))
}

#[derive(Debug, Default)]
pub struct MessageAssembler {
    builder: Option<AssistantBuilder>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one Driver stream event, returning zero or more message
    /// events. Most stream events produce none (they only mutate the
    /// in-progress builder); `message_stop`, `interrupted` and `tool_result`
    /// each produce exactly one.
    pub fn handle(&mut self, event: &StreamEvent) -> Vec<MessageEvent> {
        match event {
            StreamEvent::MessageStart {
                message_id,
                timestamp,
                ..
            } => {
                self.builder = Some(AssistantBuilder {
                    message_id: message_id.clone(),
                    timestamp: *timestamp,
                    parts: Vec::new(),
                    open_index: None,
                });
                vec![]
            }
            StreamEvent::TextContentBlockStart { .. } => {
                self.open_text_block();
                vec![]
            }
            StreamEvent::TextDelta { text, .. } => {
                self.append_text(text);
                vec![]
            }
            StreamEvent::TextContentBlockStop { .. } => {
                self.close_open_block();
                vec![]
            }
            StreamEvent::ToolUseContentBlockStart {
                tool_call_id,
                tool_name,
                ..
            } => {
                self.open_tool_block(tool_call_id.clone(), tool_name.clone());
                vec![]
            }
            StreamEvent::InputJsonDelta { partial_json, .. } => {
                self.append_tool_partial(partial_json);
                vec![]
            }
            StreamEvent::ToolUseContentBlockStop {
                tool_call_id,
                tool_name,
                input,
                ..
            } => {
                self.finalize_tool_block(tool_call_id, tool_name, input.clone());
                vec![]
            }
            StreamEvent::ToolCall {
                tool_call_id,
                tool_name,
                input,
                ..
            } => {
                self.confirm_tool_call(tool_call_id, tool_name, input.clone());
                vec![]
            }
            StreamEvent::MessageStop {
                uuid: _,
                stop_reason,
                ..
            } => self
                .seal(*stop_reason)
                .map(|m| vec![MessageEvent::AssistantMessage(m)])
                .unwrap_or_default(),
            StreamEvent::Interrupted { .. } => self
                .seal(StopReason::Interrupted)
                .map(|m| vec![MessageEvent::AssistantMessage(m)])
                .unwrap_or_default(),
            StreamEvent::ToolResult {
                uuid,
                timestamp,
                tool_call_id,
                result,
                is_error,
            } => {
                let output = ToolResultOutput::classify(result, *is_error);
                let message = Message::ToolResult {
                    id: derive_message_id(uuid),
                    timestamp: *timestamp,
                    tool_call_id: tool_call_id.clone(),
                    output,
                };
                vec![MessageEvent::ToolResultMessage(message)]
            }
        }
    }

    fn open_text_block(&mut self) {
        let Some(builder) = &mut self.builder else {
            warn!("text_content_block_start with no open assistant message");
            return;
        };
        builder.parts.push(PartBuilder::Text(String::new()));
        builder.open_index = Some(builder.parts.len() - 1);
    }

    fn append_text(&mut self, text: &str) {
        let Some(builder) = &mut self.builder else {
            warn!("text_delta with no open assistant message");
            return;
        };
        let needs_new_block = match builder.open_index.and_then(|i| builder.parts.get(i)) {
            Some(PartBuilder::Text(_)) => false,
            _ => true,
        };
        if needs_new_block {
            builder.parts.push(PartBuilder::Text(String::new()));
            builder.open_index = Some(builder.parts.len() - 1);
        }
        if let Some(PartBuilder::Text(buf)) = builder
            .open_index
            .and_then(|i| builder.parts.get_mut(i))
        {
            buf.push_str(text);
        }
    }

    fn close_open_block(&mut self) {
        if let Some(builder) = &mut self.builder {
            builder.open_index = None;
        }
    }

    fn open_tool_block(&mut self, id: ToolCallId, name: String) {
        let Some(builder) = &mut self.builder else {
            warn!("tool_use_content_block_start with no open assistant message");
            return;
        };
        builder.parts.push(PartBuilder::ToolUse {
            id,
            name,
            partial_json: String::new(),
            input: None,
        });
        builder.open_index = Some(builder.parts.len() - 1);
    }

    fn append_tool_partial(&mut self, partial: &str) {
        let Some(builder) = &mut self.builder else {
            warn!("input_json_delta with no open assistant message");
            return;
        };
        match builder.open_index.and_then(|i| builder.parts.get_mut(i)) {
            Some(PartBuilder::ToolUse { partial_json, .. }) => partial_json.push_str(partial),
            _ => warn!("input_json_delta with no open tool-use block"),
        }
    }

    fn find_tool_part_mut<'a>(
        parts: &'a mut [PartBuilder],
        id: &ToolCallId,
    ) -> Option<&'a mut PartBuilder> {
        parts.iter_mut().find(|p| matches!(p, PartBuilder::ToolUse { id: pid, .. } if pid == id))
    }

    fn finalize_tool_block(&mut self, id: &ToolCallId, name: &str, input: Value) {
        let Some(builder) = &mut self.builder else {
            warn!("tool_use_content_block_stop with no open assistant message");
            return;
        };
        match Self::find_tool_part_mut(&mut builder.parts, id) {
            Some(PartBuilder::ToolUse {
                input: slot, name: n, ..
            }) => {
                *n = name.to_string();
                *slot = Some(input);
            }
            _ => {
                builder.parts.push(PartBuilder::ToolUse {
                    id: id.clone(),
                    name: name.to_string(),
                    partial_json: String::new(),
                    input: Some(input),
                });
            }
        }
        if builder.open_index.and_then(|i| builder.parts.get(i)).map(|p| matches!(p, PartBuilder::ToolUse{ id: pid, .. } if pid == id)).unwrap_or(false) {
            builder.open_index = None;
        }
    }

    /// `tool_call` is an idempotent confirmation (spec §4.2): a no-op if
    /// already finalized by `..._stop`, otherwise finalizes (or creates) the
    /// part directly.
    fn confirm_tool_call(&mut self, id: &ToolCallId, name: &str, input: Value) {
        let Some(builder) = &mut self.builder else {
            warn!("tool_call with no open assistant message");
            return;
        };
        match Self::find_tool_part_mut(&mut builder.parts, id) {
            Some(PartBuilder::ToolUse { input: slot, .. }) if slot.is_some() => {
                // already finalized — idempotent no-op
            }
            Some(PartBuilder::ToolUse {
                input: slot, name: n, ..
            }) => {
                *n = name.to_string();
                *slot = Some(input);
            }
            _ => builder.parts.push(PartBuilder::ToolUse {
                id: id.clone(),
                name: name.to_string(),
                partial_json: String::new(),
                input: Some(input),
            }),
        }
    }

    fn seal(&mut self, stop_reason: StopReason) -> Option<Message> {
        let builder = self.builder.take()?;
        let parts = builder
            .parts
            .into_iter()
            .map(|part| match part {
                PartBuilder::Text(text) => AssistantContentPart::Text { text },
                PartBuilder::ToolUse {
                    id, name, input, ..
                } => {
                    let input = input.unwrap_or_else(|| {
                        warn!(tool_call_id = %id, "tool-call part finalized with no input; recording empty object");
                        Value::Object(Default::default())
                    });
                    AssistantContentPart::ToolCall { id, name, input }
                }
            })
            .collect();

        Some(Message::Assistant {
            id: builder.message_id,
            timestamp: builder.timestamp,
            content: AssistantContent::Parts(parts),
            stop_reason: Some(stop_reason.as_str().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentx_types::{AgentId, EventId};
    use chrono::Utc;

    fn evt_id() -> EventId {
        EventId::new()
    }

    #[test]
    fn plain_text_turn_assembles_single_text_part() {
        let mut assembler = MessageAssembler::new();
        let agent_id = AgentId::new();
        let message_id = MessageId::new();
        let ts = Utc::now();

        assert!(assembler
            .handle(&StreamEvent::MessageStart {
                uuid: evt_id(),
                agent_id: agent_id.clone(),
                timestamp: ts,
                message_id: message_id.clone(),
                model: "test-model".into(),
            })
            .is_empty());
        assembler.handle(&StreamEvent::TextContentBlockStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
        });
        assembler.handle(&StreamEvent::TextDelta {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            text: "Hi ".into(),
        });
        assembler.handle(&StreamEvent::TextDelta {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            text: "there".into(),
        });

        let events = assembler.handle(&StreamEvent::MessageStop {
            uuid: evt_id(),
            agent_id,
            timestamp: ts,
            stop_reason: StopReason::Stop,
        });

        assert_eq!(events.len(), 1);
        match &events[0] {
            MessageEvent::AssistantMessage(Message::Assistant {
                id, content, stop_reason, ..
            }) => {
                assert_eq!(*id, message_id);
                assert_eq!(content.text(), "Hi there");
                assert_eq!(stop_reason.as_deref(), Some("stop"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn text_delta_with_no_open_block_opens_one_implicitly() {
        let mut assembler = MessageAssembler::new();
        let agent_id = AgentId::new();
        let ts = Utc::now();
        assembler.handle(&StreamEvent::MessageStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            message_id: MessageId::new(),
            model: "m".into(),
        });
        assembler.handle(&StreamEvent::TextDelta {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            text: "implicit".into(),
        });
        let events = assembler.handle(&StreamEvent::MessageStop {
            uuid: evt_id(),
            agent_id,
            timestamp: ts,
            stop_reason: StopReason::Stop,
        });
        match &events[0] {
            MessageEvent::AssistantMessage(Message::Assistant { content, .. }) => {
                assert_eq!(content.text(), "implicit");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn tool_call_step_interleaves_text_and_tool_parts_in_order() {
        let mut assembler = MessageAssembler::new();
        let agent_id = AgentId::new();
        let ts = Utc::now();
        let call_id = ToolCallId::new();

        assembler.handle(&StreamEvent::MessageStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            message_id: MessageId::new(),
            model: "m".into(),
        });
        assembler.handle(&StreamEvent::TextContentBlockStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
        });
        assembler.handle(&StreamEvent::TextDelta {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            text: "let me check".into(),
        });
        assembler.handle(&StreamEvent::TextContentBlockStop {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
        });
        assembler.handle(&StreamEvent::ToolUseContentBlockStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            tool_call_id: call_id.clone(),
            tool_name: "bash".into(),
        });
        assembler.handle(&StreamEvent::InputJsonDelta {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            partial_json: "{\"command\":".into(),
        });
        assembler.handle(&StreamEvent::InputJsonDelta {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            partial_json: "\"echo hi\"}".into(),
        });
        assembler.handle(&StreamEvent::ToolUseContentBlockStop {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            tool_call_id: call_id.clone(),
            tool_name: "bash".into(),
            input: serde_json::json!({"command": "echo hi"}),
        });

        let events = assembler.handle(&StreamEvent::MessageStop {
            uuid: evt_id(),
            agent_id,
            timestamp: ts,
            stop_reason: StopReason::ToolCalls,
        });

        match &events[0] {
            MessageEvent::AssistantMessage(Message::Assistant {
                content, stop_reason, ..
            }) => {
                assert_eq!(stop_reason.as_deref(), Some("tool-calls"));
                let calls = content.tool_calls();
                assert_eq!(calls.len(), 1);
                let (id, name, input) = calls[0].as_tool_call().unwrap();
                assert_eq!(id, &call_id);
                assert_eq!(name, "bash");
                assert_eq!(input, &serde_json::json!({"command": "echo hi"}));
                match content {
                    AssistantContent::Parts(parts) => {
                        assert_eq!(parts.len(), 2);
                        assert!(matches!(parts[0], AssistantContentPart::Text { .. }));
                        assert!(matches!(parts[1], AssistantContentPart::ToolCall { .. }));
                    }
                    _ => panic!("expected parts"),
                }
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn idempotent_tool_call_confirmation_is_noop_after_stop() {
        let mut assembler = MessageAssembler::new();
        let agent_id = AgentId::new();
        let ts = Utc::now();
        let call_id = ToolCallId::new();

        assembler.handle(&StreamEvent::MessageStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            message_id: MessageId::new(),
            model: "m".into(),
        });
        assembler.handle(&StreamEvent::ToolUseContentBlockStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            tool_call_id: call_id.clone(),
            tool_name: "bash".into(),
        });
        assembler.handle(&StreamEvent::ToolUseContentBlockStop {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            tool_call_id: call_id.clone(),
            tool_name: "bash".into(),
            input: serde_json::json!({"x": 1}),
        });
        // Confirmation arrives with a *different* input — must be ignored,
        // since the block was already finalized by `..._stop`.
        assembler.handle(&StreamEvent::ToolCall {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            tool_call_id: call_id.clone(),
            tool_name: "bash".into(),
            input: serde_json::json!({"x": 999}),
        });

        let events = assembler.handle(&StreamEvent::MessageStop {
            uuid: evt_id(),
            agent_id,
            timestamp: ts,
            stop_reason: StopReason::ToolCalls,
        });
        match &events[0] {
            MessageEvent::AssistantMessage(Message::Assistant { content, .. }) => {
                let calls = content.tool_calls();
                let (_, _, input) = calls[0].as_tool_call().unwrap();
                assert_eq!(input, &serde_json::json!({"x": 1}));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn interrupted_seals_partial_message_with_interrupted_stop_reason() {
        let mut assembler = MessageAssembler::new();
        let agent_id = AgentId::new();
        let ts = Utc::now();

        assembler.handle(&StreamEvent::MessageStart {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            message_id: MessageId::new(),
            model: "m".into(),
        });
        assembler.handle(&StreamEvent::TextDelta {
            uuid: evt_id(),
            agent_id: agent_id.clone(),
            timestamp: ts,
            text: "partial".into(),
        });

        let events = assembler.handle(&StreamEvent::Interrupted {
            uuid: evt_id(),
            agent_id,
            timestamp: ts,
            reason: None,
        });

        assert_eq!(events.len(), 1);
        match &events[0] {
            MessageEvent::AssistantMessage(Message::Assistant {
                content, stop_reason, ..
            }) => {
                assert_eq!(content.text(), "partial");
                assert_eq!(stop_reason.as_deref(), Some("interrupted"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn interrupted_with_no_open_builder_is_a_noop() {
        let mut assembler = MessageAssembler::new();
        let events = assembler.handle(&StreamEvent::Interrupted {
            uuid: evt_id(),
            agent_id: AgentId::new(),
            timestamp: Utc::now(),
            reason: None,
        });
        assert!(events.is_empty());
    }

    #[test]
    fn tool_result_classifies_output_and_emits_independent_of_builder() {
        let mut assembler = MessageAssembler::new();
        let agent_id = AgentId::new();
        let ts = Utc::now();
        let call_id = ToolCallId::new();

        let events = assembler.handle(&StreamEvent::ToolResult {
            uuid: evt_id(),
            agent_id,
            timestamp: ts,
            tool_call_id: call_id.clone(),
            result: serde_json::json!("5"),
            is_error: false,
        });

        assert_eq!(events.len(), 1);
        match &events[0] {
            MessageEvent::ToolResultMessage(Message::ToolResult {
                tool_call_id,
                output,
                ..
            }) => {
                assert_eq!(*tool_call_id, call_id);
                assert_eq!(*output, ToolResultOutput::Text { value: "5".into() });
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    /// P5: identical stream-event sequences (including identical uuids)
    /// yield byte-identical message events from two independent assemblers.
    #[test]
    fn determinism_identical_input_yields_identical_output() {
        let agent_id = AgentId::new();
        let message_id = MessageId::new();
        let ts = Utc::now();
        let tool_result_uuid = evt_id();
        let call_id = ToolCallId::new();

        let events: Vec<StreamEvent> = vec![
            StreamEvent::MessageStart {
                uuid: evt_id(),
                agent_id: agent_id.clone(),
                timestamp: ts,
                message_id: message_id.clone(),
                model: "m".into(),
            },
            StreamEvent::TextDelta {
                uuid: evt_id(),
                agent_id: agent_id.clone(),
                timestamp: ts,
                text: "hi".into(),
            },
            StreamEvent::MessageStop {
                uuid: evt_id(),
                agent_id: agent_id.clone(),
                timestamp: ts,
                stop_reason: StopReason::Stop,
            },
            StreamEvent::ToolResult {
                uuid: tool_result_uuid.clone(),
                agent_id,
                timestamp: ts,
                tool_call_id: call_id,
                result: serde_json::json!({"ok": true}),
                is_error: false,
            },
        ];

        let run = |events: &[StreamEvent]| {
            let mut assembler = MessageAssembler::new();
            events
                .iter()
                .flat_map(|e| assembler.handle(e))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(&events), run(&events));
    }
}
