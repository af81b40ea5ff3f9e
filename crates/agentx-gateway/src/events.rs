// SPDX-License-Identifier: MIT
//! The WebSocket frame envelope and event catalog (spec §6.2).
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use agentx_driver::StreamEvent;
use agentx_engine::{EngineOutput, StateEvent, TurnEvent};
use agentx_runtime::AgentEvent;
use agentx_types::{AgentError, AgentId};

/// `{ type, uuid, agentId?, timestamp, data, requestId?, context? }` exactly
/// as specified in §6.2.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub timestamp: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EventContext>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl WsEnvelope {
    pub fn outbound(event_type: impl Into<String>, agent_id: Option<&AgentId>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            uuid: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.map(|id| id.to_string()),
            timestamp: Utc::now().timestamp_millis(),
            data,
            request_id: None,
            context: None,
        }
    }

    pub fn response(request_id: String, event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            uuid: uuid::Uuid::new_v4().to_string(),
            agent_id: None,
            timestamp: Utc::now().timestamp_millis(),
            data,
            request_id: Some(request_id),
            context: None,
        }
    }

    pub fn error(request_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            event_type: "error".to_string(),
            uuid: uuid::Uuid::new_v4().to_string(),
            agent_id: None,
            timestamp: Utc::now().timestamp_millis(),
            data: json!({ "message": message.into() }),
            request_id,
            context: None,
        }
    }
}

/// Translates one Agent Instance bus event into an outbound wire frame
/// (spec §6.2: "all Stream events, State events, Message events, Turn
/// events, and independent error events").
pub fn agent_event_to_envelope(agent_id: &AgentId, event: &AgentEvent) -> WsEnvelope {
    match event {
        AgentEvent::Engine(output) => engine_output_to_envelope(agent_id, output),
        AgentEvent::Error(error) => WsEnvelope::outbound(
            "error",
            Some(agent_id),
            agent_error_data(error),
        ),
        AgentEvent::Destroyed => WsEnvelope::outbound("destroyed", Some(agent_id), Value::Null),
    }
}

fn engine_output_to_envelope(agent_id: &AgentId, output: &EngineOutput) -> WsEnvelope {
    let event_type = output.type_name().to_string();
    let data = match output {
        EngineOutput::Stream(stream_event) => stream_event_data(stream_event),
        EngineOutput::Message(message_event) => {
            serde_json::to_value(message_event.message()).unwrap_or(Value::Null)
        }
        EngineOutput::State(state_event) => state_event_data(state_event),
        EngineOutput::Turn(turn_event) => turn_event_data(turn_event),
    };
    WsEnvelope::outbound(event_type, Some(agent_id), data)
}

fn stream_event_data(event: &StreamEvent) -> Value {
    serde_json::to_value(event).unwrap_or(Value::Null)
}

fn state_event_data(event: &StateEvent) -> Value {
    match event {
        StateEvent::ToolPlanned { tool_call_id, tool_name } | StateEvent::ToolExecuting { tool_call_id, tool_name } => {
            json!({ "toolCallId": tool_call_id, "toolName": tool_name })
        }
        StateEvent::ToolCompleted { tool_call_id } | StateEvent::ToolFailed { tool_call_id } => {
            json!({ "toolCallId": tool_call_id })
        }
        StateEvent::ConversationEnd { stop_reason } => json!({ "stopReason": stop_reason.as_str() }),
        StateEvent::ErrorOccurred { error } => agent_error_data(error),
        StateEvent::ConversationQueued
        | StateEvent::ConversationStart
        | StateEvent::ConversationResponding
        | StateEvent::ConversationThinking
        | StateEvent::ConversationInterrupted => Value::Null,
    }
}

fn turn_event_data(event: &TurnEvent) -> Value {
    match event {
        TurnEvent::TurnRequest { message } => json!({ "message": message }),
        TurnEvent::TurnResponse { request, transcript, stop_reason, token_usage } => json!({
            "request": request,
            "transcript": transcript,
            "stopReason": stop_reason.map(|r| r.as_str()),
            "approxTokens": token_usage.approx_total,
        }),
    }
}

fn agent_error_data(error: &AgentError) -> Value {
    json!({
        "category": error.category(),
        "code": error.code,
        "message": error.message,
        "recoverable": error.recoverable,
    })
}
