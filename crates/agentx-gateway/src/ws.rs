// SPDX-License-Identifier: MIT
//! The WebSocket event channel (spec §6.2). One upgraded connection owns
//! one [`Channel`]/[`Receptor`]/[`Effector`] triple and bridges JSON text
//! frames to/from the agent-level Event Bus, grounded in the teacher's
//! `sven-gateway::http::ws` bridge.
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use agentx_types::{AgentId, ImageId};

use crate::channel::{Channel, ConnectionState};
use crate::effector::Effector;
use crate::events::{agent_event_to_envelope, WsEnvelope};
use crate::receptor::Receptor;
use crate::state::GatewayState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: GatewayState) {
    let channel = Arc::new(Channel::new());
    channel.set_state(ConnectionState::Connecting);
    let effector = Effector::new(channel.clone());
    let mut outbound = state.subscribe_outbound();
    channel.set_state(ConnectionState::Connected);

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_inbound_frame(&state, &text).await {
                            send(&mut socket, reply).await;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(%err, "websocket recv error");
                        break;
                    }
                }
            }
            event = outbound.recv() => {
                match event {
                    Ok((agent_id, agent_event)) => {
                        let envelope = agent_event_to_envelope(&agent_id, &agent_event);
                        if let Some(envelope) = effector.accept(envelope) {
                            send(&mut socket, envelope).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(lagged = n, "websocket connection lagged behind the outbound event stream");
                        send(&mut socket, WsEnvelope::error(None, format!("event stream lagged by {n} events"))).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    channel.set_state(ConnectionState::Disconnecting);
    debug!("websocket connection closed");
}

async fn send(socket: &mut WebSocket, envelope: WsEnvelope) {
    if let Ok(text) = serde_json::to_string(&envelope) {
        let _ = socket.send(Message::Text(text)).await;
    }
}

/// Dispatches one inbound `*_request` frame (spec §6.2) and builds the
/// matching `*_response`. Malformed JSON yields an `error` frame instead of
/// closing the connection.
async fn handle_inbound_frame(state: &GatewayState, frame: &str) -> Option<WsEnvelope> {
    let envelope = match Receptor::parse(frame) {
        Ok(envelope) => envelope,
        Err(err) => return Some(WsEnvelope::error(None, format!("invalid JSON frame: {err}"))),
    };
    let request_id = envelope.request_id.clone();

    let result = dispatch_request(state, &envelope).await;
    match result {
        Ok((response_type, data)) => {
            let Some(request_id) = request_id else {
                return None;
            };
            Some(WsEnvelope::response(request_id, response_type, data))
        }
        Err(message) => Some(WsEnvelope::error(request_id, message)),
    }
}

async fn dispatch_request(state: &GatewayState, envelope: &WsEnvelope) -> Result<(&'static str, Value), String> {
    match envelope.event_type.as_str() {
        "agent_list_request" => {
            let agents: Vec<Value> = state
                .container
                .list()
                .iter()
                .map(|a| json!({ "agentId": a.agent_id, "containerId": a.container_id }))
                .collect();
            Ok(("agent_list_response", json!({ "agents": agents })))
        }
        "agent_destroy_request" => {
            let agent_id = string_field(&envelope.data, "agentId")?;
            state.container.destroy(&AgentId::from_raw(agent_id)).await;
            Ok(("agent_destroy_response", json!({ "destroyed": true })))
        }
        "agent_interrupt_request" => {
            let agent_id = AgentId::from_raw(string_field(&envelope.data, "agentId")?);
            let Some(agent) = state.container.get(&agent_id) else {
                return Err("agent not found".to_string());
            };
            agent.interrupt().await;
            Ok(("agent_interrupt_response", json!({ "interrupted": true })))
        }
        "agent_receive_request" => {
            let image_id = ImageId::from_raw(string_field(&envelope.data, "imageId")?);
            let content = string_field(&envelope.data, "content")?;
            let image = state.repository.get_image(&image_id).await.map_err(|e| e.to_string())?;
            let agent = state.container.run(image).await;
            state.watch_agent(&agent);
            agent.receive(content).await.map_err(|e| e.message)?;
            Ok(("agent_receive_response", json!({ "agentId": agent.agent_id })))
        }
        "image_list_request" => {
            let images: Vec<Value> = state
                .repository
                .list_images()
                .await
                .into_iter()
                .map(|img| json!({ "imageId": img.image_id, "definitionName": img.definition_name }))
                .collect();
            Ok(("image_list_response", json!({ "images": images })))
        }
        "image_resume_request" => {
            let image_id = ImageId::from_raw(string_field(&envelope.data, "imageId")?);
            let image = state.repository.get_image(&image_id).await.map_err(|e| e.to_string())?;
            let agent = state.container.resume(image).await;
            state.watch_agent(&agent);
            Ok(("image_resume_response", json!({ "agentId": agent.agent_id })))
        }
        "image_delete_request" => {
            let image_id = ImageId::from_raw(string_field(&envelope.data, "imageId")?);
            state.repository.delete_image(&image_id).await.map_err(|e| e.to_string())?;
            Ok(("image_delete_response", json!({ "deleted": true })))
        }
        "image_snapshot_request" => {
            let agent_id = AgentId::from_raw(string_field(&envelope.data, "agentId")?);
            let Some(agent) = state.container.get(&agent_id) else {
                return Err("agent not found".to_string());
            };
            let image = agent.image().lock().unwrap().clone();
            Ok(("image_snapshot_response", serde_json::to_value(image).unwrap_or(Value::Null)))
        }
        "user_message_request" => {
            let agent_id = AgentId::from_raw(string_field(&envelope.data, "agentId")?);
            let content = string_field(&envelope.data, "content")?;
            let Some(agent) = state.container.get(&agent_id) else {
                return Err("agent not found".to_string());
            };
            agent.receive(content).await.map_err(|e| e.message)?;
            Ok(("user_message_response", json!({ "status": "processing" })))
        }
        other => Err(format!("unrecognized request type: {other}")),
    }
}

fn string_field(data: &Value, field: &str) -> Result<String, String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("missing or non-string field: {field}"))
}
