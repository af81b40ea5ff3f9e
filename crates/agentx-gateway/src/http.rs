// SPDX-License-Identifier: MIT
//! The HTTP control surface (spec §6.1): stateless JSON resources layered
//! over the same Repository/Container/SessionManager the WebSocket channel
//! uses, routed with `axum::Router` (teacher pattern: `sven-gateway::http`).
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use agentx_image::{ContainerRecord, Image, SessionRecord};
use agentx_types::{AgentId, ContainerId, Definition, ImageId, SessionId};

use crate::error::GatewayError;
use crate::state::{GatewayState, PLATFORM_NAME, PLATFORM_VERSION};

/// Builds the HTTP route table. The caller (see [`crate::server::build_router`])
/// attaches the WebSocket route and calls `with_state` exactly once so both
/// surfaces share one `Router<GatewayState>`.
pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/info", get(info))
        .route("/health", get(health))
        .route("/definitions", get(list_definitions).put(put_definition))
        .route("/definitions/:name", get(get_definition).delete(delete_definition))
        .route("/images", get(list_images).put(put_image))
        .route("/images/:id", get(get_image).delete(delete_image))
        .route("/images/:id/run", post(run_image))
        .route("/sessions", get(list_sessions).put(put_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/resume", post(resume_session))
        .route("/sessions/:id/messages", get(session_messages))
        .route("/agents", get(list_agents))
        .route("/agents/:id", get(get_agent).delete(delete_agent))
        .route("/agents/:id/messages", post(send_agent_message))
        .route("/agents/:id/interrupt", post(interrupt_agent))
        .route("/containers", get(list_containers).post(create_container))
        .route("/containers/:id", get(get_container).delete(delete_container))
        .layer(tower_http::cors::CorsLayer::permissive())
}

// ── Platform ────────────────────────────────────────────────────────────────

async fn info(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "platform": PLATFORM_NAME,
        "version": PLATFORM_VERSION,
        "agentCount": state.agent_count(),
    }))
}

async fn health(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "agentCount": state.agent_count(),
    }))
}

// ── Definitions ───────────────────────────────────────────────────────────────

async fn list_definitions(State(state): State<GatewayState>) -> Json<Vec<Definition>> {
    Json(state.repository.list_definitions().await)
}

async fn get_definition(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> Result<Json<Definition>, GatewayError> {
    Ok(Json(state.repository.get_definition(&name).await?))
}

async fn put_definition(
    State(state): State<GatewayState>,
    Json(definition): Json<Definition>,
) -> (StatusCode, Json<Definition>) {
    state.repository.put_definition(definition.clone()).await;
    (StatusCode::CREATED, Json(definition))
}

async fn delete_definition(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> Result<StatusCode, GatewayError> {
    state.repository.delete_definition(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Images ────────────────────────────────────────────────────────────────────

async fn list_images(State(state): State<GatewayState>) -> Json<Vec<Image>> {
    Json(state.repository.list_images().await)
}

async fn get_image(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Image>, GatewayError> {
    Ok(Json(state.repository.get_image(&ImageId::from_raw(id)).await?))
}

async fn put_image(
    State(state): State<GatewayState>,
    Json(image): Json<Image>,
) -> (StatusCode, Json<Image>) {
    state.repository.put_image(image.clone()).await;
    (StatusCode::CREATED, Json(image))
}

async fn delete_image(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, GatewayError> {
    state.repository.delete_image(&ImageId::from_raw(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    #[serde(default)]
    container_id: Option<String>,
}

async fn run_image(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(req): Json<RunRequest>,
) -> Result<Json<Value>, GatewayError> {
    let image = state.repository.get_image(&ImageId::from_raw(id)).await?;
    // This gateway process owns exactly one live Container; an explicit
    // containerId is accepted for wire compatibility but not yet routable.
    let _container_id = req.container_id.map(ContainerId::from_raw);
    let agent = state.container.run(image).await;
    state.watch_agent(&agent);
    Ok(Json(json!({ "agentId": agent.agent_id, "containerId": agent.container_id })))
}

// ── Sessions ────────────────────────────────────────────────────────────────

async fn list_sessions(State(state): State<GatewayState>) -> Json<Vec<SessionRecord>> {
    Json(state.repository.list_sessions().await)
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    image_id: String,
    container_id: String,
}

async fn put_session(
    State(state): State<GatewayState>,
    Json(req): Json<CreateSessionRequest>,
) -> (StatusCode, Json<SessionRecord>) {
    let session = state
        .session_manager
        .create(ImageId::from_raw(req.image_id), ContainerId::from_raw(req.container_id))
        .await;
    (StatusCode::CREATED, Json(session))
}

async fn get_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SessionRecord>, GatewayError> {
    Ok(Json(state.repository.get_session(&SessionId::from_raw(id)).await?))
}

async fn delete_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, GatewayError> {
    state.repository.delete_session(&SessionId::from_raw(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resume_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let session_id = SessionId::from_raw(id);
    let agent = state.session_manager.resume(&session_id).await?;
    state.watch_agent(&agent);
    Ok(Json(json!({ "agentId": agent.agent_id, "containerId": agent.container_id })))
}

async fn session_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let messages = state.session_manager.get_messages(&SessionId::from_raw(id)).await?;
    Ok(Json(json!({ "messages": messages })))
}

// ── Agents ────────────────────────────────────────────────────────────────────

async fn list_agents(State(state): State<GatewayState>) -> Json<Value> {
    let agents: Vec<Value> = state
        .container
        .list()
        .iter()
        .map(|a| json!({ "agentId": a.agent_id, "containerId": a.container_id, "state": format!("{:?}", a.state()) }))
        .collect();
    Json(json!({ "agents": agents }))
}

async fn get_agent(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let agent_id = AgentId::from_raw(id);
    let Some(agent) = state.container.get(&agent_id) else {
        return Err(GatewayError::NotFound(format!("agent not found: {agent_id}")));
    };
    Ok(Json(json!({
        "agentId": agent.agent_id,
        "containerId": agent.container_id,
        "state": format!("{:?}", agent.state()),
        "destroyed": agent.is_destroyed(),
    })))
}

async fn delete_agent(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> StatusCode {
    state.container.destroy(&AgentId::from_raw(id)).await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct SendMessageRequest {
    content: String,
}

/// Accepts the turn and returns immediately (202): the driver stream runs to
/// completion on a spawned task, its events reaching callers only through
/// the agent's bus (WebSocket outbound fan-out, `ErrorManager`) rather than
/// this response.
async fn send_agent_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), GatewayError> {
    let agent_id = AgentId::from_raw(id);
    let Some(agent) = state.container.get(&agent_id) else {
        return Err(GatewayError::NotFound(format!("agent not found: {agent_id}")));
    };
    tokio::spawn(async move {
        let _ = agent.receive(req.content).await;
    });
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "processing" }))))
}

async fn interrupt_agent(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    let agent_id = AgentId::from_raw(id);
    let Some(agent) = state.container.get(&agent_id) else {
        return Err(GatewayError::NotFound(format!("agent not found: {agent_id}")));
    };
    agent.interrupt().await;
    Ok(Json(json!({ "interrupted": true })))
}

// ── Containers ────────────────────────────────────────────────────────────────

async fn list_containers(State(state): State<GatewayState>) -> Json<Vec<ContainerRecord>> {
    Json(state.repository.list_containers().await)
}

async fn create_container(State(state): State<GatewayState>) -> (StatusCode, Json<ContainerRecord>) {
    let record = ContainerRecord::new(Value::Null);
    state.repository.put_container(record.clone()).await;
    (StatusCode::CREATED, Json(record))
}

async fn get_container(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ContainerRecord>, GatewayError> {
    Ok(Json(state.repository.get_container(&ContainerId::from_raw(id)).await?))
}

async fn delete_container(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<StatusCode, GatewayError> {
    let container_id = ContainerId::from_raw(id);
    // This gateway process runs exactly one live Container; only destroy
    // its live Agents when the request targets that same container.
    if container_id == state.container.container_id {
        state.container.destroy_all().await;
    }
    state.repository.delete_container(&container_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
