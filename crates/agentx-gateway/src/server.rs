// SPDX-License-Identifier: MIT
//! Assembles the HTTP + WebSocket router and serves it (spec §6.1/§6.2),
//! grounded in the teacher's `sven-gateway::http::serve` / `gateway::run`
//! startup shape, minus the P2P/Slack/TLS subsystems that are out of scope
//! here (auth is an explicit Non-goal, spec §1).
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::config::GatewayConfig;
use crate::state::GatewayState;
use crate::ws::ws_handler;

pub fn build_router(state: GatewayState) -> Router {
    crate::http::router()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Bind and serve until the process is asked to stop. Blocks the caller.
pub async fn serve(config: &GatewayConfig, state: GatewayState) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    info!(%addr, "starting agentx gateway");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
