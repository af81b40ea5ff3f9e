// SPDX-License-Identifier: MIT
//! Process-wide gateway state: the shared Repository/Container/SessionManager
//! handles plus the platform-level outbound event fan-out that every
//! WebSocket connection's Effector reads from.
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use agentx_image::Repository;
use agentx_runtime::{AgentEvent, AgentInstance, Container, ErrorManager, SessionManager};
use agentx_types::AgentId;

pub const PLATFORM_NAME: &str = "agentx";
pub const PLATFORM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Broadcast capacity for the platform-wide outbound event fan-out. A slow
/// WebSocket reader that falls this far behind is told it lagged (spec
/// §4.12's effector drop-with-warning policy extended to backpressure).
const OUTBOUND_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct GatewayState {
    pub repository: Arc<dyn Repository>,
    pub container: Arc<Container>,
    pub session_manager: Arc<SessionManager>,
    pub error_manager: Arc<ErrorManager>,
    outbound: broadcast::Sender<(AgentId, AgentEvent)>,
    started_at: Arc<Instant>,
}

impl GatewayState {
    pub fn new(
        repository: Arc<dyn Repository>,
        container: Arc<Container>,
        session_manager: Arc<SessionManager>,
        error_manager: Arc<ErrorManager>,
    ) -> Self {
        let (outbound, _rx) = broadcast::channel(OUTBOUND_CAPACITY);
        Self {
            repository,
            container,
            session_manager,
            error_manager,
            outbound,
            started_at: Arc::new(Instant::now()),
        }
    }

    pub fn subscribe_outbound(&self) -> broadcast::Receiver<(AgentId, AgentEvent)> {
        self.outbound.subscribe()
    }

    /// Wire one Agent Instance's bus into the platform-wide fan-out, and
    /// into the platform [`ErrorManager`] (spec §7). Every route that
    /// starts or resumes an Agent through this gateway must call this.
    pub fn watch_agent(&self, agent: &Arc<AgentInstance>) {
        let agent_id = agent.agent_id.clone();
        let outbound = self.outbound.clone();
        let watched_id = agent_id.clone();
        agent.bus().on_any(move |event: &AgentEvent| {
            let _ = outbound.send((watched_id.clone(), event.clone()));
        });
        self.error_manager.watch(agent_id, agent.bus());
    }

    pub fn agent_count(&self) -> usize {
        self.container.list().len()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
