// SPDX-License-Identifier: MIT
//! The platform-level ErrorManager (spec §7): observes every agent's error
//! stream, always logs, and fans out to pluggable handlers whose own
//! exceptions must not suppress subsequent handlers — reusing
//! [`agentx_bus::EventBus`]'s panic-isolated dispatch rather than
//! reimplementing fan-out.
use std::sync::Arc;

use tracing::warn;

use agentx_bus::EventBus;
use agentx_types::{AgentError, AgentId};

/// One observed agent error, tagged with which agent raised it.
#[derive(Debug, Clone)]
pub struct AgentErrorEvent {
    pub agent_id: AgentId,
    pub error: AgentError,
}

/// Server-only error sink. Register agents' Event Buses with
/// [`ErrorManager::watch`]; every `error` topic event is logged and fanned
/// out to registered handlers.
pub struct ErrorManager {
    bus: EventBus<AgentErrorEvent>,
}

impl Default for ErrorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorManager {
    pub fn new() -> Self {
        Self { bus: EventBus::new() }
    }

    /// Register an optional pluggable handler. A panicking handler is
    /// isolated by the underlying bus (P7/P8) and does not suppress later
    /// handlers or subsequent errors.
    pub fn register_handler(&self, handler: impl Fn(&AgentErrorEvent) + Send + Sync + 'static) {
        self.bus.on_any(handler);
    }

    /// Feed in one agent's error. Always logs, then fans out.
    pub fn observe(&self, agent_id: AgentId, error: AgentError) {
        warn!(
            agent_id = %agent_id,
            category = error.category(),
            code = error.code,
            "agent error observed"
        );
        self.bus.emit("error", AgentErrorEvent { agent_id, error });
    }

    /// Subscribe to an Agent Instance's bus and forward every `error` topic
    /// event here. Kept as an explicit wiring step (rather than automatic
    /// registration inside `AgentInstance`) so the platform composition
    /// root decides which agents are observed.
    pub fn watch(self: &Arc<Self>, agent_id: AgentId, agent_bus: &EventBus<crate::events::AgentEvent>) {
        let manager = self.clone();
        agent_bus.on("error", move |event: &crate::events::AgentEvent| {
            if let crate::events::AgentEvent::Error(error) = event {
                manager.observe(agent_id.clone(), error.clone());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn observe_always_logs_and_fans_out_to_handlers() {
        let manager = ErrorManager::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        manager.register_handler(move |_e| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        manager.observe(AgentId::new(), AgentError::timeout("slow"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    /// A panicking handler must not suppress delivery to other handlers or
    /// to later errors.
    #[test]
    fn panicking_handler_does_not_suppress_others() {
        let manager = ErrorManager::new();
        let seen = Arc::new(AtomicUsize::new(0));

        manager.register_handler(|_e| panic!("boom"));
        let s = seen.clone();
        manager.register_handler(move |_e| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        manager.observe(AgentId::new(), AgentError::timeout("slow"));
        manager.observe(AgentId::new(), AgentError::timeout("slow again"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
