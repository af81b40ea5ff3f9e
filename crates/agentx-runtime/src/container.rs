// SPDX-License-Identifier: MIT
//! The Container (spec §4.10): a local registry of live Agents, each
//! backed by its own Driver instance seeded from an Image.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use agentx_image::{Image, Repository};
use agentx_types::{AgentId, ContainerId};

use crate::agent_instance::AgentInstance;

/// Constructs a fresh `Driver` binding for a newly-started Agent. Concrete
/// provider bindings are out of scope for this repository (spec §1); this
/// factory is how a caller supplies one (e.g. a `ScriptedDriver` in tests,
/// or a real provider binding in a downstream crate).
pub type DriverFactory = Arc<dyn Fn() -> Arc<dyn agentx_driver::Driver> + Send + Sync>;

/// Owns the live Agent set for one logical container (spec §4.10).
pub struct Container {
    pub container_id: ContainerId,
    repository: Arc<dyn Repository>,
    driver_factory: DriverFactory,
    agents: Mutex<HashMap<AgentId, Arc<AgentInstance>>>,
}

impl Container {
    pub fn new(container_id: ContainerId, repository: Arc<dyn Repository>, driver_factory: DriverFactory) -> Self {
        Self {
            container_id,
            repository,
            driver_factory,
            agents: Mutex::new(HashMap::new()),
        }
    }

    /// `run(image, ...)`: start a fresh Agent against `image` (spec §4.10).
    pub async fn run(&self, image: Image) -> Arc<AgentInstance> {
        let definition = image.definition.clone();
        self.repository.put_image(image.clone()).await;
        let image = Arc::new(Mutex::new(image));
        let driver = (self.driver_factory)();
        let agent = Arc::new(AgentInstance::new(
            self.container_id.clone(),
            definition,
            image,
            driver,
        ));
        self.agents.lock().unwrap().insert(agent.agent_id.clone(), agent.clone());
        agent
    }

    /// `resume(session, ...)`: identical to `run`, but the Driver is seeded
    /// with the Image's previously-persisted `driverState` so the provider
    /// resumes the same logical session. Since [`agentx_driver::ReceiveContext`]
    /// is built fresh from the shared Image on every `receive()` call, no
    /// extra wiring beyond handing the already-persisted Image is needed.
    pub async fn resume(&self, image: Image) -> Arc<AgentInstance> {
        self.run(image).await
    }

    pub fn get(&self, agent_id: &AgentId) -> Option<Arc<AgentInstance>> {
        self.agents.lock().unwrap().get(agent_id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<AgentInstance>> {
        self.agents.lock().unwrap().values().cloned().collect()
    }

    /// Flushes the agent's accumulated `image.messages`/`driverState` back
    /// to the Repository before tearing it down, so a later `resume` of the
    /// same image rebuilds the full prior history (spec §8 S5) rather than
    /// the empty message vec `run` originally persisted.
    pub async fn destroy(&self, agent_id: &AgentId) {
        let agent = self.agents.lock().unwrap().remove(agent_id);
        if let Some(agent) = agent {
            agent.destroy().await;
            let image = agent.image().lock().unwrap().clone();
            self.repository.put_image(image).await;
        }
    }

    pub async fn destroy_all(&self) {
        let ids: Vec<AgentId> = self.agents.lock().unwrap().keys().cloned().collect();
        for id in ids {
            self.destroy(&id).await;
        }
    }
}
