// SPDX-License-Identifier: MIT
//! The Session Manager (spec §4.11): session CRUD plus the message
//! collector that projects an Agent's bus events into persisted
//! `MessageRecord`s.
use std::sync::Arc;

use thiserror::Error;

use agentx_image::{Image, Repository, RepositoryError, SessionRecord};
use agentx_types::{ContainerId, ImageId, Message, SessionId};

use crate::container::Container;
use crate::events::AgentEvent;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Subscribes an Agent's bus to the four message-event topics and persists
/// each one against a session as it arrives (spec §4.11). Held for the
/// lifetime of the subscription; dropping it does not unsubscribe — the
/// bus is torn down by the Agent's own `destroy()` instead.
const MESSAGE_TOPICS: [&str; 4] = [
    "user_message",
    "assistant_message",
    "tool_call_message",
    "tool_result_message",
];

pub struct SessionManager {
    repository: Arc<dyn Repository>,
    container: Arc<Container>,
}

impl SessionManager {
    pub fn new(repository: Arc<dyn Repository>, container: Arc<Container>) -> Self {
        Self { repository, container }
    }

    /// `create(imageId, containerId) -> Session`: allocate id, persist.
    pub async fn create(&self, image_id: ImageId, container_id: ContainerId) -> SessionRecord {
        let session = SessionRecord::new(container_id, image_id);
        self.repository.put_session(session.clone()).await;
        session
    }

    /// `resume({containerId?}) -> Agent`: start the session's Image in the
    /// container and attach the message collector.
    pub async fn resume(&self, session_id: &SessionId) -> Result<Arc<crate::agent_instance::AgentInstance>, SessionError> {
        let session = self.repository.get_session(session_id).await?;
        let image = self.repository.get_image(&session.image_id).await?;
        let agent = self.container.resume(image).await;
        self.attach_message_collector(agent.clone(), session.session_id.clone());
        Ok(agent)
    }

    fn attach_message_collector(&self, agent: Arc<crate::agent_instance::AgentInstance>, session_id: SessionId) {
        let repository = self.repository.clone();
        for topic in MESSAGE_TOPICS {
            let repository = repository.clone();
            let session_id = session_id.clone();
            agent.bus().on(topic, move |event: &AgentEvent| {
                let AgentEvent::Engine(agentx_engine::EngineOutput::Message(message_event)) = event else {
                    return;
                };
                let repository = repository.clone();
                let session_id = session_id.clone();
                let message = message_event.message().clone();
                tokio::spawn(async move {
                    if let Err(err) = repository.append_session_message(&session_id, message).await {
                        tracing::warn!(%session_id, %err, "message collector: failed to persist message");
                    }
                });
            });
        }
    }

    /// `fork() -> Session`: atomic deep-copy of the source Image into a new
    /// derived Image, plus a new Session pointing at it (P9).
    pub async fn fork(&self, session_id: &SessionId) -> Result<SessionRecord, SessionError> {
        let source_session = self.repository.get_session(session_id).await?;
        let source_image = self.repository.get_image(&source_session.image_id).await?;
        let forked_image = source_image.fork();
        let forked_image_id = forked_image.image_id.clone();
        self.repository.put_image(forked_image).await;

        let mut forked_session = SessionRecord::new(source_session.container_id.clone(), forked_image_id);
        let title = source_session.title.clone().unwrap_or_else(|| "Untitled".to_string());
        forked_session.title = Some(format!("Fork of {title}"));
        self.repository.put_session(forked_session.clone()).await;

        let source_messages = self.repository.get_session_messages(session_id).await?;
        for message in source_messages {
            self.repository
                .append_session_message(&forked_session.session_id, message)
                .await?;
        }

        Ok(forked_session)
    }

    /// `getMessages() -> ordered[Message]`: reads the Repository, returns
    /// chronological order (the Repository already appends in order).
    pub async fn get_messages(&self, session_id: &SessionId) -> Result<Vec<Message>, SessionError> {
        Ok(self.repository.get_session_messages(session_id).await?)
    }

    /// `setTitle(title)`: updates the persisted record.
    pub async fn set_title(&self, session_id: &SessionId, title: String) -> Result<(), SessionError> {
        self.repository.set_session_title(session_id, title).await?;
        Ok(())
    }

    pub async fn image_for(&self, image_id: &ImageId) -> Result<Image, SessionError> {
        Ok(self.repository.get_image(image_id).await?)
    }
}
