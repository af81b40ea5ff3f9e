// SPDX-License-Identifier: MIT
//! The `Repository` contract (spec §6.1/§6.5): key-addressed persistence
//! for Definitions, Images, Sessions, and Containers, plus the per-session
//! Message projection the `/sessions/:id/messages` route and the message
//! collector (spec §4.11) read and write.
//!
//! This crate ships only the contract and an in-memory reference
//! implementation (`InMemoryRepository`) — the disk-backed production store
//! is out of scope (spec §1).
use async_trait::async_trait;
use thiserror::Error;

use agentx_types::{ContainerId, ImageId, Message, SessionId};

use crate::model::{ContainerRecord, Image, SessionRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("definition not found: {0}")]
    DefinitionNotFound(String),
    #[error("image not found: {0}")]
    ImageNotFound(ImageId),
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("container not found: {0}")]
    ContainerNotFound(ContainerId),
    #[error("cannot delete image {0}: sessions still reference it")]
    ImageHasSessions(ImageId),
}

/// Referential-integrity rules (spec §6.5) are documented here rather than
/// enforced generically by the trait signature, since they span multiple
/// record kinds: callers (chiefly `SessionManager`) are responsible for
/// invoking deletes in an order that satisfies them.
///
/// - Deleting a Session cascades to its own Message projection rows.
/// - Deleting an Image whose Sessions still exist is forbidden
///   (`ImageHasSessions`).
/// - Deleting a Container is the runtime's responsibility to pair with
///   destroying its live Agents; this trait only cascades to the
///   Container's own Sessions.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn put_definition(&self, definition: agentx_types::Definition);
    async fn get_definition(&self, name: &str) -> Result<agentx_types::Definition, RepositoryError>;
    async fn list_definitions(&self) -> Vec<agentx_types::Definition>;
    async fn delete_definition(&self, name: &str) -> Result<(), RepositoryError>;

    async fn put_image(&self, image: Image);
    async fn get_image(&self, id: &ImageId) -> Result<Image, RepositoryError>;
    async fn list_images(&self) -> Vec<Image>;
    /// Fails with [`RepositoryError::ImageHasSessions`] if any Session still
    /// points at this image.
    async fn delete_image(&self, id: &ImageId) -> Result<(), RepositoryError>;
    async fn append_image_message(&self, id: &ImageId, message: Message) -> Result<(), RepositoryError>;
    async fn set_driver_state(&self, id: &ImageId, state: serde_json::Value) -> Result<(), RepositoryError>;

    async fn put_session(&self, session: SessionRecord);
    async fn get_session(&self, id: &SessionId) -> Result<SessionRecord, RepositoryError>;
    async fn list_sessions(&self) -> Vec<SessionRecord>;
    async fn list_sessions_for_image(&self, image_id: &ImageId) -> Vec<SessionRecord>;
    /// Cascades: deletes this session's Message projection rows too.
    async fn delete_session(&self, id: &SessionId) -> Result<(), RepositoryError>;
    async fn set_session_title(&self, id: &SessionId, title: String) -> Result<(), RepositoryError>;

    async fn append_session_message(&self, id: &SessionId, message: Message) -> Result<(), RepositoryError>;
    async fn get_session_messages(&self, id: &SessionId) -> Result<Vec<Message>, RepositoryError>;

    async fn put_container(&self, container: ContainerRecord);
    async fn get_container(&self, id: &ContainerId) -> Result<ContainerRecord, RepositoryError>;
    async fn list_containers(&self) -> Vec<ContainerRecord>;
    /// Cascades: deletes every Session (and its Messages) owned by this
    /// container. Destroying the container's *live* Agents is the
    /// runtime's job, done before calling this.
    async fn delete_container(&self, id: &ContainerId) -> Result<(), RepositoryError>;
}
