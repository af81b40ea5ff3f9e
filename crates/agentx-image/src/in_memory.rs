// SPDX-License-Identifier: MIT
//! A lock-based reference `Repository`, grounded in the teacher's
//! `sven-core::session::Session` (a single in-process store behind a
//! mutex). No disk I/O: state lives only as long as the process (spec §1
//! non-goal — durable storage is out of scope).
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use agentx_types::{ContainerId, Definition, ImageId, Message, SessionId};

use crate::model::{ContainerRecord, Image, SessionRecord};
use crate::repository::{Repository, RepositoryError};

#[derive(Default)]
struct Store {
    definitions: HashMap<String, Definition>,
    images: HashMap<ImageId, Image>,
    sessions: HashMap<SessionId, SessionRecord>,
    session_messages: HashMap<SessionId, Vec<Message>>,
    containers: HashMap<ContainerId, ContainerRecord>,
}

/// An `Arc`-free, process-lifetime `Repository`. Cloning shares the same
/// underlying store (cheap handle), matching how the teacher hands out
/// session stores to its command handlers.
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn put_definition(&self, definition: Definition) {
        self.store.lock().unwrap().definitions.insert(definition.name.clone(), definition);
    }

    async fn get_definition(&self, name: &str) -> Result<Definition, RepositoryError> {
        self.store
            .lock()
            .unwrap()
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| RepositoryError::DefinitionNotFound(name.to_string()))
    }

    async fn list_definitions(&self) -> Vec<Definition> {
        self.store.lock().unwrap().definitions.values().cloned().collect()
    }

    async fn delete_definition(&self, name: &str) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        store
            .definitions
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::DefinitionNotFound(name.to_string()))
    }

    async fn put_image(&self, image: Image) {
        self.store.lock().unwrap().images.insert(image.image_id.clone(), image);
    }

    async fn get_image(&self, id: &ImageId) -> Result<Image, RepositoryError> {
        self.store
            .lock()
            .unwrap()
            .images
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::ImageNotFound(id.clone()))
    }

    async fn list_images(&self) -> Vec<Image> {
        self.store.lock().unwrap().images.values().cloned().collect()
    }

    async fn delete_image(&self, id: &ImageId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if !store.images.contains_key(id) {
            return Err(RepositoryError::ImageNotFound(id.clone()));
        }
        if store.sessions.values().any(|s| &s.image_id == id) {
            return Err(RepositoryError::ImageHasSessions(id.clone()));
        }
        store.images.remove(id);
        Ok(())
    }

    async fn append_image_message(&self, id: &ImageId, message: Message) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let image = store.images.get_mut(id).ok_or_else(|| RepositoryError::ImageNotFound(id.clone()))?;
        image.messages.push(message);
        Ok(())
    }

    async fn set_driver_state(&self, id: &ImageId, state: serde_json::Value) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let image = store.images.get_mut(id).ok_or_else(|| RepositoryError::ImageNotFound(id.clone()))?;
        image.driver_state = state;
        Ok(())
    }

    async fn put_session(&self, session: SessionRecord) {
        let mut store = self.store.lock().unwrap();
        store.session_messages.entry(session.session_id.clone()).or_default();
        store.sessions.insert(session.session_id.clone(), session);
    }

    async fn get_session(&self, id: &SessionId) -> Result<SessionRecord, RepositoryError> {
        self.store
            .lock()
            .unwrap()
            .sessions
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::SessionNotFound(id.clone()))
    }

    async fn list_sessions(&self) -> Vec<SessionRecord> {
        self.store.lock().unwrap().sessions.values().cloned().collect()
    }

    async fn list_sessions_for_image(&self, image_id: &ImageId) -> Vec<SessionRecord> {
        self.store
            .lock()
            .unwrap()
            .sessions
            .values()
            .filter(|s| &s.image_id == image_id)
            .cloned()
            .collect()
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        store
            .sessions
            .remove(id)
            .ok_or_else(|| RepositoryError::SessionNotFound(id.clone()))?;
        store.session_messages.remove(id);
        Ok(())
    }

    async fn set_session_title(&self, id: &SessionId, title: String) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        let session = store.sessions.get_mut(id).ok_or_else(|| RepositoryError::SessionNotFound(id.clone()))?;
        session.title = Some(title);
        session.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn append_session_message(&self, id: &SessionId, message: Message) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        if !store.sessions.contains_key(id) {
            return Err(RepositoryError::SessionNotFound(id.clone()));
        }
        store.session_messages.entry(id.clone()).or_default().push(message);
        Ok(())
    }

    async fn get_session_messages(&self, id: &SessionId) -> Result<Vec<Message>, RepositoryError> {
        let store = self.store.lock().unwrap();
        if !store.sessions.contains_key(id) {
            return Err(RepositoryError::SessionNotFound(id.clone()));
        }
        Ok(store.session_messages.get(id).cloned().unwrap_or_default())
    }

    async fn put_container(&self, container: ContainerRecord) {
        self.store.lock().unwrap().containers.insert(container.container_id.clone(), container);
    }

    async fn get_container(&self, id: &ContainerId) -> Result<ContainerRecord, RepositoryError> {
        self.store
            .lock()
            .unwrap()
            .containers
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::ContainerNotFound(id.clone()))
    }

    async fn list_containers(&self) -> Vec<ContainerRecord> {
        self.store.lock().unwrap().containers.values().cloned().collect()
    }

    async fn delete_container(&self, id: &ContainerId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().unwrap();
        store
            .containers
            .remove(id)
            .ok_or_else(|| RepositoryError::ContainerNotFound(id.clone()))?;
        let dead: Vec<SessionId> = store
            .sessions
            .values()
            .filter(|s| &s.container_id == id)
            .map(|s| s.session_id.clone())
            .collect();
        for session_id in dead {
            store.sessions.remove(&session_id);
            store.session_messages.remove(&session_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentx_types::Message;

    fn repo() -> InMemoryRepository {
        InMemoryRepository::new()
    }

    #[tokio::test]
    async fn definition_round_trips() {
        let repo = repo();
        repo.put_definition(Definition::new("assistant")).await;
        let got = repo.get_definition("assistant").await.unwrap();
        assert_eq!(got.name, "assistant");
        assert!(matches!(
            repo.get_definition("missing").await,
            Err(RepositoryError::DefinitionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn image_round_trips_and_append() {
        let repo = repo();
        let image = Image::from_definition(Definition::new("assistant"));
        let id = image.image_id.clone();
        repo.put_image(image).await;

        repo.append_image_message(&id, Message::user("hi")).await.unwrap();
        let got = repo.get_image(&id).await.unwrap();
        assert_eq!(got.messages.len(), 1);
    }

    #[tokio::test]
    async fn deleting_image_with_sessions_is_forbidden() {
        let repo = repo();
        let image = Image::from_definition(Definition::new("assistant"));
        let image_id = image.image_id.clone();
        repo.put_image(image).await;

        let container = ContainerRecord::new(serde_json::Value::Null);
        let container_id = container.container_id.clone();
        repo.put_container(container).await;

        let session = SessionRecord::new(container_id, image_id.clone());
        repo.put_session(session).await;

        assert!(matches!(
            repo.delete_image(&image_id).await,
            Err(RepositoryError::ImageHasSessions(_))
        ));
    }

    #[tokio::test]
    async fn deleting_session_cascades_its_messages() {
        let repo = repo();
        let image = Image::from_definition(Definition::new("assistant"));
        let image_id = image.image_id.clone();
        repo.put_image(image).await;
        let container = ContainerRecord::new(serde_json::Value::Null);
        let container_id = container.container_id.clone();
        repo.put_container(container).await;

        let session = SessionRecord::new(container_id, image_id);
        let session_id = session.session_id.clone();
        repo.put_session(session).await;
        repo.append_session_message(&session_id, Message::user("hi")).await.unwrap();

        repo.delete_session(&session_id).await.unwrap();
        assert!(matches!(
            repo.get_session_messages(&session_id).await,
            Err(RepositoryError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_container_cascades_its_sessions() {
        let repo = repo();
        let image = Image::from_definition(Definition::new("assistant"));
        let image_id = image.image_id.clone();
        repo.put_image(image).await;
        let container = ContainerRecord::new(serde_json::Value::Null);
        let container_id = container.container_id.clone();
        repo.put_container(container).await;

        let session = SessionRecord::new(container_id.clone(), image_id);
        let session_id = session.session_id.clone();
        repo.put_session(session).await;

        repo.delete_container(&container_id).await.unwrap();
        assert!(matches!(
            repo.get_session(&session_id).await,
            Err(RepositoryError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn fork_independence_across_repository_storage() {
        let repo = repo();
        let mut image = Image::from_definition(Definition::new("assistant"));
        image.messages.push(Message::user("hi"));
        let parent_id = image.image_id.clone();
        repo.put_image(image).await;

        let parent = repo.get_image(&parent_id).await.unwrap();
        let forked = parent.fork();
        let forked_id = forked.image_id.clone();
        repo.put_image(forked).await;

        repo.append_image_message(&forked_id, Message::user("only on fork")).await.unwrap();

        let parent_after = repo.get_image(&parent_id).await.unwrap();
        let forked_after = repo.get_image(&forked_id).await.unwrap();
        assert_eq!(parent_after.messages.len(), 1);
        assert_eq!(forked_after.messages.len(), 2);
    }
}
