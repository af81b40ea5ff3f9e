// SPDX-License-Identifier: MIT
//! Persisted record shapes (spec §3, §6.5). Grounded in the layout of the
//! teacher's `sven-core::session::Session` (in-memory, message-vec-backed),
//! scaled up to the full record set spec.md names: a Definition is captured
//! by value into each Image, an Image owns the append-only message log a
//! Driver composes history from, and a Session is the user-facing handle
//! that may share an Image with other Sessions.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agentx_types::{ContainerId, Definition, ImageId, Message, SessionId};

/// `meta` images are built fresh from a Definition; `derived` images are
/// produced by `Session::fork` and record their parent (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    Meta,
    Derived,
}

/// The persistence unit of a conversation (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub image_id: ImageId,
    pub kind: ImageKind,
    pub definition_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_image_id: Option<ImageId>,
    pub definition: Definition,
    #[serde(default)]
    pub config: Value,
    /// Append-only; the Driver composes provider history from this.
    pub messages: Vec<Message>,
    /// Opaque dictionary the Driver owns for resume cursors.
    #[serde(default)]
    pub driver_state: Value,
    pub created_at: DateTime<Utc>,
}

impl Image {
    /// A fresh `meta` image built from a Definition, with empty history.
    pub fn from_definition(definition: Definition) -> Self {
        Self {
            image_id: ImageId::new(),
            kind: ImageKind::Meta,
            definition_name: definition.name.clone(),
            parent_image_id: None,
            definition,
            config: Value::Null,
            messages: Vec::new(),
            driver_state: Value::Null,
            created_at: Utc::now(),
        }
    }

    /// A `derived` image produced by forking `self`: copies messages by
    /// value and records the parent. The two images never share storage
    /// afterward (P9).
    pub fn fork(&self) -> Self {
        Self {
            image_id: ImageId::new(),
            kind: ImageKind::Derived,
            definition_name: self.definition_name.clone(),
            parent_image_id: Some(self.image_id.clone()),
            definition: self.definition.clone(),
            config: self.config.clone(),
            messages: self.messages.clone(),
            driver_state: self.driver_state.clone(),
            created_at: Utc::now(),
        }
    }
}

/// The user-facing handle to a conversation (spec §3). Multiple Sessions
/// may reference the same Image (shared history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub container_id: ContainerId,
    pub image_id: ImageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(container_id: ContainerId, image_id: ImageId) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            container_id,
            image_id,
            title: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The persisted Container record (spec §3) — distinct from the runtime
/// `Container` in `agentx-runtime`, which owns the live Agent set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub container_id: ContainerId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub config: Value,
}

impl ContainerRecord {
    pub fn new(config: Value) -> Self {
        Self {
            container_id: ContainerId::new(),
            created_at: Utc::now(),
            config,
        }
    }
}
