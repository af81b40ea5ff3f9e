// SPDX-License-Identifier: MIT
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use agentx_types::{AgentId, Definition, Message};

use crate::error::DriverError;
use crate::stream_event::StreamEvent;

/// Receiving half of the "lazy provider sequence" (spec §9): the Driver
/// is a producer task writing into this bounded channel; the Engine is the
/// consumer that drains it to completion.
pub type StreamReceiver = mpsc::Receiver<StreamEvent>;

/// Persists a Driver-produced resume cursor back into the owning Image.
///
/// Wired up by [`crate`]'s caller (the Container, spec §4.10) so the Driver
/// itself never needs to know about Images or Repositories.
#[derive(Clone)]
pub struct CursorSink(Arc<dyn Fn(Value) + Send + Sync>);

impl CursorSink {
    pub fn new(f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A sink that discards the cursor — useful for tests and ephemeral runs.
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    pub fn persist(&self, cursor: Value) {
        (self.0)(cursor)
    }
}

/// Everything a Driver needs to resume or start a turn (spec §4.1).
pub struct ReceiveContext {
    pub agent_id: AgentId,
    pub definition: Definition,
    /// The agent's full prior message history, in order.
    pub history: Vec<Message>,
    /// The opaque resume cursor previously persisted for this image, if any.
    pub driver_state: Value,
    pub cursor_sink: CursorSink,
}

/// The abstract boundary to an external LLM provider (spec §4.1).
///
/// Concrete provider bindings (Anthropic, OpenAI, ...) are out of scope for
/// this repository; this trait is the contract they must satisfy.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Compose history, invoke the provider, and return a channel of
    /// canonical [`StreamEvent`]s. Ordering contract (spec §4.1): if a step
    /// contains tool calls, `message_stop(tool-calls)` must be sent before
    /// the first `tool_result` of that step.
    async fn receive(
        &self,
        user_message: Message,
        context: ReceiveContext,
    ) -> Result<StreamReceiver, DriverError>;

    /// Cooperatively abort the in-flight turn. Must eventually cause an
    /// `Interrupted` event on the receiver, followed by channel closure.
    async fn interrupt(&self);
}
