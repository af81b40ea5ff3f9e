// SPDX-License-Identifier: MIT
//! A deterministic, pre-scripted [`Driver`] for tests and demos.
//!
//! Grounded on the teacher's `ScriptedMockProvider`: each call to `receive`
//! pops the next script (an ordered list of [`StreamEvent`]s) from an
//! internal queue and replays it verbatim. This is not a production LLM
//! binding — the real provider bindings remain out of scope (spec §1) —
//! it exists purely so the Engine/Runtime can be exercised end-to-end
//! without network access.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use agentx_types::{AgentId, EventId, Message};

use crate::driver::{Driver, ReceiveContext, StreamReceiver};
use crate::error::DriverError;
use crate::stream_event::StreamEvent;

/// Replays a fixed sequence of scripted turns, one per `receive()` call.
pub struct ScriptedDriver {
    scripts: Arc<Mutex<VecDeque<Vec<StreamEvent>>>>,
    interrupted: Arc<AtomicBool>,
    last_cursor: Arc<Mutex<Value>>,
}

impl ScriptedDriver {
    /// `scripts[i]` is the event sequence replayed on the `i`-th `receive()`
    /// call. Each inner `Vec` should already be ordered and, per the §4.1
    /// ordering contract, must emit `message_stop` before any `tool_result`.
    pub fn new(scripts: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            interrupted: Arc::new(AtomicBool::new(false)),
            last_cursor: Arc::new(Mutex::new(Value::Null)),
        }
    }

    /// The driver_state cursor most recently persisted via [`CursorSink`].
    pub async fn last_cursor(&self) -> Value {
        self.last_cursor.lock().await.clone()
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn receive(
        &self,
        _user_message: Message,
        context: ReceiveContext,
    ) -> Result<StreamReceiver, DriverError> {
        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .ok_or(DriverError::ScriptExhausted)?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        self.interrupted.store(false, Ordering::SeqCst);
        let interrupted = self.interrupted.clone();
        let last_cursor = self.last_cursor.clone();
        let agent_id = context.agent_id.clone();
        let cursor_sink = context.cursor_sink.clone();
        let turn_index = context.history.len();

        tokio::spawn(async move {
            for event in script {
                if interrupted.load(Ordering::SeqCst) {
                    let _ = tx
                        .send(StreamEvent::Interrupted {
                            uuid: EventId::new(),
                            agent_id: agent_id.clone(),
                            timestamp: chrono::Utc::now(),
                            reason: Some("interrupted by caller".into()),
                        })
                        .await;
                    return;
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            let cursor = serde_json::json!({ "turn": turn_index });
            *last_cursor.lock().await = cursor.clone();
            cursor_sink.persist(cursor);
        });

        Ok(rx)
    }

    async fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::CursorSink;
    use agentx_types::Definition;

    fn ctx(agent_id: AgentId) -> ReceiveContext {
        ReceiveContext {
            agent_id,
            definition: Definition::new("test"),
            history: vec![],
            driver_state: Value::Null,
            cursor_sink: CursorSink::discard(),
        }
    }

    fn text_event(agent_id: &AgentId, text: &str) -> StreamEvent {
        StreamEvent::TextDelta {
            uuid: EventId::new(),
            agent_id: agent_id.clone(),
            timestamp: chrono::Utc::now(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn replays_scripts_in_order() {
        let agent_id = AgentId::new();
        let driver = ScriptedDriver::new(vec![
            vec![text_event(&agent_id, "first")],
            vec![text_event(&agent_id, "second")],
        ]);

        let mut rx = driver
            .receive(Message::user("a"), ctx(agent_id.clone()))
            .await
            .unwrap();
        let ev = rx.recv().await.unwrap();
        assert!(matches!(ev, StreamEvent::TextDelta { text, .. } if text == "first"));

        let mut rx2 = driver
            .receive(Message::user("b"), ctx(agent_id))
            .await
            .unwrap();
        let ev2 = rx2.recv().await.unwrap();
        assert!(matches!(ev2, StreamEvent::TextDelta { text, .. } if text == "second"));
    }

    #[tokio::test]
    async fn exhausted_scripts_error() {
        let agent_id = AgentId::new();
        let driver = ScriptedDriver::new(vec![]);
        let result = driver.receive(Message::user("a"), ctx(agent_id)).await;
        assert!(matches!(result, Err(DriverError::ScriptExhausted)));
    }

    #[tokio::test]
    async fn interrupt_yields_interrupted_event() {
        let agent_id = AgentId::new();
        // A long script; we interrupt before draining it.
        let driver = ScriptedDriver::new(vec![vec![
            text_event(&agent_id, "one"),
            text_event(&agent_id, "two"),
            text_event(&agent_id, "three"),
        ]]);
        let mut rx = driver
            .receive(Message::user("a"), ctx(agent_id))
            .await
            .unwrap();
        let _ = rx.recv().await.unwrap();
        driver.interrupt().await;
        // Drain until we see Interrupted or the channel closes.
        let mut saw_interrupted = false;
        while let Some(ev) = rx.recv().await {
            if matches!(ev, StreamEvent::Interrupted { .. }) {
                saw_interrupted = true;
                break;
            }
        }
        assert!(saw_interrupted);
    }

    #[tokio::test]
    async fn cursor_is_persisted_after_successful_script() {
        let agent_id = AgentId::new();
        let driver = ScriptedDriver::new(vec![vec![text_event(&agent_id, "hi")]]);
        let mut rx = driver
            .receive(Message::user("a"), ctx(agent_id))
            .await
            .unwrap();
        while rx.recv().await.is_some() {}
        assert_ne!(driver.last_cursor().await, Value::Null);
    }
}
