// SPDX-License-Identifier: MIT
//! Request/response correlation (spec §4.12/§5): every `*_request` frame
//! carries a `requestId`; a caller awaiting the matching `*_response` frame
//! registers a one-shot handler keyed by that id with a bounded timeout.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::events::WsEnvelope;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq)]
pub enum CorrelationError {
    #[error("timed out waiting for a response")]
    Timeout,
    #[error("the connection closed before a response arrived")]
    NetworkFailure,
}

/// Keyed registry of one-shot response handlers. Owned by one Channel.
#[derive(Default)]
pub struct RequestCorrelator {
    pending: Mutex<HashMap<String, oneshot::Sender<WsEnvelope>>>,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the response for `request_id`, waiting up to
    /// `timeout` before resolving to [`CorrelationError::Timeout`].
    pub async fn wait_for(&self, request_id: String, timeout: Duration) -> Result<WsEnvelope, CorrelationError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(request_id.clone(), tx);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(envelope)) => Ok(envelope),
            Ok(Err(_)) => Err(CorrelationError::NetworkFailure),
            Err(_) => {
                self.pending.lock().unwrap().remove(&request_id);
                Err(CorrelationError::Timeout)
            }
        }
    }

    /// Deliver an inbound `*_response` frame to its waiting caller, if any.
    /// Returns `true` if a waiter was found and notified.
    pub fn resolve(&self, envelope: WsEnvelope) -> bool {
        let Some(request_id) = envelope.request_id.clone() else {
            return false;
        };
        let Some(tx) = self.pending.lock().unwrap().remove(&request_id) else {
            return false;
        };
        tx.send(envelope).is_ok()
    }

    /// Drop every pending waiter, e.g. because the underlying Channel
    /// disconnected. Dropping the sender resolves the waiter's `rx` to a
    /// `RecvError`, surfaced as [`CorrelationError::NetworkFailure`].
    pub fn fail_all(&self) {
        self.pending.lock().unwrap().clear();
    }
}
