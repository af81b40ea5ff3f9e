// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver receive failed: {0}")]
    ReceiveFailed(String),

    #[error("driver has no more scripted turns queued")]
    ScriptExhausted,

    #[error("driver did not honor interrupt within the grace window")]
    InterruptTimedOut,
}

impl From<DriverError> for agentx_types::AgentError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::InterruptTimedOut => {
                agentx_types::AgentError::unknown(err.to_string())
            }
            other => agentx_types::AgentError::receive_failed(other.to_string()),
        }
    }
}
