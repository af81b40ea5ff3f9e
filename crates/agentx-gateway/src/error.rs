// SPDX-License-Identifier: MIT
//! Maps internal failures onto the status codes listed in spec §6.1.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use agentx_image::RepositoryError;
use agentx_runtime::SessionError;
use agentx_types::AgentError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("agent is already processing a turn")]
    Busy,
    #[error("resource has been destroyed")]
    Gone,
    #[error("sessions still reference this image")]
    Forbidden(String),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for GatewayError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DefinitionNotFound(_)
            | RepositoryError::ImageNotFound(_)
            | RepositoryError::SessionNotFound(_)
            | RepositoryError::ContainerNotFound(_) => Self::NotFound(err.to_string()),
            RepositoryError::ImageHasSessions(_) => Self::Forbidden(err.to_string()),
        }
    }
}

impl From<SessionError> for GatewayError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Repository(repo_err) => repo_err.into(),
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Busy => StatusCode::CONFLICT,
            Self::Gone => StatusCode::GONE,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Agent(err) => match err.code {
                "agent-busy" => StatusCode::CONFLICT,
                "agent-destroyed" => StatusCode::GONE,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
