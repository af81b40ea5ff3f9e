// SPDX-License-Identifier: MIT
mod channel;
mod config;
mod correlation;
mod effector;
mod error;
mod events;
mod http;
mod receptor;
mod server;
mod state;
mod ws;

pub use channel::{Channel, ConnectionState};
pub use config::GatewayConfig;
pub use correlation::{CorrelationError, RequestCorrelator, DEFAULT_TIMEOUT};
pub use effector::Effector;
pub use error::GatewayError;
pub use events::{agent_event_to_envelope, EventContext, WsEnvelope};
pub use receptor::Receptor;
pub use server::{build_router, serve};
pub use state::GatewayState;
