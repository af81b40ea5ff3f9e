// SPDX-License-Identifier: MIT
use agentx_driver::StopReason;
use agentx_types::Message;

/// Best-effort token accounting for a closed turn. Computed from
/// [`Message::approx_tokens`] over the turn's transcript — there is no
/// real provider-reported usage in the canonical stream event alphabet, so
/// this is an estimate for telemetry, never a correctness-bearing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub approx_total: usize,
}

/// Output of the Turn Tracker (spec §4.5): pairs a user turn with its
/// complete assistant reply, including any intermediate tool calls.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    TurnRequest { message: Message },
    TurnResponse {
        request: Message,
        transcript: Vec<Message>,
        stop_reason: Option<StopReason>,
        token_usage: TokenUsage,
    },
}

impl TurnEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TurnRequest { .. } => "turn_request",
            Self::TurnResponse { .. } => "turn_response",
        }
    }
}
