// SPDX-License-Identifier: MIT
//! Standalone checks for the message-history invariants of spec §3/§8
//! (P2, P3). These are pure functions over a message slice so they can be
//! reused by engine tests, repository round-trip tests, and the session
//! manager without creating a dependency cycle.
use std::collections::HashSet;

use crate::message::{AlternationSide, Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A `tool_result` referenced a `tool_call_id` with no earlier `tool-call`.
    DanglingToolResult { index: usize },
    /// Two consecutive same-side messages, breaking strict alternation (P3).
    AlternationBroken { index: usize, side: AlternationSide },
}

/// Check P2: every `tool-result.toolCallId` references a `tool-call.id`
/// that appears earlier in the same message history.
pub fn check_tool_result_references(messages: &[Message]) -> Result<(), InvariantViolation> {
    let mut seen_calls: HashSet<&str> = HashSet::new();
    for (index, message) in messages.iter().enumerate() {
        match message {
            Message::ToolCall { call_id, .. } => {
                seen_calls.insert(call_id.as_str());
            }
            Message::ToolResult { tool_call_id, .. } => {
                if !seen_calls.contains(tool_call_id.as_str()) {
                    return Err(InvariantViolation::DanglingToolResult { index });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Check P3: the message sequence, with tool-result grouped as
/// user-equivalent, strictly alternates user-equivalent and assistant
/// messages. `System` messages are exempt and do not break alternation.
pub fn check_alternation(messages: &[Message]) -> Result<(), InvariantViolation> {
    let mut last: Option<AlternationSide> = None;
    for (index, message) in messages.iter().enumerate() {
        let Some(side) = message.alternation_side() else {
            continue;
        };
        if let Some(last_side) = last {
            if last_side == side {
                return Err(InvariantViolation::AlternationBroken { index, side });
            }
        }
        last = Some(side);
    }
    Ok(())
}
