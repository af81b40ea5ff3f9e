// SPDX-License-Identifier: MIT
//! Turn Tracker (spec §4.5): accumulates one open turn per agent — the
//! user message plus every message event until a terminal state event
//! closes it — and emits `turn_request`/`turn_response`.
use agentx_types::Message;

use crate::message_event::MessageEvent;
use crate::state_event::StateEvent;
use crate::turn_event::{TokenUsage, TurnEvent};

struct OpenTurn {
    request: Message,
    transcript: Vec<Message>,
    stop_reason: Option<agentx_driver::StopReason>,
}

#[derive(Default)]
pub struct TurnTracker {
    open: Option<OpenTurn>,
}

impl TurnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a message event produced by the assembler (or the user-message
    /// pseudo-event from the Agent Instance). Opens a new turn on
    /// `UserMessage`; everything else accumulates into the currently open
    /// turn's transcript (a no-op if no turn is open, which should not
    /// happen in well-formed use but is tolerated defensively).
    pub fn on_message_event(&mut self, event: &MessageEvent) -> Vec<TurnEvent> {
        match event {
            MessageEvent::UserMessage(message) => {
                self.open = Some(OpenTurn {
                    request: message.clone(),
                    transcript: Vec::new(),
                    stop_reason: None,
                });
                vec![TurnEvent::TurnRequest {
                    message: message.clone(),
                }]
            }
            MessageEvent::AssistantMessage(message) => {
                if let Message::Assistant { stop_reason, .. } = message {
                    if let Some(open) = &mut self.open {
                        open.stop_reason = stop_reason
                            .as_deref()
                            .and_then(parse_stop_reason);
                    }
                }
                self.push(message.clone());
                vec![]
            }
            MessageEvent::ToolCallMessage(message) | MessageEvent::ToolResultMessage(message) => {
                self.push(message.clone());
                vec![]
            }
        }
    }

    fn push(&mut self, message: Message) {
        if let Some(open) = &mut self.open {
            open.transcript.push(message);
        }
    }

    /// Feed a state event produced by the projector. Closes the open turn
    /// and emits `turn_response` on `conversation_end`/`conversation_interrupted`.
    pub fn on_state_event(&mut self, event: &StateEvent) -> Vec<TurnEvent> {
        if !event.ends_turn() {
            return vec![];
        }
        let Some(open) = self.open.take() else {
            return vec![];
        };
        let approx_total: usize = std::iter::once(&open.request)
            .chain(open.transcript.iter())
            .map(Message::approx_tokens)
            .sum();
        vec![TurnEvent::TurnResponse {
            request: open.request,
            transcript: open.transcript,
            stop_reason: open.stop_reason,
            token_usage: TokenUsage { approx_total },
        }]
    }
}

fn parse_stop_reason(s: &str) -> Option<agentx_driver::StopReason> {
    use agentx_driver::StopReason::*;
    match s {
        "stop" => Some(Stop),
        "tool-calls" => Some(ToolCalls),
        "max-tokens" => Some(MaxTokens),
        "length" => Some(Length),
        "error" => Some(Error),
        "interrupted" => Some(Interrupted),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentx_types::{AssistantContent, MessageId};
    use chrono::Utc;

    #[test]
    fn user_message_opens_turn_and_emits_turn_request() {
        let mut tracker = TurnTracker::new();
        let user = Message::user("hello");
        let events = tracker.on_message_event(&MessageEvent::UserMessage(user.clone()));
        assert_eq!(events, vec![TurnEvent::TurnRequest { message: user }]);
    }

    #[test]
    fn conversation_end_closes_turn_with_full_transcript() {
        let mut tracker = TurnTracker::new();
        let user = Message::user("hello");
        tracker.on_message_event(&MessageEvent::UserMessage(user.clone()));

        let assistant = Message::Assistant {
            id: MessageId::new(),
            timestamp: Utc::now(),
            content: AssistantContent::Text("hi there".into()),
            stop_reason: Some("stop".into()),
        };
        tracker.on_message_event(&MessageEvent::AssistantMessage(assistant.clone()));

        let events = tracker.on_state_event(&StateEvent::ConversationEnd {
            stop_reason: agentx_driver::StopReason::Stop,
        });
        assert_eq!(events.len(), 1);
        match &events[0] {
            TurnEvent::TurnResponse {
                request,
                transcript,
                stop_reason,
                ..
            } => {
                assert_eq!(*request, user);
                assert_eq!(*transcript, vec![assistant]);
                assert_eq!(*stop_reason, Some(agentx_driver::StopReason::Stop));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn non_terminal_state_event_does_not_close_turn() {
        let mut tracker = TurnTracker::new();
        tracker.on_message_event(&MessageEvent::UserMessage(Message::user("hi")));
        let events = tracker.on_state_event(&StateEvent::ConversationResponding);
        assert!(events.is_empty());
    }

    #[test]
    fn interrupted_closes_turn_too() {
        let mut tracker = TurnTracker::new();
        tracker.on_message_event(&MessageEvent::UserMessage(Message::user("hi")));
        let events = tracker.on_state_event(&StateEvent::ConversationInterrupted);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TurnEvent::TurnResponse { .. }));
    }
}
