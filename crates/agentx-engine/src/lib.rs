// SPDX-License-Identifier: MIT
mod assembler;
mod engine;
mod message_event;
mod state_event;
mod state_projector;
mod turn_event;
mod turn_tracker;

pub use assembler::MessageAssembler;
pub use engine::{Engine, EngineOutput};
pub use message_event::MessageEvent;
pub use state_event::{AgentState, StateEvent};
pub use state_projector::StateProjector;
pub use turn_event::{TokenUsage, TurnEvent};
pub use turn_tracker::TurnTracker;
