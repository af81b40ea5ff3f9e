// SPDX-License-Identifier: MIT
mod driver;
mod error;
mod scripted;
mod stream_event;

pub use driver::{CursorSink, Driver, ReceiveContext, StreamReceiver};
pub use error::DriverError;
pub use scripted::ScriptedDriver;
pub use stream_event::{StopReason, StreamEvent};
