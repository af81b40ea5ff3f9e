// SPDX-License-Identifier: MIT
//! Middleware and Interceptor chains (spec §4.8): ordered, dynamically
//! mutable, fail-open pipelines.
//!
//! The spec's source language models each link as `(value, next) -> value`
//! with an explicit continuation. Per spec §9 ("encode as an index into a
//! vector with a recursive local function, or equivalently as an iterator
//! passed explicitly") that is equivalent to a sequential fold where a link
//! either transforms-and-continues (`Some(value)`) or short-circuits
//! (`None`), so that is the shape used here. A link that panics is treated
//! as if it had called `next` with the value unchanged (fail open).
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use tracing::warn;

type Link<T> = Box<dyn Fn(T) -> Option<T> + Send + Sync>;

/// A named, ordered chain of links over values of type `T`.
pub struct Chain<T> {
    kind: &'static str,
    links: Mutex<Vec<Link<T>>>,
}

impl<T> Chain<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            links: Mutex::new(Vec::new()),
        }
    }

    /// Append a link to the end of the chain.
    pub fn push(&self, link: impl Fn(T) -> Option<T> + Send + Sync + 'static) {
        self.links.lock().unwrap().push(Box::new(link));
    }

    pub fn len(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `value` through every link in order. Returns `None` if any link
    /// short-circuits (the value is dropped, per spec §4.8's documented
    /// silent-drop behavior when no link calls `next`).
    pub fn run(&self, value: T) -> Option<T>
    where
        T: Clone,
    {
        let links = self.links.lock().unwrap();
        let mut current = value;
        for link in links.iter() {
            let attempt = catch_unwind(AssertUnwindSafe(|| link(current.clone())));
            match attempt {
                Ok(Some(next)) => current = next,
                Ok(None) => return None,
                Err(panic) => {
                    warn!(chain = self.kind, error = %panic_message(&panic), "chain link panicked, failing open");
                }
            }
        }
        Some(current)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Pre-processing of incoming user messages (spec §4.8).
pub type MiddlewareChain = Chain<agentx_types::Message>;

/// Pre-dispatch of outgoing engine outputs (spec §4.8). Runs between
/// Engine output and Event Bus emission; Engine state has already mutated
/// by the time a link sees (and can short-circuit) an event.
pub type InterceptorChain = Chain<agentx_engine::EngineOutput>;

pub fn middleware_chain() -> MiddlewareChain {
    Chain::new("middleware")
}

pub fn interceptor_chain() -> InterceptorChain {
    Chain::new("interceptor")
}
