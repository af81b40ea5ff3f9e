// SPDX-License-Identifier: MIT
//! In-process publish/subscribe event bus (spec §4.7).
//!
//! Grounded on the teacher's `ControlService` event fan-out
//! (`broadcast::channel` handed out via `AgentHandle`), generalized from a
//! fixed broadcast channel to a registry of filtered, prioritized
//! subscriptions because the spec additionally requires per-topic
//! filtering, one-shot subscriptions, and priority ordering that a plain
//! broadcast channel cannot express. Dispatch is synchronous and
//! panic-isolated per handler (P7/P8): one broken subscriber must never
//! stop delivery to the others, or to later events.
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::warn;

type Filter<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type Handler<E> = Box<dyn Fn(&E) + Send + Sync>;

struct Subscription<E> {
    id: u64,
    seq: u64,
    topic: Option<String>,
    filter: Option<Filter<E>>,
    once: bool,
    priority: i32,
    handler: Handler<E>,
}

/// Options controlling a single subscription. Build with [`SubscribeOptions::default`]
/// and the builder methods, or use the `on`/`on_any`/`once` shorthands on [`EventBus`].
#[derive(Default)]
pub struct SubscribeOptions<E> {
    filter: Option<Filter<E>>,
    once: bool,
    priority: i32,
}

impl<E> SubscribeOptions<E> {
    pub fn new() -> Self {
        Self {
            filter: None,
            once: false,
            priority: 0,
        }
    }

    /// Only deliver events for which `f` returns `true`.
    pub fn filter(mut self, f: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    /// Automatically unsubscribe after the first delivered event.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Higher priority handlers run first; ties broken by registration order.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A handle that removes its subscription when called, or when dropped
/// without being called — whichever the caller does explicitly. Unlike a
/// `Drop`-based guard, dropping this without calling it leaves the
/// subscription active; callers must invoke it to unsubscribe.
pub struct Unsubscribe<E> {
    id: u64,
    bus: std::sync::Weak<Inner<E>>,
}

impl<E> Unsubscribe<E> {
    pub fn call(self) {
        if let Some(inner) = self.bus.upgrade() {
            let mut subs = inner.subscriptions.lock().unwrap();
            subs.retain(|s| s.id != self.id);
        }
    }
}

struct Inner<E> {
    subscriptions: Mutex<Vec<Subscription<E>>>,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    destroyed: std::sync::atomic::AtomicBool,
}

/// A topic-filtered, priority-ordered, panic-isolated pub/sub bus.
///
/// Cloning an `EventBus` shares the same underlying registry (it is a thin
/// `Arc` wrapper), matching how the teacher clones `AgentHandle` to hand
/// the same channel to multiple transport tasks.
pub struct EventBus<E> {
    inner: std::sync::Arc<Inner<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Inner {
                subscriptions: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                next_seq: AtomicU64::new(1),
                destroyed: std::sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    fn subscribe_inner(
        &self,
        topic: Option<String>,
        opts: SubscribeOptions<E>,
        handler: Handler<E>,
    ) -> Unsubscribe<E> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        let sub = Subscription {
            id,
            seq,
            topic,
            filter: opts.filter,
            once: opts.once,
            priority: opts.priority,
            handler,
        };
        let mut subs = self.inner.subscriptions.lock().unwrap();
        let pos = subs
            .iter()
            .position(|s| s.priority < sub.priority)
            .unwrap_or(subs.len());
        subs.insert(pos, sub);
        Unsubscribe {
            id,
            bus: std::sync::Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe to events on a specific topic.
    pub fn on(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Unsubscribe<E> {
        self.on_with(topic, SubscribeOptions::new(), handler)
    }

    pub fn on_with(
        &self,
        topic: impl Into<String>,
        opts: SubscribeOptions<E>,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Unsubscribe<E> {
        self.subscribe_inner(Some(topic.into()), opts, Box::new(handler))
    }

    /// Subscribe to every topic emitted on this bus.
    pub fn on_any(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Unsubscribe<E> {
        self.on_any_with(SubscribeOptions::new(), handler)
    }

    pub fn on_any_with(
        &self,
        opts: SubscribeOptions<E>,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Unsubscribe<E> {
        self.subscribe_inner(None, opts, Box::new(handler))
    }

    /// Subscribe to a topic for exactly one delivery.
    pub fn once(
        &self,
        topic: impl Into<String>,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Unsubscribe<E> {
        self.on_with(topic, SubscribeOptions::new().once(true), handler)
    }

    /// Emit one event on `topic`. No-op (with a warning) once the bus is destroyed.
    pub fn emit(&self, topic: &str, event: E) {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            warn!(topic, "emit on a destroyed event bus ignored");
            return;
        }

        // Snapshot dispatch: clone the matching subscription ids+priority so
        // a handler that subscribes/unsubscribes mid-dispatch can't corrupt
        // the list we're iterating, then re-acquire the lock per handler to
        // actually invoke it (handlers never run while holding the lock).
        let snapshot: Vec<u64> = {
            let subs = self.inner.subscriptions.lock().unwrap();
            subs.iter()
                .filter(|s| s.topic.is_none() || s.topic.as_deref() == Some(topic))
                .filter(|s| s.filter.as_ref().map(|f| f(&event)).unwrap_or(true))
                .map(|s| s.id)
                .collect()
        };

        let mut once_ids = Vec::new();
        for id in snapshot {
            let subs = self.inner.subscriptions.lock().unwrap();
            let Some(sub) = subs.iter().find(|s| s.id == id) else {
                continue; // unsubscribed between snapshot and now
            };
            let result = catch_unwind(AssertUnwindSafe(|| (sub.handler)(&event)));
            let once = sub.once;
            drop(subs);
            if let Err(panic) = result {
                let msg = panic_message(&panic);
                warn!(topic, subscriber = id, error = %msg, "event bus handler panicked");
            }
            if once {
                once_ids.push(id);
            }
        }

        if !once_ids.is_empty() {
            let mut subs = self.inner.subscriptions.lock().unwrap();
            subs.retain(|s| !once_ids.contains(&s.id));
        }
    }

    /// Emit several events on the same topic, in order.
    pub fn emit_batch(&self, topic: &str, events: impl IntoIterator<Item = E>) {
        for event in events {
            self.emit(topic, event);
        }
    }

    /// Permanently disable delivery. Further `emit` calls are no-ops.
    pub fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);
        self.inner.subscriptions.lock().unwrap().clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriptions.lock().unwrap().len()
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, AtomicUsize};
    use std::sync::Arc;

    #[test]
    fn dispatches_in_priority_then_registration_order() {
        let bus: EventBus<i32> = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        bus.on_with("x", SubscribeOptions::new().priority(0), move |_| {
            o1.lock().unwrap().push("low-first")
        });
        let o2 = order.clone();
        bus.on_with("x", SubscribeOptions::new().priority(10), move |_| {
            o2.lock().unwrap().push("high")
        });
        let o3 = order.clone();
        bus.on_with("x", SubscribeOptions::new().priority(0), move |_| {
            o3.lock().unwrap().push("low-second")
        });

        bus.emit("x", 1);
        assert_eq!(
            *order.lock().unwrap(),
            vec!["high", "low-first", "low-second"]
        );
    }

    #[test]
    fn filter_excludes_non_matching_events() {
        let bus: EventBus<i32> = EventBus::new();
        let seen = Arc::new(AtomicI32::new(0));
        let s = seen.clone();
        bus.on_with(
            "x",
            SubscribeOptions::new().filter(|e: &i32| *e > 5),
            move |e| {
                s.store(*e, Ordering::SeqCst);
            },
        );
        bus.emit("x", 1);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        bus.emit("x", 42);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn once_unsubscribes_after_first_delivery() {
        let bus: EventBus<i32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.once("x", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit("x", 1);
        bus.emit("x", 1);
        bus.emit("x", 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_any_receives_every_topic() {
        let bus: EventBus<i32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.on_any(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit("a", 1);
        bus.emit("b", 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let bus: EventBus<i32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let unsub = bus.on("x", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit("x", 1);
        unsub.call();
        bus.emit("x", 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    /// P8: a panicking handler must not stop delivery to later subscribers.
    #[test]
    fn panicking_handler_does_not_block_other_subscribers() {
        let bus: EventBus<i32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.on("x", |_| panic!("boom"));
        let c = count.clone();
        bus.on("x", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit("x", 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    /// P7: a handler that subscribes/unsubscribes mid-dispatch must not
    /// corrupt the current emit's delivery list.
    #[test]
    fn self_mutation_during_dispatch_is_safe() {
        let bus: EventBus<i32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let bus2 = bus.clone();
        let c = count.clone();
        bus.on("x", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            let c2 = c.clone();
            bus2.on("x", move |_| {
                c2.fetch_add(100, Ordering::SeqCst);
            });
        });

        bus.emit("x", 1);
        // The handler subscribed during this emit must not fire for the
        // same emit call.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        bus.emit("x", 1);
        assert_eq!(count.load(Ordering::SeqCst), 102);
    }

    #[test]
    fn destroyed_bus_ignores_emit() {
        let bus: EventBus<i32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.on("x", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.destroy();
        bus.emit("x", 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(bus.is_destroyed());
    }

    #[test]
    fn emit_batch_delivers_in_order() {
        let bus: EventBus<i32> = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        bus.on("x", move |e| s.lock().unwrap().push(*e));
        bus.emit_batch("x", vec![1, 2, 3]);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }
}
