//! Event router (C7, spec.md §4.7).
//!
//! Delivery is synchronous, on the decoder thread, in capture order.
//! A subscriber that panics is isolated: its panic is caught and logged,
//! never propagated, and never affects delivery to other subscribers
//! (spec.md §8 "Subscriber isolation").

use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;

use crate::events::{EventKind, MonitorEvent};

/// A subscriber callback. Implementors that need to do anything beyond
/// cheap, synchronous bookkeeping must queue internally (spec.md §5).
pub trait EventSink: Send {
    fn handle(&self, event: &MonitorEvent);
}

impl<F> EventSink for F
where
    F: Fn(&MonitorEvent) + Send,
{
    fn handle(&self, event: &MonitorEvent) {
        self(event)
    }
}

struct Subscription {
    kind_filter: Option<EventKind>,
    sink: Box<dyn EventSink>,
}

/// The subscriber registry plus synchronous dispatch.
///
/// Registered subscriptions are read-mostly: mutation (subscribe) takes a
/// brief lock on the registry only, never held during delivery (spec.md
/// §5 "Shared resources").
#[derive(Default)]
pub struct EventRouter {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `kind_filter = None` subscribes to every event kind.
    pub fn subscribe(&self, kind_filter: Option<EventKind>, sink: Box<dyn EventSink>) {
        self.subscriptions
            .lock()
            .push(Subscription { kind_filter, sink });
    }

    /// Delivers `event` to every matching subscriber in registration order.
    pub fn publish(&self, event: &MonitorEvent) {
        let kind = event.kind();

        // Snapshotting the lock for the duration of delivery would hold it
        // across arbitrary subscriber code; instead we briefly lock per
        // dispatch round. The registry is read-mostly so this is cheap.
        let len = self.subscriptions.lock().len();

        for i in 0..len {
            let matches = {
                let subs = self.subscriptions.lock();
                let Some(sub) = subs.get(i) else {
                    continue;
                };
                sub.kind_filter.map_or(true, |k| k == kind)
            };

            if !matches {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| {
                let subs = self.subscriptions.lock();
                if let Some(sub) = subs.get(i) {
                    sub.sink.handle(event);
                }
            }));

            if let Err(panic) = result {
                let msg = panic_message(&panic);
                tracing::warn!(kind = ?kind, %msg, "subscriber panicked; delivery to other subscribers unaffected");
            }
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
