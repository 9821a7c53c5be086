//! Pub/Sub bus that lets readouts follow the clock without polling it.
//!
//! - `subscribe()` registers a callback per event type, invoked synchronously
//!   inside `emit()` in subscription order
//! - every emitted event is also queued; `poll()` drains the queue for hosts
//!   that prefer batch processing once per frame
//!
//! Subscribers only observe. They never receive a handle to the controller,
//! so a callback cannot feed a mutation back into the engine mid-dispatch.

use log::warn;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Queue capacity before the oldest half is evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

pub type BoxedEvent = Box<dyn Event>;

#[derive(Default)]
struct Shared {
    subscribers: RwLock<HashMap<TypeId, Vec<Callback>>>,
    queue: Mutex<Vec<BoxedEvent>>,
}

impl Shared {
    fn dispatch<E: Event + Clone>(&self, event: E, origin: &str) {
        let type_id = TypeId::of::<E>();

        // Clone the callback list so a subscriber may subscribe/emit without
        // holding our read guard.
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&type_id)
            .cloned()
            .unwrap_or_default();
        for cb in &callbacks {
            cb(&event);
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("{} queue full ({} events), evicting oldest {}", origin, queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(Box::new(event));
    }
}

/// Event bus shared by the clock, the controller and any readouts.
#[derive(Clone, Default)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type E.
    ///
    /// # Example
    /// ```ignore
    /// bus.subscribe::<PositionChanged, _>(move |e| {
    ///     readout.lock().unwrap().frame = e.frame_index;
    /// });
    /// ```
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapped);
    }

    /// Invoke subscribers immediately, then queue the event for `poll()`.
    pub fn emit<E: Event + Clone>(&self, event: E) {
        self.shared.dispatch(event, "EventBus");
    }

    /// Drain every event emitted since the previous poll.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Cheap handle for components that only publish.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Some(Arc::clone(&self.shared)),
        }
    }

    pub fn unsubscribe_all<E: Event>(&self) {
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&TypeId::of::<E>());
    }

    /// Clear all subscribers and the queue
    pub fn clear(&self) {
        self.shared.subscribers.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.shared
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Publishing handle. A detached emitter (no bus) swallows events, which lets
/// a clock run standalone in tests or before a bus is wired up.
#[derive(Clone, Default)]
pub struct EventEmitter {
    shared: Option<Arc<Shared>>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("attached", &self.shared.is_some())
            .finish()
    }
}

impl EventEmitter {
    /// Emitter that drops everything
    pub fn detached() -> Self {
        Self { shared: None }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.is_some()
    }

    pub fn emit<E: Event + Clone>(&self, event: E) {
        if let Some(shared) = &self.shared {
            shared.dispatch(event, "EventEmitter");
        }
    }
}

/// Downcast a polled event to its concrete type.
///
/// Deref to `dyn Event` explicitly: calling `as_any()` on the `Box` itself hits
/// the blanket impl for `Box<dyn Event>` and the downcast always fails.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
