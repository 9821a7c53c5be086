//! Ordered registry of mounted surfaces.
//!
//! Slots keep registration order (not visual order). The first slot is the
//! primary. Removing the primary promotes the next slot explicitly and reports
//! it, so the controller can start sampling the new primary on the next tick.
//!
//! Slots hold `Weak` references: a surface dropped without unregistering is
//! pruned the next time the registry is walked.

use crate::core::endpoint::{
    EndpointError, EndpointId, EndpointRef, MediaEndpoint, MediaMetadata,
};
use log::{debug, warn};
use std::sync::{Mutex, Weak};

type WeakEndpoint = Weak<Mutex<dyn MediaEndpoint + Send>>;

/// One registered surface plus what the engine knows about it.
#[derive(Debug, Clone)]
pub struct EndpointSlot {
    pub id: EndpointId,
    pub label: String,
    pub error: Option<EndpointError>,
    pub metadata: Option<MediaMetadata>,
    endpoint: WeakEndpoint,
}

impl EndpointSlot {
    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }

    fn is_alive(&self) -> bool {
        self.endpoint.strong_count() > 0
    }

    /// Run `f` against the surface if it is still mounted.
    fn with<R>(&self, f: impl FnOnce(&mut (dyn MediaEndpoint + Send + 'static)) -> R) -> Option<R> {
        let endpoint = self.endpoint.upgrade()?;
        let mut guard = endpoint.lock().unwrap_or_else(|e| e.into_inner());
        Some(f(&mut *guard))
    }
}

/// Outcome of an unregistration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub was_primary: bool,
    /// Primary after removal, if the old one left
    pub promoted: Option<EndpointId>,
}

#[derive(Debug, Default)]
pub struct EndpointRegistry {
    slots: Vec<EndpointSlot>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a surface. Registering the same `Arc` twice returns the existing id.
    pub fn register(&mut self, endpoint: &EndpointRef, label: impl Into<String>) -> EndpointId {
        let weak: WeakEndpoint = std::sync::Arc::downgrade(endpoint);
        if let Some(slot) = self.slots.iter().find(|s| Weak::ptr_eq(&s.endpoint, &weak)) {
            warn!("Endpoint {} ({}) registered twice, ignoring", slot.label, slot.id);
            return slot.id;
        }
        let slot = EndpointSlot {
            id: EndpointId::new(),
            label: label.into(),
            error: None,
            metadata: None,
            endpoint: weak,
        };
        let id = slot.id;
        debug!("Registry: + {} ({}) at index {}", slot.label, id, self.slots.len());
        self.slots.push(slot);
        id
    }

    /// Remove a slot by id. None if it was not registered.
    pub fn unregister(&mut self, id: EndpointId) -> Option<Removal> {
        let index = self.index_of(id)?;
        let slot = self.slots.remove(index);
        let was_primary = index == 0;
        let promoted = if was_primary {
            self.slots.first().map(|s| s.id)
        } else {
            None
        };
        debug!(
            "Registry: - {} ({}), was_primary={}, promoted={:?}",
            slot.label, id, was_primary, promoted
        );
        Some(Removal {
            was_primary,
            promoted,
        })
    }

    /// Drop slots whose surface is gone. Returns the removals in order.
    pub fn prune(&mut self) -> Vec<(EndpointId, Removal)> {
        let dead: Vec<EndpointId> = self
            .slots
            .iter()
            .filter(|s| !s.is_alive())
            .map(|s| s.id)
            .collect();
        dead.into_iter()
            .filter_map(|id| {
                warn!("Registry: endpoint {} dropped without unregistering", id);
                self.unregister(id).map(|r| (id, r))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: EndpointId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn primary(&self) -> Option<&EndpointSlot> {
        self.slots.first()
    }

    /// First slot without a recorded error
    pub fn first_healthy(&self) -> Option<&EndpointSlot> {
        self.slots.iter().find(|s| s.is_healthy())
    }

    pub fn get(&self, id: EndpointId) -> Option<&EndpointSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: EndpointId) -> Option<&mut EndpointSlot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    pub fn ids(&self) -> Vec<EndpointId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointSlot> {
        self.slots.iter()
    }

    fn index_of(&self, id: EndpointId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    // === Commands (registration order) ===

    pub fn seek_all(&self, seconds: f64) {
        for slot in &self.slots {
            slot.with(|e| e.set_position(seconds));
        }
    }

    pub fn play_all(&self) {
        for slot in &self.slots {
            slot.with(|e| e.play());
        }
    }

    pub fn pause_all(&self) {
        for slot in &self.slots {
            slot.with(|e| e.pause());
        }
    }

    pub fn seek(&self, id: EndpointId, seconds: f64) {
        if let Some(slot) = self.get(id) {
            slot.with(|e| e.set_position(seconds));
        }
    }

    pub fn play(&self, id: EndpointId) {
        if let Some(slot) = self.get(id) {
            slot.with(|e| e.play());
        }
    }

    /// Read a surface's native position. Gone surfaces read as `Unavailable`.
    pub fn read_position(&self, id: EndpointId) -> Result<f64, EndpointError> {
        self.get(id)
            .and_then(|slot| slot.with(|e| e.position()))
            .unwrap_or(Err(EndpointError::Unavailable))
    }
}
