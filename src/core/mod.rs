//! Core sync engine - clock, endpoints, registry, controller
//!
//! These modules know nothing about how a surface renders; they only drive
//! the `MediaEndpoint` capability set.

pub mod clock;
pub mod controller;
pub mod endpoint;
pub mod event_bus;
pub mod registry;
pub mod scrub;
pub mod session;
pub mod sync_events;

// Re-exports for convenience
pub use clock::{ClockSnapshot, PlaybackClock};
pub use controller::{SyncController, SyncState};
pub use endpoint::{EndpointError, EndpointEvent, EndpointId, EndpointRef, MediaEndpoint, MediaMetadata};
pub use event_bus::EventBus;
pub use registry::EndpointRegistry;
pub use scrub::ScrubThrottle;
