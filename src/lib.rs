//! SYNCVIEW - multi-surface video playback sync library
//!
//! Re-exports all modules for use by the binary target.

// Core engine (clock, registry, controller)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod control;
pub mod sim;

// Re-export commonly used types from core
pub use core::clock::{ClockSnapshot, PlaybackClock};
pub use core::controller::{SyncController, SyncState};
pub use core::endpoint::{EndpointError, EndpointEvent, EndpointId, EndpointRef, MediaEndpoint, MediaMetadata};
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter};

pub use config::{PrimaryErrorPolicy, SyncConfig};
pub use control::ControlSurface;
