//! Playback surface abstraction.
//!
//! A `MediaEndpoint` is one mounted video surface (one camera view). The engine
//! never owns surfaces: the UI that mounts a surface keeps the `Arc`, the
//! registry only keeps a `Weak` for as long as the surface is registered.
//!
//! Surfaces report asynchronous conditions (metadata loaded, decode errors,
//! end of content) as `EndpointEvent`s which the host forwards to
//! `SyncController::handle_endpoint_event`.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Stable identity of a registered surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointId(Uuid);

impl EndpointId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EndpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability set the engine needs from a playback surface.
///
/// `position` is fallible: a surface that has not loaded yet or whose decoder
/// failed may not be able to report a time. The engine treats a failed or
/// non-finite read as a dropped sample.
pub trait MediaEndpoint {
    fn position(&self) -> Result<f64, EndpointError>;
    fn set_position(&mut self, seconds: f64);
    fn play(&mut self);
    fn pause(&mut self);
}

/// Shared handle held by the mounting surface.
pub type EndpointRef = Arc<Mutex<dyn MediaEndpoint + Send>>;

/// Per-surface I/O conditions. Never fatal to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EndpointError {
    Decode(String),
    Network(String),
    UnsupportedFormat(String),
    Aborted,
    /// Position could not be read (surface not ready, detached element...)
    Unavailable,
}

impl EndpointError {
    /// Short label for UI badges.
    pub fn label(&self) -> &'static str {
        match self {
            EndpointError::Decode(_) => "decode error",
            EndpointError::Network(_) => "network error",
            EndpointError::UnsupportedFormat(_) => "unsupported format",
            EndpointError::Aborted => "aborted",
            EndpointError::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointError::Decode(e) => write!(f, "Decode error: {}", e),
            EndpointError::Network(e) => write!(f, "Network error: {}", e),
            EndpointError::UnsupportedFormat(e) => write!(f, "Unsupported format: {}", e),
            EndpointError::Aborted => write!(f, "Loading aborted"),
            EndpointError::Unavailable => write!(f, "Position unavailable"),
        }
    }
}

impl std::error::Error for EndpointError {}

/// Intrinsic properties a surface reports once its media header is parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Asynchronous notification from a surface.
#[derive(Clone, Debug, PartialEq)]
pub enum EndpointEvent {
    LoadedMetadata(MediaMetadata),
    Failed(EndpointError),
    Ended,
}
