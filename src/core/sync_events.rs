//! Clock and endpoint events published on the `EventBus`.

use crate::core::endpoint::{EndpointError, EndpointId, MediaMetadata};

// === Clock ===

#[derive(Clone, Debug, PartialEq)]
pub struct PositionChanged {
    pub position: f64,
    pub frame_index: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayingChanged(pub bool);

#[derive(Clone, Debug, PartialEq)]
pub struct DurationChanged(pub f64);

#[derive(Clone, Debug, PartialEq)]
pub struct FrameRateChanged(pub f64);

#[derive(Clone, Debug)]
pub struct ClockReset;

// === Registry ===

#[derive(Clone, Debug)]
pub struct EndpointRegistered {
    pub id: EndpointId,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct EndpointUnregistered {
    pub id: EndpointId,
    pub was_primary: bool,
}

/// New first element after the previous primary left (None = registry empty)
#[derive(Clone, Debug)]
pub struct PrimaryChanged(pub Option<EndpointId>);

// === Endpoint conditions ===

#[derive(Clone, Debug)]
pub struct EndpointFailed {
    pub id: EndpointId,
    pub label: String,
    pub error: EndpointError,
    /// Short badge text, see `EndpointError::label`
    pub error_label: &'static str,
}

#[derive(Clone, Debug)]
pub struct EndpointMetadataLoaded {
    pub id: EndpointId,
    pub metadata: MediaMetadata,
}

/// Sampling source reached end of content
#[derive(Clone, Debug)]
pub struct PlaybackEnded {
    pub id: EndpointId,
    pub position: f64,
}
