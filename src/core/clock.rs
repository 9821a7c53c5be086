//! Shared playback clock.
//!
//! Pure value holder for one viewing session: position, play intent, duration
//! and frame rate. It never looks at a surface's native time; the only way a
//! native position gets in is the controller's sampling path.
//!
//! Every setter reports whether the stored value actually changed and
//! publishes the matching event, so readouts (frame counter, keypoint layers)
//! can follow the clock without polling.

use crate::core::event_bus::EventEmitter;
use crate::core::sync_events::{
    ClockReset, DurationChanged, FrameRateChanged, PlayingChanged, PositionChanged,
};
use log::trace;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Read-only copy of the clock for on-screen readouts
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub position: f64,
    pub frame_index: i64,
    pub duration: f64,
    pub frame_rate: f64,
    pub is_playing: bool,
}

#[derive(Debug)]
pub struct PlaybackClock {
    position: f64,
    is_playing: bool,
    duration: f64,
    frame_rate: f64,
    emitter: EventEmitter,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE)
    }
}

impl PlaybackClock {
    pub fn new(frame_rate: f64) -> Self {
        let frame_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            DEFAULT_FRAME_RATE
        };
        Self {
            position: 0.0,
            is_playing: false,
            duration: 0.0,
            frame_rate,
            emitter: EventEmitter::detached(),
        }
    }

    /// Publish changes through `emitter` from now on
    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    // === Readers ===

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Derived on every call, never cached.
    pub fn frame_index(&self) -> i64 {
        frame_at(self.position, self.frame_rate)
    }

    /// Frame index clamped into `0..len` for indexing per-frame data.
    /// None when there is no data.
    pub fn frame_within(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some((self.frame_index().max(0) as usize).min(len - 1))
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            position: self.position,
            frame_index: self.frame_index(),
            duration: self.duration,
            frame_rate: self.frame_rate,
            is_playing: self.is_playing,
        }
    }

    // === Setters ===

    /// Clamp into `[0, duration]`. Non-finite input is dropped.
    /// Returns true if the stored position changed.
    pub fn set_position(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() {
            trace!("Clock: dropped non-finite position {}", seconds);
            return false;
        }
        let clamped = seconds.clamp(0.0, self.duration);
        if clamped == self.position {
            return false;
        }
        self.position = clamped;
        self.emit_position();
        true
    }

    pub fn set_playing(&mut self, playing: bool) -> bool {
        if playing == self.is_playing {
            return false;
        }
        self.is_playing = playing;
        self.emitter.emit(PlayingChanged(playing));
        true
    }

    /// Negative or non-finite durations are ignored. The position is
    /// re-clamped, so a shrinking duration may move it.
    pub fn set_duration(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() || seconds < 0.0 || seconds == self.duration {
            return false;
        }
        self.duration = seconds;
        self.emitter.emit(DurationChanged(seconds));
        if self.position > seconds {
            self.position = seconds;
            self.emit_position();
        }
        true
    }

    pub fn set_frame_rate(&mut self, hz: f64) -> bool {
        if !hz.is_finite() || hz <= 0.0 || hz == self.frame_rate {
            return false;
        }
        self.frame_rate = hz;
        self.emitter.emit(FrameRateChanged(hz));
        // Same position, different frame
        self.emit_position();
        true
    }

    /// Back to an empty session. Frame rate survives as the best prior guess.
    /// Readouts see each field change before the `ClockReset` marker.
    pub fn reset(&mut self) {
        self.set_playing(false);
        if self.duration != 0.0 {
            self.duration = 0.0;
            self.emitter.emit(DurationChanged(0.0));
        }
        if self.position != 0.0 {
            self.position = 0.0;
            self.emit_position();
        }
        self.emitter.emit(ClockReset);
    }

    fn emit_position(&self) {
        self.emitter.emit(PositionChanged {
            position: self.position,
            frame_index: self.frame_index(),
        });
    }
}

/// `round(seconds * fps)`
pub fn frame_at(seconds: f64, frame_rate: f64) -> i64 {
    (seconds * frame_rate).round() as i64
}
