//! Transport controls: play/pause button, time slider, frame stepping.
//!
//! Seeking during playback is not a controller transition, so every scrub
//! first flips the clock to paused and only then forwards positions, through
//! the `ScrubThrottle`.

use crate::config::SyncConfig;
use crate::core::clock::frame_at;
use crate::core::controller::SyncController;
use crate::core::scrub::ScrubThrottle;
use log::debug;
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct ControlSurface {
    throttle: ScrubThrottle,
}

impl ControlSurface {
    pub fn new(max_rate_hz: f64) -> Self {
        Self {
            throttle: ScrubThrottle::new(max_rate_hz),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.scrub_max_rate_hz)
    }

    /// Slider step: one frame
    pub fn step(ctl: &SyncController) -> f64 {
        1.0 / ctl.clock().frame_rate()
    }

    /// Play/pause button. A scrub still held by the throttle is applied before
    /// playing so playback starts where the slider was released; pausing drops
    /// it, since it predates the playback it would rewind.
    pub fn toggle_playing(&mut self, ctl: &mut SyncController) {
        if ctl.clock().is_playing() {
            self.throttle.cancel();
        } else if let Some(value) = self.throttle.take_pending() {
            ctl.set_position(value);
        }
        ctl.toggle_playing();
    }

    pub fn on_slider_input(&mut self, ctl: &mut SyncController, value: f64) {
        self.on_slider_input_at(ctl, value, Instant::now());
    }

    pub fn on_slider_input_at(&mut self, ctl: &mut SyncController, value: f64, now: Instant) {
        if ctl.clock().is_playing() {
            debug!("Scrub during playback, pausing first");
            ctl.set_playing(false);
        }
        if let Some(value) = self.throttle.offer(value, now) {
            ctl.set_position(value);
        }
    }

    /// Call once per rendering tick.
    pub fn tick(&mut self, ctl: &mut SyncController) {
        self.tick_at(ctl, Instant::now());
    }

    pub fn tick_at(&mut self, ctl: &mut SyncController, now: Instant) {
        let Some(value) = self.throttle.tick(now) else {
            return;
        };
        // Playback was resumed some other way; the scrub is stale
        if ctl.clock().is_playing() {
            debug!("Dropping stale scrub to {:.3}s", value);
            return;
        }
        ctl.set_position(value);
    }

    /// Pause and move by `frames` (negative = backward).
    pub fn step_frames(&mut self, ctl: &mut SyncController, frames: i64) {
        ctl.set_playing(false);
        self.throttle.cancel();
        let fps = ctl.clock().frame_rate();
        let target = frame_at(ctl.clock().position(), fps) + frames;
        ctl.set_position(target as f64 / fps);
    }

    pub fn has_pending_scrub(&self) -> bool {
        self.throttle.is_pending()
    }
}
