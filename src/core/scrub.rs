//! Scrub throttle - bounds how often slider drags reach the clock.
//!
//! A slider fires far more input events than frames are rendered. Every
//! forwarded value becomes a paused seek, i.e. a native `set_position` on
//! every mounted surface, so we coalesce:
//! 1. at most one value per rendering tick
//! 2. at most one value per `1 / max_rate_hz` seconds
//!
//! Values that arrive too early are not lost: the latest one is kept and
//! flushed on the first tick where both limits allow it, so the clock always
//! ends where the drag ended.

use log::trace;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ScrubThrottle {
    min_interval: Duration,
    last_forward: Option<Instant>,
    pending: Option<f64>,
    forwarded_this_tick: bool,
}

impl Default for ScrubThrottle {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl ScrubThrottle {
    /// `max_rate_hz <= 0` disables the rate cap (per-tick coalescing stays).
    pub fn new(max_rate_hz: f64) -> Self {
        Self {
            min_interval: Self::interval_for(max_rate_hz),
            last_forward: None,
            pending: None,
            forwarded_this_tick: false,
        }
    }

    fn interval_for(max_rate_hz: f64) -> Duration {
        if max_rate_hz.is_finite() && max_rate_hz > 0.0 {
            // Vanishing rates overflow Duration; treat them as "never"
            Duration::try_from_secs_f64(1.0 / max_rate_hz).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Offer a raw input value. Returns it if it may be forwarded now,
    /// otherwise keeps it as the pending value.
    pub fn offer(&mut self, value: f64, now: Instant) -> Option<f64> {
        if !self.forwarded_this_tick && self.interval_elapsed(now) {
            self.pending = None;
            self.mark_forwarded(now);
            return Some(value);
        }
        trace!("ScrubThrottle: holding {:.4}", value);
        self.pending = Some(value);
        None
    }

    /// Start of a rendering tick. Returns the pending value if it can go out now.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.forwarded_this_tick = false;
        let value = self.pending?;
        if !self.interval_elapsed(now) {
            return None;
        }
        self.pending = None;
        self.mark_forwarded(now);
        trace!("ScrubThrottle: flushing {:.4}", value);
        Some(value)
    }

    /// Take the pending value regardless of limits
    pub fn take_pending(&mut self) -> Option<f64> {
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        if self.pending.is_some() {
            trace!("ScrubThrottle: dropped pending value");
        }
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_value(&self) -> Option<f64> {
        self.pending
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        match self.last_forward {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        }
    }

    fn mark_forwarded(&mut self, now: Instant) {
        self.last_forward = Some(now);
        self.forwarded_this_tick = true;
    }
}
