//! Sampling session - the handle that exists only while playing.
//!
//! `SessionSlot` is the single owner: `start()` cancels whatever session is
//! alive before installing a new one, `cancel()` is idempotent. Each session
//! carries an epoch so a tick can tell which session it belongs to, and
//! dropping a session is its cancellation.

use log::{debug, trace};
use std::time::Instant;

#[derive(Debug)]
pub struct SyncSession {
    epoch: u64,
    started_at: Instant,
    samples: u64,
    dropped: u64,
}

impl SyncSession {
    fn new(epoch: u64) -> Self {
        Self {
            epoch,
            started_at: Instant::now(),
            samples: 0,
            dropped: 0,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Samples written into the clock
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Ticks whose read failed or was non-finite
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub(crate) fn record_sample(&mut self) {
        self.samples += 1;
    }

    pub(crate) fn record_drop(&mut self) {
        self.dropped += 1;
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        debug!(
            "SyncSession #{} ended after {:.2}s ({} samples, {} dropped)",
            self.epoch,
            self.started_at.elapsed().as_secs_f64(),
            self.samples,
            self.dropped
        );
    }
}

#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Option<SyncSession>,
    next_epoch: u64,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any live session, then start a fresh one. Returns its epoch.
    pub fn start(&mut self) -> u64 {
        self.cancel();
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        trace!("SyncSession #{} started", epoch);
        self.current = Some(SyncSession::new(epoch));
        epoch
    }

    /// Returns true if a session was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&SyncSession> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut SyncSession> {
        self.current.as_mut()
    }

    /// Number of sessions started so far
    pub fn started(&self) -> u64 {
        self.next_epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_replaces_previous() {
        let mut slot = SessionSlot::new();
        let first = slot.start();
        let second = slot.start();
        assert_ne!(first, second);
        assert_eq!(slot.current().map(|s| s.epoch()), Some(second));
        assert_eq!(slot.started(), 2);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut slot = SessionSlot::new();
        assert!(!slot.cancel());
        slot.start();
        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert!(!slot.is_active());
    }

    #[test]
    fn test_counters() {
        let mut slot = SessionSlot::new();
        slot.start();
        let session = slot.current_mut().unwrap();
        session.record_sample();
        session.record_sample();
        session.record_drop();
        assert_eq!(session.samples(), 2);
        assert_eq!(session.dropped(), 1);
    }
}
