//! Play/pause/seek state machine that keeps every mounted view in lockstep.
//!
//! **Ownership**: the controller owns the `PlaybackClock` and the registry.
//! Consumers read through `clock()` or subscribe on the `EventBus`; every
//! mutation goes through the entry points below so the controller sees it.
//!
//! # Protocol
//!
//! - **Paused → Playing**: seek every surface to the clock, `play()` them in
//!   registration order, start a sampling session.
//! - **Playing → Paused**: cancel the session, `pause()` every surface, then
//!   seek them all to the clock again (surfaces drift apart while playing).
//! - **Seek while paused**: push the new clock position to every surface.
//! - **Tick while playing**: read the sampling source (the primary) and write
//!   the value into the clock.
//!
//! The tick writes the clock through the same `set_position` path a user seek
//! takes. What stops that write from bouncing back out to the surfaces is the
//! guard in `on_seek`: positions are only pushed outward while paused. Without
//! it every sample would seek all surfaces, which would move the primary,
//! which would be sampled again on the next tick.

use crate::config::{PrimaryErrorPolicy, SyncConfig};
use crate::core::clock::PlaybackClock;
use crate::core::endpoint::{EndpointEvent, EndpointId, EndpointRef};
use crate::core::event_bus::{EventBus, EventEmitter};
use crate::core::registry::{EndpointRegistry, Removal};
use crate::core::session::{SessionSlot, SyncSession};
use crate::core::sync_events::{
    EndpointFailed, EndpointMetadataLoaded, EndpointRegistered, EndpointUnregistered,
    PlaybackEnded, PrimaryChanged,
};
use log::{debug, info, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Paused,
    Playing,
}

pub struct SyncController {
    clock: PlaybackClock,
    registry: EndpointRegistry,
    sessions: SessionSlot,
    config: SyncConfig,
    emitter: EventEmitter,
}

impl SyncController {
    /// Standalone controller, no event publishing
    pub fn new(config: SyncConfig) -> Self {
        Self::build(config, EventEmitter::detached())
    }

    /// Controller whose clock and registry changes are published on `bus`
    pub fn with_bus(config: SyncConfig, bus: &EventBus) -> Self {
        Self::build(config, bus.emitter())
    }

    fn build(config: SyncConfig, emitter: EventEmitter) -> Self {
        let clock = PlaybackClock::new(config.default_frame_rate).with_emitter(emitter.clone());
        Self {
            clock,
            registry: EndpointRegistry::new(),
            sessions: SessionSlot::new(),
            config,
            emitter,
        }
    }

    // === Readers ===

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        if self.clock.is_playing() {
            SyncState::Playing
        } else {
            SyncState::Paused
        }
    }

    /// Live sampling session, if playing
    pub fn session(&self) -> Option<&SyncSession> {
        self.sessions.current()
    }

    /// Sessions started since construction
    pub fn sessions_started(&self) -> u64 {
        self.sessions.started()
    }

    /// Surface whose native time is written into the clock on each tick.
    ///
    /// The primary, unless it has a recorded error and the policy is
    /// `Failover`, in which case the first healthy surface.
    pub fn sampling_source(&self) -> Option<EndpointId> {
        match self.config.primary_error_policy {
            PrimaryErrorPolicy::Freeze => self.registry.primary().map(|s| s.id),
            PrimaryErrorPolicy::Failover => self.registry.first_healthy().map(|s| s.id),
        }
    }

    // === Clock entry points ===

    pub fn set_playing(&mut self, playing: bool) {
        if !self.clock.set_playing(playing) {
            return;
        }
        if playing {
            self.on_play();
        } else {
            self.on_pause();
        }
    }

    pub fn toggle_playing(&mut self) {
        self.set_playing(!self.clock.is_playing());
    }

    pub fn set_position(&mut self, seconds: f64) {
        if self.clock.set_position(seconds) {
            self.on_seek();
        }
    }

    pub fn set_duration(&mut self, seconds: f64) {
        let before = self.clock.position();
        if self.clock.set_duration(seconds) && self.clock.position() != before {
            self.on_seek();
        }
    }

    pub fn set_frame_rate(&mut self, hz: f64) {
        self.clock.set_frame_rate(hz);
    }

    /// Switch to a different recording: stop, rewind, forget the duration.
    pub fn reset(&mut self) {
        let was_playing = self.clock.is_playing();
        let was_at = self.clock.position();
        self.clock.reset();
        if was_playing {
            self.on_pause();
        } else if was_at != 0.0 {
            self.on_seek();
        }
        debug!("Clock reset (frame rate kept at {})", self.clock.frame_rate());
    }

    // === Endpoint lifecycle ===

    /// Register a mounted surface.
    ///
    /// A late joiner is aligned to the clock, and started if the session is
    /// playing, before the next tick.
    pub fn register(&mut self, endpoint: &EndpointRef, label: impl Into<String>) -> EndpointId {
        let label = label.into();
        let count_before = self.registry.len();
        let id = self.registry.register(endpoint, label.clone());
        if self.registry.len() == count_before {
            return id;
        }

        self.emitter.emit(EndpointRegistered { id, label: label.clone() });
        if count_before == 0 {
            self.emitter.emit(PrimaryChanged(Some(id)));
        }

        if self.config.snap_late_joiners {
            self.registry.seek(id, self.clock.position());
            if self.clock.is_playing() {
                self.registry.play(id);
                debug!("Late joiner {} started at {:.3}s", label, self.clock.position());
            }
        }
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unregister(&mut self, id: EndpointId) -> bool {
        match self.registry.unregister(id) {
            Some(removal) => {
                self.after_removal(id, removal);
                true
            }
            None => false,
        }
    }

    fn after_removal(&mut self, id: EndpointId, removal: Removal) {
        self.emitter.emit(EndpointUnregistered {
            id,
            was_primary: removal.was_primary,
        });
        if removal.was_primary {
            self.emitter.emit(PrimaryChanged(removal.promoted));
            if self.clock.is_playing() {
                match removal.promoted {
                    Some(next) => debug!("Primary {} left, sampling {} from next tick", id, next),
                    None => debug!("Last surface left, sampling idle until one registers"),
                }
            }
        }
    }

    fn prune(&mut self) {
        for (id, removal) in self.registry.prune() {
            self.after_removal(id, removal);
        }
    }

    /// Asynchronous condition reported by a surface.
    pub fn handle_endpoint_event(&mut self, id: EndpointId, event: EndpointEvent) {
        let is_source = self.sampling_source() == Some(id);
        let Some(slot) = self.registry.get_mut(id) else {
            warn!("Event {:?} for unknown endpoint {}", event, id);
            return;
        };

        match event {
            EndpointEvent::LoadedMetadata(metadata) => {
                slot.metadata = Some(metadata);
                slot.error = None;
                debug!(
                    "{}: metadata {:.3}s {}x{}",
                    slot.label, metadata.duration, metadata.width, metadata.height
                );
                self.emitter.emit(EndpointMetadataLoaded { id, metadata });
                if self.clock.duration() == 0.0 && metadata.duration > 0.0 {
                    self.set_duration(metadata.duration);
                }
            }
            EndpointEvent::Failed(error) => {
                warn!("{}: {}", slot.label, error);
                slot.error = Some(error.clone());
                let label = slot.label.clone();
                let error_label = error.label();
                self.emitter.emit(EndpointFailed {
                    id,
                    label,
                    error,
                    error_label,
                });
                if is_source && self.clock.is_playing() {
                    match self.sampling_source() {
                        Some(next) if next != id => info!("Sampling fails over to {}", next),
                        _ => warn!("Sampling source failed, clock holds at {:.3}s", self.clock.position()),
                    }
                }
            }
            EndpointEvent::Ended => {
                trace!("{}: ended", slot.label);
                if is_source && self.clock.is_playing() && self.config.pause_on_end {
                    // Take the final position before stopping
                    self.tick();
                    self.emitter.emit(PlaybackEnded {
                        id,
                        position: self.clock.position(),
                    });
                    info!("Playback ended at {:.3}s", self.clock.position());
                    self.set_playing(false);
                }
            }
        }
    }

    // === Sampling ===

    /// Animation-frame tick. While playing, copies the sampling source's
    /// native time into the clock. Returns the sampled value if one was taken.
    pub fn tick(&mut self) -> Option<f64> {
        if !self.clock.is_playing() || !self.sessions.is_active() {
            return None;
        }
        self.prune();
        let source = self.sampling_source()?;

        match self.registry.read_position(source) {
            Ok(seconds) if seconds.is_finite() => {
                trace!("Sample {} -> {:.4}s", source, seconds);
                self.set_position(seconds);
                if let Some(session) = self.sessions.current_mut() {
                    session.record_sample();
                }
                Some(seconds)
            }
            Ok(seconds) => {
                trace!("Dropped non-finite sample {} from {}", seconds, source);
                self.drop_sample();
                None
            }
            Err(e) => {
                trace!("Dropped sample from {}: {}", source, e);
                self.drop_sample();
                None
            }
        }
    }

    fn drop_sample(&mut self) {
        if let Some(session) = self.sessions.current_mut() {
            session.record_drop();
        }
    }

    // === Transitions ===

    fn on_play(&mut self) {
        self.prune();
        let position = self.clock.position();
        self.registry.seek_all(position);
        self.registry.play_all();
        let epoch = self.sessions.start();
        info!(
            "Playing from {:.3}s on {} surface(s), session #{}",
            position,
            self.registry.len(),
            epoch
        );
    }

    fn on_pause(&mut self) {
        self.sessions.cancel();
        self.registry.pause_all();
        // Realign after pausing: surfaces advanced by slightly different amounts
        self.registry.seek_all(self.clock.position());
        info!("Paused at {:.3}s (frame {})", self.clock.position(), self.clock.frame_index());
    }

    /// Position changed. Only a paused clock is pushed out to the surfaces.
    fn on_seek(&mut self) {
        if self.clock.is_playing() {
            return;
        }
        trace!("Seek {:.4}s -> {} surface(s)", self.clock.position(), self.registry.len());
        self.registry.seek_all(self.clock.position());
    }

    /// Cancel sampling and let go of every surface.
    pub fn shutdown(&mut self) {
        if self.sessions.cancel() || !self.registry.is_empty() {
            debug!("SyncController shutdown ({} surface(s) released)", self.registry.len());
        }
        self.registry.clear();
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::{EndpointError, MediaMetadata};
    use crate::core::event_bus::downcast_event;
    use crate::core::sync_events::{ClockReset, PlayingChanged, PositionChanged};
    use crate::sim::{Call, SimHandle, SimSurface};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Controller with a 10s / 30fps session and `names.len()` surfaces, call logs cleared.
    fn rig_with(config: SyncConfig, names: &[&str]) -> (SyncController, Vec<SimHandle>, Vec<EndpointId>) {
        let mut ctl = SyncController::new(config);
        ctl.set_duration(10.0);
        ctl.set_frame_rate(30.0);
        let sims: Vec<SimHandle> = names.iter().map(|n| SimHandle::named(*n).with_duration(10.0)).collect();
        let ids = sims.iter().map(|s| ctl.register(&s.as_endpoint(), s.name())).collect();
        sims.iter().for_each(|s| s.clear_calls());
        (ctl, sims, ids)
    }

    fn rig(names: &[&str]) -> (SyncController, Vec<SimHandle>, Vec<EndpointId>) {
        rig_with(SyncConfig::default(), names)
    }

    #[test]
    fn test_reference_scenario() {
        let (mut ctl, sims, _) = rig(&["A", "B"]);
        let (a, b) = (&sims[0], &sims[1]);

        // Paused seek reaches everyone
        ctl.set_position(2.5);
        assert_eq!(a.calls(), vec![Call::SetPosition(2.5)]);
        assert_eq!(b.calls(), vec![Call::SetPosition(2.5)]);
        assert_eq!(ctl.clock().frame_index(), 75);

        // Play: align, then play in registration order
        let journal = SimSurface::journal_for(&[a, b]);
        ctl.set_playing(true);
        let plays: Vec<String> = journal
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| *c == Call::Play)
            .map(|(n, _)| n.clone())
            .collect();
        assert_eq!(plays, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(ctl.state(), SyncState::Playing);

        // Tick samples the primary only
        a.clear_calls();
        b.clear_calls();
        a.drift_to(2.53);
        assert_eq!(ctl.tick(), Some(2.53));
        assert_eq!(ctl.clock().position(), 2.53);
        assert_eq!(ctl.clock().frame_index(), 76);
        assert!(a.calls().is_empty());
        assert!(b.calls().is_empty());
        assert_eq!(b.reads(), 0);

        // Pause: cancel, pause all, realign all
        ctl.set_playing(false);
        assert!(ctl.session().is_none());
        assert_eq!(a.calls(), vec![Call::Pause, Call::SetPosition(2.53)]);
        assert_eq!(b.calls(), vec![Call::Pause, Call::SetPosition(2.53)]);
        assert_eq!(a.native_position(), b.native_position());
    }

    #[test]
    fn test_play_pause_realigns_drifted_surfaces() {
        let (mut ctl, sims, _) = rig(&["A", "B", "C"]);
        ctl.set_position(4.0);
        ctl.set_playing(true);
        sims[0].drift_to(4.2);
        sims[1].drift_to(4.25);
        sims[2].drift_to(4.18);
        ctl.set_playing(false);
        for s in &sims {
            assert_eq!(s.native_position(), ctl.clock().position());
        }
        assert_eq!(ctl.clock().position(), 4.0);
    }

    #[test]
    fn test_second_play_does_not_start_second_session() {
        let (mut ctl, sims, _) = rig(&["A", "B"]);
        ctl.set_playing(true);
        let epoch = ctl.session().map(|s| s.epoch());
        ctl.set_playing(true);
        assert_eq!(ctl.sessions_started(), 1);
        assert_eq!(ctl.session().map(|s| s.epoch()), epoch);

        let reads_before = sims[0].reads();
        ctl.tick();
        assert_eq!(sims[0].reads(), reads_before + 1);
        assert_eq!(sims[0].calls().iter().filter(|c| **c == Call::Play).count(), 1);
    }

    #[test]
    fn test_paused_seek_propagates_once() {
        let (mut ctl, sims, _) = rig(&["A", "B"]);
        ctl.set_position(3.0);
        ctl.set_position(3.0);
        for s in &sims {
            assert_eq!(s.calls(), vec![Call::SetPosition(3.0)]);
        }

        // A later registration aligns only the newcomer
        let c = SimHandle::named("C");
        ctl.register(&c.as_endpoint(), "C");
        assert_eq!(c.calls(), vec![Call::SetPosition(3.0)]);
        for s in &sims {
            assert_eq!(s.calls().len(), 1);
        }
    }

    #[test]
    fn test_seek_while_playing_stays_in_clock() {
        let (mut ctl, sims, _) = rig(&["A", "B"]);
        ctl.set_playing(true);
        sims.iter().for_each(|s| s.clear_calls());

        ctl.set_position(7.0);
        assert_eq!(ctl.clock().position(), 7.0);
        assert!(sims.iter().all(|s| s.calls().is_empty()));
    }

    #[test]
    fn test_unregister_primary_mid_playback() {
        let (mut ctl, sims, ids) = rig(&["A", "B"]);
        ctl.set_position(1.0);
        ctl.set_playing(true);
        sims[0].drift_to(1.1);
        assert_eq!(ctl.tick(), Some(1.1));

        assert!(ctl.unregister(ids[0]));
        assert_eq!(ctl.registry().primary().map(|s| s.id), Some(ids[1]));
        sims[1].drift_to(1.2);
        let reads_a = sims[0].reads();
        assert_eq!(ctl.tick(), Some(1.2));
        assert_eq!(sims[0].reads(), reads_a);
        assert!(!ctl.unregister(ids[0]));
    }

    #[test]
    fn test_dropped_primary_is_pruned_on_tick() {
        let (mut ctl, mut sims, _) = rig(&["A", "B"]);
        ctl.set_playing(true);
        drop(sims.remove(0));
        sims[0].drift_to(0.5);
        assert_eq!(ctl.tick(), Some(0.5));
        assert_eq!(ctl.registry().len(), 1);
    }

    #[test]
    fn test_empty_registry_keeps_intent() {
        let (mut ctl, _, _) = rig(&[]);
        ctl.set_playing(true);
        assert_eq!(ctl.tick(), None);
        assert!(ctl.clock().is_playing());
        assert!(ctl.session().is_some());
    }

    #[test]
    fn test_late_joiner_snaps_and_plays() {
        let (mut ctl, _sims, _) = rig(&["A", "B"]);
        ctl.set_position(4.0);
        ctl.set_playing(true);

        let c = SimHandle::named("C");
        ctl.register(&c.as_endpoint(), "C");
        assert_eq!(c.calls(), vec![Call::SetPosition(4.0), Call::Play]);
        assert!(c.is_playing());
    }

    #[test]
    fn test_first_joiner_becomes_sampled_primary() {
        let (mut ctl, _, _) = rig(&[]);
        ctl.set_position(2.0);
        ctl.set_playing(true);

        let a = SimHandle::named("A").with_duration(10.0);
        let id = ctl.register(&a.as_endpoint(), "A");
        assert_eq!(ctl.sampling_source(), Some(id));
        assert_eq!(a.calls(), vec![Call::SetPosition(2.0), Call::Play]);
        a.drift_to(2.1);
        assert_eq!(ctl.tick(), Some(2.1));
    }

    #[test]
    fn test_late_joiner_waits_when_snapping_disabled() {
        let config = SyncConfig {
            snap_late_joiners: false,
            ..SyncConfig::default()
        };
        let (mut ctl, _sims, _) = rig_with(config, &["A"]);
        ctl.set_playing(true);
        let c = SimHandle::named("C");
        ctl.register(&c.as_endpoint(), "C");
        assert!(c.calls().is_empty());

        ctl.set_playing(false);
        ctl.set_playing(true);
        assert!(c.is_playing());
    }

    #[test]
    fn test_bad_samples_are_dropped() {
        let (mut ctl, sims, _) = rig(&["A"]);
        ctl.set_position(3.0);
        ctl.set_playing(true);

        sims[0].fail_reads(Some(EndpointError::Unavailable));
        assert_eq!(ctl.tick(), None);
        sims[0].fail_reads(None);
        sims[0].drift_to(f64::NAN);
        assert_eq!(ctl.tick(), None);

        assert_eq!(ctl.clock().position(), 3.0);
        assert!(ctl.clock().is_playing());
        assert_eq!(ctl.session().map(|s| s.dropped()), Some(2));
    }

    #[test]
    fn test_primary_error_fails_over() {
        let (mut ctl, sims, ids) = rig(&["A", "B"]);
        ctl.set_playing(true);
        ctl.handle_endpoint_event(ids[0], EndpointEvent::Failed(EndpointError::Decode("bad nal".into())));

        assert_eq!(ctl.sampling_source(), Some(ids[1]));
        assert_eq!(ctl.registry().primary().map(|s| s.id), Some(ids[0]));
        sims[1].drift_to(0.75);
        assert_eq!(ctl.tick(), Some(0.75));
        assert!(ctl.clock().is_playing());
    }

    #[test]
    fn test_primary_error_freezes_with_freeze_policy() {
        let config = SyncConfig {
            primary_error_policy: PrimaryErrorPolicy::Freeze,
            ..SyncConfig::default()
        };
        let (mut ctl, sims, ids) = rig_with(config, &["A", "B"]);
        ctl.set_position(1.0);
        ctl.set_playing(true);
        ctl.handle_endpoint_event(ids[0], EndpointEvent::Failed(EndpointError::Network("reset".into())));
        sims[0].fail_reads(Some(EndpointError::Network("reset".into())));
        sims[1].drift_to(1.5);

        assert_eq!(ctl.sampling_source(), Some(ids[0]));
        assert_eq!(ctl.tick(), None);
        assert_eq!(ctl.clock().position(), 1.0);
    }

    #[test]
    fn test_metadata_clears_error_and_sets_duration() {
        let mut ctl = SyncController::new(SyncConfig::default());
        let a = SimHandle::named("A");
        let id = ctl.register(&a.as_endpoint(), "A");
        ctl.handle_endpoint_event(id, EndpointEvent::Failed(EndpointError::Aborted));
        assert!(!ctl.registry().get(id).unwrap().is_healthy());

        let metadata = MediaMetadata { duration: 12.0, width: 1280, height: 720 };
        ctl.handle_endpoint_event(id, EndpointEvent::LoadedMetadata(metadata));
        assert!(ctl.registry().get(id).unwrap().is_healthy());
        assert_eq!(ctl.clock().duration(), 12.0);

        let longer = MediaMetadata { duration: 15.0, ..metadata };
        ctl.handle_endpoint_event(id, EndpointEvent::LoadedMetadata(longer));
        assert_eq!(ctl.clock().duration(), 12.0);
    }

    #[test]
    fn test_source_end_pauses() {
        let bus = EventBus::new();
        let mut ctl = SyncController::with_bus(SyncConfig::default(), &bus);
        ctl.set_duration(10.0);
        let (a, b) = (SimHandle::named("A").with_duration(10.0), SimHandle::named("B").with_duration(10.0));
        let ida = ctl.register(&a.as_endpoint(), "A");
        let idb = ctl.register(&b.as_endpoint(), "B");
        ctl.set_playing(true);

        // Follower end is only noted
        ctl.handle_endpoint_event(idb, EndpointEvent::Ended);
        assert!(ctl.clock().is_playing());

        a.drift_to(10.0);
        bus.poll();
        ctl.handle_endpoint_event(ida, EndpointEvent::Ended);
        assert!(!ctl.clock().is_playing());
        assert_eq!(ctl.clock().position(), 10.0);
        assert!(!a.is_playing() && !b.is_playing());
        assert_eq!(b.native_position(), 10.0);
        assert!(bus.poll().iter().any(|e| downcast_event::<PlaybackEnded>(e).is_some()));
    }

    #[test]
    fn test_reset_rewinds_and_stops() {
        let (mut ctl, sims, _) = rig(&["A", "B"]);
        ctl.set_frame_rate(25.0);
        ctl.set_position(6.0);
        ctl.set_playing(true);
        ctl.reset();

        assert_eq!(ctl.state(), SyncState::Paused);
        assert!(ctl.session().is_none());
        assert_eq!(ctl.clock().duration(), 0.0);
        assert_eq!(ctl.clock().frame_rate(), 25.0);
        for s in &sims {
            assert!(!s.is_playing());
            assert_eq!(s.native_position(), 0.0);
        }
    }

    #[test]
    fn test_readouts_follow_samples() {
        let bus = EventBus::new();
        let frames = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&frames);
        bus.subscribe::<PositionChanged, _>(move |e| {
            f.store(e.frame_index as usize, Ordering::SeqCst);
        });

        let mut ctl = SyncController::with_bus(SyncConfig::default(), &bus);
        ctl.set_duration(10.0);
        let a = SimHandle::named("A");
        ctl.register(&a.as_endpoint(), "A");
        ctl.set_playing(true);
        a.drift_to(2.0);
        ctl.tick();
        assert_eq!(frames.load(Ordering::SeqCst), 60);
    }

    #[test]
    fn test_reset_updates_readouts() {
        let bus = EventBus::new();
        let playing = Arc::new(Mutex::new(None));
        let frame = Arc::new(Mutex::new(None));
        let p = Arc::clone(&playing);
        bus.subscribe::<PlayingChanged, _>(move |e| *p.lock().unwrap() = Some(e.0));
        let f = Arc::clone(&frame);
        bus.subscribe::<PositionChanged, _>(move |e| *f.lock().unwrap() = Some(e.frame_index));

        let mut ctl = SyncController::with_bus(SyncConfig::default(), &bus);
        ctl.set_duration(10.0);
        let a = SimHandle::named("A");
        ctl.register(&a.as_endpoint(), "A");
        ctl.set_position(4.0);
        ctl.set_playing(true);
        assert_eq!(*playing.lock().unwrap(), Some(true));
        assert_eq!(*frame.lock().unwrap(), Some(120));
        bus.poll();

        ctl.reset();
        assert_eq!(*playing.lock().unwrap(), Some(false));
        assert_eq!(*frame.lock().unwrap(), Some(0));
        let events = bus.poll();
        assert!(events.last().and_then(downcast_event::<ClockReset>).is_some());
    }

    #[test]
    fn test_registration_events() {
        let bus = EventBus::new();
        let mut ctl = SyncController::with_bus(SyncConfig::default(), &bus);
        let (a, b) = (SimHandle::named("A"), SimHandle::named("B"));

        let ida = ctl.register(&a.as_endpoint(), "A");
        let events = bus.poll();
        assert_eq!(events.len(), 2);
        let registered = downcast_event::<EndpointRegistered>(&events[0]).unwrap();
        assert_eq!((registered.id, registered.label.as_str()), (ida, "A"));
        assert_eq!(downcast_event::<PrimaryChanged>(&events[1]).unwrap().0, Some(ida));

        // A follower does not change the primary
        ctl.register(&b.as_endpoint(), "B");
        let events = bus.poll();
        assert_eq!(events.len(), 1);
        assert!(downcast_event::<EndpointRegistered>(&events[0]).is_some());
    }

    #[test]
    fn test_primary_removal_is_reported() {
        let bus = EventBus::new();
        let mut ctl = SyncController::with_bus(SyncConfig::default(), &bus);
        ctl.set_duration(10.0);
        let (a, b) = (SimHandle::named("A"), SimHandle::named("B"));
        let ida = ctl.register(&a.as_endpoint(), "A");
        let idb = ctl.register(&b.as_endpoint(), "B");
        ctl.set_playing(true);
        bus.poll();

        assert!(ctl.unregister(ida));
        let events = bus.poll();
        assert_eq!(events.len(), 2);
        let removed = downcast_event::<EndpointUnregistered>(&events[0]).unwrap();
        assert_eq!(removed.id, ida);
        assert!(removed.was_primary);
        assert_eq!(downcast_event::<PrimaryChanged>(&events[1]).unwrap().0, Some(idb));

        // Last one out leaves no primary
        assert!(ctl.unregister(idb));
        let events = bus.poll();
        assert_eq!(downcast_event::<PrimaryChanged>(&events[1]).unwrap().0, None);
    }

    #[test]
    fn test_failure_is_published_with_label() {
        let bus = EventBus::new();
        let mut ctl = SyncController::with_bus(SyncConfig::default(), &bus);
        let a = SimHandle::named("A");
        let id = ctl.register(&a.as_endpoint(), "left");
        bus.poll();

        ctl.handle_endpoint_event(id, EndpointEvent::Failed(EndpointError::Decode("bad nal".into())));
        let events = bus.poll();
        let failed = events
            .iter()
            .find_map(downcast_event::<EndpointFailed>)
            .unwrap();
        assert_eq!(failed.id, id);
        assert_eq!(failed.label, "left");
        assert_eq!(failed.error, EndpointError::Decode("bad nal".into()));
        assert_eq!(failed.error_label, "decode error");
        assert_eq!(ctl.config().primary_error_policy, PrimaryErrorPolicy::Failover);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let (mut ctl, sims, _) = rig(&["A", "B"]);
        ctl.set_playing(true);
        ctl.shutdown();
        assert!(ctl.session().is_none());
        assert!(ctl.registry().is_empty());
        assert_eq!(ctl.tick(), None);
        // Surfaces are left as they were; the UI owns them
        assert!(sims[0].is_playing());
    }
}
