//! Simulated playback surface.
//!
//! Stands in for a decoder-backed surface in the headless binary and in
//! tests: advances its own native time at a configurable rate (so followers
//! drift) and records every call the engine makes on it.

use crate::core::endpoint::{EndpointError, EndpointRef, MediaEndpoint};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_SIM_ID: AtomicUsize = AtomicUsize::new(0);

/// Engine → surface call, as recorded by the simulator
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    SetPosition(f64),
    Play,
    Pause,
}

/// Cross-surface call log: (surface name, call)
pub type Journal = Arc<Mutex<Vec<(String, Call)>>>;

#[derive(Debug)]
pub struct SimSurface {
    name: String,
    position: f64,
    duration: Option<f64>,
    rate: f64,
    playing: bool,
    read_error: Option<EndpointError>,
    reads: Cell<usize>,
    calls: Vec<Call>,
    journal: Option<Journal>,
}

impl SimSurface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: 0.0,
            duration: None,
            rate: 1.0,
            playing: false,
            read_error: None,
            reads: Cell::new(0),
            calls: Vec::new(),
            journal: None,
        }
    }

    /// Auto-named shared surface
    pub fn shared() -> SimHandle {
        let n = NEXT_SIM_ID.fetch_add(1, Ordering::Relaxed);
        SimHandle::new(Self::new(format!("sim-{}", n)))
    }

    /// Attach one journal to several surfaces to check cross-surface ordering.
    pub fn journal_for(handles: &[&SimHandle]) -> Journal {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        for h in handles {
            h.lock().journal = Some(Arc::clone(&journal));
        }
        journal
    }

    fn record(&mut self, call: Call) {
        if let Some(journal) = &self.journal {
            journal
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((self.name.clone(), call.clone()));
        }
        self.calls.push(call);
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let upper = self.duration.unwrap_or(f64::INFINITY);
        seconds.clamp(0.0, upper)
    }
}

impl MediaEndpoint for SimSurface {
    fn position(&self) -> Result<f64, EndpointError> {
        self.reads.set(self.reads.get() + 1);
        match &self.read_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.position),
        }
    }

    fn set_position(&mut self, seconds: f64) {
        self.record(Call::SetPosition(seconds));
        self.position = self.clamp(seconds);
    }

    fn play(&mut self) {
        self.record(Call::Play);
        self.playing = true;
    }

    fn pause(&mut self) {
        self.record(Call::Pause);
        self.playing = false;
    }
}

/// Owning handle, as held by the UI that mounts the surface.
///
/// Inspecting through the handle is not counted as an engine read.
#[derive(Clone, Debug)]
pub struct SimHandle(Arc<Mutex<SimSurface>>);

impl SimHandle {
    pub fn new(surface: SimSurface) -> Self {
        Self(Arc::new(Mutex::new(surface)))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(SimSurface::new(name))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimSurface> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Type-erased handle for registration
    pub fn as_endpoint(&self) -> EndpointRef {
        self.0.clone()
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn native_position(&self) -> f64 {
        self.lock().position
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Number of times the engine sampled this surface
    pub fn reads(&self) -> usize {
        self.lock().reads.get()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn with_duration(self, seconds: f64) -> Self {
        self.lock().duration = Some(seconds);
        self
    }

    /// Playback speed relative to wall time (1.0 = nominal)
    pub fn with_rate(self, rate: f64) -> Self {
        self.lock().rate = rate;
        self
    }

    /// Move native time without going through the engine (decoder drift).
    pub fn drift_to(&self, seconds: f64) {
        let mut s = self.lock();
        s.position = s.clamp(seconds);
    }

    pub fn fail_reads(&self, error: Option<EndpointError>) {
        self.lock().read_error = error;
    }

    /// Advance native time by `dt` seconds if playing.
    /// Returns true when this step reached the end of the media.
    pub fn advance(&self, dt: f64) -> bool {
        let mut s = self.lock();
        if !s.playing {
            return false;
        }
        let next = s.clamp(s.position + dt * s.rate);
        s.position = next;
        match s.duration {
            Some(d) if next >= d => {
                s.playing = false;
                true
            }
            _ => false,
        }
    }
}
