use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use serde::Serialize;
use std::time::{Duration, Instant};

use syncview::cli::Args;
use syncview::config::{self, SyncConfig};
use syncview::core::sync_events::{EndpointFailed, PlaybackEnded, PrimaryChanged};
use syncview::sim::SimHandle;
use syncview::{ControlSurface, EndpointEvent, EndpointId, EventBus, MediaMetadata, SyncController};

/// Host refresh rate the session is ticked at
const TICK_HZ: f64 = 60.0;

#[derive(Serialize)]
struct SurfaceReport {
    name: String,
    position: f64,
    playing: bool,
    offset_ms: f64,
}

/// Scripted viewing session over simulated surfaces, driven on a virtual clock.
struct Scenario {
    controller: SyncController,
    controls: ControlSurface,
    bus: EventBus,
    views: Vec<(SimHandle, EndpointId)>,
    start: Instant,
    elapsed: Duration,
}

impl Scenario {
    fn now(&self) -> Instant {
        self.start + self.elapsed
    }

    /// Advance virtual time by one host tick.
    fn step(&mut self) {
        let dt = 1.0 / TICK_HZ;
        self.elapsed += Duration::from_secs_f64(dt);
        for (view, id) in &self.views {
            if view.advance(dt) {
                self.controller.handle_endpoint_event(*id, EndpointEvent::Ended);
            }
        }
        self.controller.tick();
        let now = self.now();
        self.controls.tick_at(&mut self.controller, now);
        // Readouts consume events through callbacks; keep the queue drained
        let drained = self.bus.poll().len();
        if drained > 0 {
            log::trace!("{} event(s) this tick", drained);
        }
    }

    fn run_for(&mut self, seconds: f64) {
        let steps = (seconds * TICK_HZ).round().max(0.0) as u64;
        for _ in 0..steps {
            self.step();
        }
    }

    /// Drag the slider from the current position to `target` over `seconds`,
    /// one input event per millisecond.
    fn drag_to(&mut self, target: f64, seconds: f64) {
        let from = self.controller.clock().position();
        let events = (seconds * 1000.0).round().max(1.0) as u64;
        let tick_every = (1000.0 / TICK_HZ).round() as u64;
        for i in 1..=events {
            let value = from + (target - from) * i as f64 / events as f64;
            let now = self.now();
            self.controls.on_slider_input_at(&mut self.controller, value, now);
            self.elapsed += Duration::from_millis(1);
            if i % tick_every == 0 {
                self.step();
            }
        }
        // Let the trailing value land
        self.step();
        self.step();
    }

    fn print_snapshot(&self, label: &str) -> Result<()> {
        let line = serde_json::json!({
            "step": label,
            "clock": self.controller.clock().snapshot(),
        });
        println!("{}", serde_json::to_string(&line).context("Failed to serialize snapshot")?);
        Ok(())
    }

    fn report(&self) -> Vec<SurfaceReport> {
        let clock = self.controller.clock().position();
        self.views
            .iter()
            .map(|(view, _)| SurfaceReport {
                name: view.name(),
                position: view.native_position(),
                playing: view.is_playing(),
                offset_ms: (view.native_position() - clock) * 1000.0,
            })
            .collect()
    }
}

fn init_logger(args: &Args, path_config: &config::PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file(config::LOG_FILE, path_config));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }
    init_logger(&args, &path_config)?;

    info!("syncview starting...");
    debug!("Command-line args: {:?}", args);

    let config_path = config::config_file(config::CONFIG_FILE, &path_config);
    info!("Config path: {}", config_path.display());
    let mut sync_config = SyncConfig::load(&config_path)?;
    if let Some(fps) = args.fps {
        sync_config.default_frame_rate = fps;
    }

    if args.write_config {
        sync_config.save(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let bus = EventBus::new();
    bus.subscribe::<PlaybackEnded, _>(|e| info!("Playback ended on {} at {:.3}s", e.id, e.position));
    bus.subscribe::<PrimaryChanged, _>(|e| match e.0 {
        Some(id) => debug!("Primary is now {}", id),
        None => debug!("No primary"),
    });
    bus.subscribe::<EndpointFailed, _>(|e| log::warn!("{} [{}]: {}", e.label, e.error_label, e.error));

    let mut controller = SyncController::with_bus(sync_config.clone(), &bus);
    controller.set_frame_rate(sync_config.default_frame_rate);

    // Mount views; the first plays at nominal rate, the rest skew up to --drift
    let drift = args.drift / 100.0;
    let spread = args.views.saturating_sub(1).max(1) as f64;
    let mut views = Vec::with_capacity(args.views);
    for i in 0..args.views {
        let name = format!("view-{}", i);
        let rate = 1.0 + drift * (i as f64 / spread) * if i % 2 == 0 { 1.0 } else { -1.0 };
        let view = SimHandle::named(name.clone())
            .with_duration(args.duration)
            .with_rate(rate);
        let id = controller.register(&view.as_endpoint(), name);
        debug!("Mounted {} at rate {:.4}", id, rate);
        views.push((view, id));
    }
    for (_, id) in &views {
        let metadata = MediaMetadata {
            duration: args.duration,
            width: 1920,
            height: 1080,
        };
        controller.handle_endpoint_event(*id, EndpointEvent::LoadedMetadata(metadata));
    }

    let controls = ControlSurface::from_config(controller.config());
    let mut scenario = Scenario {
        controls,
        controller,
        bus,
        views,
        start: Instant::now(),
        elapsed: Duration::ZERO,
    };
    scenario.print_snapshot("loaded")?;

    let now = scenario.now();
    scenario
        .controls
        .on_slider_input_at(&mut scenario.controller, args.duration * 0.1, now);
    scenario.step();
    scenario.print_snapshot("seek")?;

    scenario.controls.toggle_playing(&mut scenario.controller);
    scenario.run_for(args.seconds);
    scenario.print_snapshot("played")?;

    // Scrub back while playing: pauses first
    let target = (scenario.controller.clock().position() - args.seconds * 0.5).max(0.0);
    scenario.drag_to(target, 0.25);
    scenario.print_snapshot("scrubbed")?;

    scenario.controls.step_frames(&mut scenario.controller, 5);
    scenario.print_snapshot("stepped")?;

    scenario.controls.toggle_playing(&mut scenario.controller);
    scenario.run_for(args.seconds);
    scenario.print_snapshot("resumed")?;

    if scenario.controller.clock().is_playing() {
        scenario.controls.toggle_playing(&mut scenario.controller);
    }
    scenario.print_snapshot("paused")?;

    let report = scenario.report();
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize surface report")?
    );
    if let Some(s) = scenario.controller.session() {
        debug!("Sampling session #{} still live", s.epoch());
    }
    info!(
        "Done: {} session(s), {} view(s)",
        scenario.controller.sessions_started(),
        scenario.views.len()
    );
    Ok(())
}
