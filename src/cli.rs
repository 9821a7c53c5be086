use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Headless multi-view playback sync simulator
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Number of simulated views to mount
    #[arg(short = 'n', long = "views", value_name = "N", default_value_t = 3)]
    pub views: usize,

    /// Recording duration in seconds
    #[arg(short = 'd', long = "duration", value_name = "SECONDS", default_value_t = 12.0)]
    pub duration: f64,

    /// Frame rate (default: from config)
    #[arg(long = "fps", value_name = "HZ")]
    pub fps: Option<f64>,

    /// Max playback rate skew between views, in percent
    #[arg(long = "drift", value_name = "PCT", default_value_t = 1.0)]
    pub drift: f64,

    /// Seconds of playback per scripted play phase
    #[arg(short = 's', long = "seconds", value_name = "SECONDS", default_value_t = 2.0)]
    pub seconds: f64,

    /// Enable debug logging to file (default: syncview.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Write the effective configuration to the config directory and exit
    #[arg(long = "write-config")]
    pub write_config: bool,
}
