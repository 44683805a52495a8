//! Inspector CLI Application
//!
//! Command-line front end for the inspector-core library. It reads JSON
//! recordings and prints what the panels would show:
//! - Flame chart layout of a timeline recording
//! - Promise tree of a stream of promise notifications
//! - Emulated device catalog, with import into the custom list

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

/// Inspector - Lay out timelines, promise trees and device lists
#[derive(Parser, Debug)]
#[command(name = "inspector-cli")]
#[command(about = "Run inspector data kernels over JSON recordings", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the flame chart layout of a timeline model (JSON)
    Timeline {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Collect flow edges between events
        #[arg(long)]
        flows: bool,

        /// Include the GPU task region
        #[arg(long)]
        gpu: bool,
    },

    /// Replay promise notifications (JSON array or JSON lines) and print the tree
    Promises {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target whose tree is printed
        #[arg(short, long, default_value = commands::DEFAULT_TARGET)]
        target: String,

        /// Only show promises with these statuses (can be repeated)
        #[arg(short, long, value_name = "STATUS")]
        status: Vec<String>,
    },

    /// List emulated devices
    Devices {
        /// Add every valid device in this JSON list to the custom devices
        #[arg(long, value_name = "FILE")]
        import: Option<PathBuf>,

        /// Also list devices that are hidden by default
        #[arg(short, long)]
        all: bool,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Inspector CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using inspector-core library v{}", inspector_core::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    match args.command {
        Command::Timeline { file, flows, gpu } => {
            let mut timeline = app_config.timeline;
            if flows {
                timeline = timeline.with_flow_events(true);
            }
            if gpu {
                timeline = timeline.with_gpu_timeline(true);
            }
            commands::run_timeline(&file, timeline)
        }
        Command::Promises { file, target, status } => {
            let filter = commands::status_filter(app_config.promises, &status)?;
            commands::run_promises(&file, &target, filter)
        }
        Command::Devices { import, all } => commands::run_devices(&app_config.devices, import.as_deref(), all),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args()))
        .init();
}
