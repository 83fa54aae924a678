//! # PV Bridge Binary
//!
//! Runs the sync engine against a process-image driver, with the in-memory
//! variable table standing in for the network framework.
//!
//! # Usage
//!
//! ```bash
//! # Simulation driver, config from /etc/pvbridge
//! pvbridge
//!
//! # Explicit config directory, verbose JSON logs
//! pvbridge --config-dir config/ -v --json
//! ```

use clap::Parser;
use pvbridge_common::config::{ConfigError, LogLevel};
use pvbridge_common::consts::DEFAULT_CONFIG_PATH;
use pvbridge_common::io::config::ImageConfig;
use pvbridge_hal::ImageRegistry;
use pvbridge_sync::config::{AppConfig, load_config_dir};
use pvbridge_sync::{Engine, EngineState, VariableTable};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// PV Bridge - keeps a hardware process image and process variables in sync
#[derive(Parser, Debug)]
#[command(name = "pvbridge")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Synchronizes a hardware process image with process variables")]
#[command(long_about = None)]
struct Args {
    /// Config directory (config.toml + io.toml)
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CONFIG_PATH)]
    config_dir: PathBuf,

    /// Process-image driver
    #[arg(short, long, default_value = "simulation")]
    driver: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// How often the main thread checks for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    let args = Args::parse();
    let loaded = load_config_dir(&args.config_dir);

    setup_tracing(&args, loaded.as_ref().ok().map(|(app, _)| app));

    if let Err(e) = run(&args, loaded) {
        error!("pvbridge failed: {}", e);
        std::process::exit(1);
    }
}

fn run(
    args: &Args,
    loaded: Result<(AppConfig, ImageConfig), ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("PV Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    let (app, io_config) =
        loaded.map_err(|e| format!("loading config from {}: {e}", args.config_dir.display()))?;
    info!(
        "Service '{}': {} bindings, {} process-image points",
        app.shared.service_name,
        app.bindings.len(),
        io_config.points.len()
    );

    let registry = ImageRegistry::with_builtin();
    debug!("Available drivers: {:?}", registry.list_drivers());
    let image = registry.create_image(&args.driver, &io_config)?;
    info!("Process image driver: {}", image.name());

    let variables = Arc::new(VariableTable::new());
    let mut engine = Engine::new(image, variables.clone());
    engine.init(app.cycle)?;
    for binding in &app.bindings {
        binding.create(&mut engine)?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    engine.start(None)?;

    while running.load(Ordering::SeqCst) && engine.state() == EngineState::Running {
        std::thread::sleep(POLL_INTERVAL);
    }

    if !engine.stop() {
        warn!("Engine did not stop cleanly");
    }

    let stats = engine.stats();
    info!(stats = %serde_json::to_string(&stats)?, "Final cycle statistics");
    debug!(
        variables = %serde_json::to_string(&variables.snapshot())?,
        "Final variable values"
    );

    info!("PV Bridge shutdown complete");
    Ok(())
}

/// Setup tracing from CLI arguments and, when available, the config.
fn setup_tracing(args: &Args, app: Option<&AppConfig>) {
    let configured = app.map_or(LogLevel::Info, |a| a.shared.log_level);
    let debug_requested = args.verbose || app.is_some_and(|a| a.cycle.debug);
    let level = if debug_requested {
        Level::DEBUG.max(Level::from(configured))
    } else {
        Level::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
