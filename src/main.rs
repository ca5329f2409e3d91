//! Mobile Sensing Agent CLI
//!
//! Continuous multi-sensor capture with durable per-session logs.

use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mobile_sensing_agent::{
    config::Config,
    lease::{LogLivenessIndicator, ProcessKeepAlive},
    provider::{synthetic::spawn_feed, SyntheticProvider},
    registry::SensorRegistry,
    sensor::{SensorKind, CATALOG},
    service::{CaptureService, CaptureState},
    VERSION,
};

#[derive(Parser)]
#[command(name = "mobile-sensing")]
#[command(version = VERSION)]
#[command(about = "Continuous multi-sensor capture agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start capturing sensor data until interrupted
    Start {
        /// Synthetic sample rate in Hz
        #[arg(long, default_value = "20")]
        sample_hz: u64,
    },

    /// Pause a running capture
    Pause,

    /// Resume a paused capture
    Resume,

    /// Show agent status and sensor availability
    Status,

    /// List the sensor catalog with per-device flags
    Sensors,

    /// Enable a sensor for future sessions
    Enable {
        /// Catalog name, e.g. "Accelerometer" or "Audio Level"
        sensor: String,
    },

    /// Disable a sensor for future sessions
    Disable {
        /// Catalog name, e.g. "Accelerometer" or "Audio Level"
        sensor: String,
    },

    /// Clear the availability cache and re-probe every sensor
    Probe,
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { sample_hz } => cmd_start(sample_hz),
        Commands::Pause => cmd_pause(),
        Commands::Resume => cmd_resume(),
        Commands::Status => cmd_status(),
        Commands::Sensors => cmd_sensors(),
        Commands::Enable { sensor } => cmd_set_enabled(&sensor, true),
        Commands::Disable { sensor } => cmd_set_enabled(&sensor, false),
        Commands::Probe => cmd_probe(),
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn cmd_start(sample_hz: u64) {
    println!("Mobile Sensing Agent v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Error: could not create directories: {e}");
        std::process::exit(1);
    }

    let provider = Arc::new(SyntheticProvider::new());
    let mut registry = SensorRegistry::with_persistence(config.registry_path());
    let compatible = registry.probe_all(provider.as_ref());

    println!("Sensors: {compatible} compatible");
    for descriptor in CATALOG {
        if registry.is_enabled(descriptor.kind) && registry.is_compatible(descriptor.kind) {
            println!("  {} (capturing)", descriptor.name);
        }
    }
    println!("Storage root: {}", config.storage_root.display());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut service = CaptureService::new(
        provider.clone(),
        registry,
        config.storage_root.clone(),
        Box::new(ProcessKeepAlive),
        Box::new(LogLivenessIndicator),
    );

    // Support pause/resume from another process by polling the config file.
    // If paused at startup, wait until resumed before starting a session.
    let mut paused = config.paused;
    if paused {
        println!("Capture is currently paused.");
        println!("Run `mobile-sensing resume` to begin capturing.");
        println!();
    } else if let Err(e) = service.start_sensing() {
        eprintln!("Error starting capture: {e}");
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let period = Duration::from_millis(1000 / sample_hz.max(1));
    let feed = spawn_feed(provider, period, running.clone());

    let mut last_config_check = std::time::Instant::now();
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
        service.renew_stay_alive();

        if last_config_check.elapsed() < Duration::from_secs(1) {
            continue;
        }
        last_config_check = std::time::Instant::now();

        if let Ok(cfg) = Config::load() {
            if cfg.paused != paused {
                paused = cfg.paused;
                if paused {
                    println!();
                    println!("Pausing capture...");
                    if let Err(e) = service.pause_sensing() {
                        eprintln!("Error pausing: {e}");
                    }
                } else {
                    println!();
                    println!("Resuming capture...");
                    let result = match service.state() {
                        CaptureState::Paused => service.resume_sensing(),
                        CaptureState::Stopped => service.start_sensing(),
                        CaptureState::Sensing => Ok(()),
                    };
                    if let Err(e) = result {
                        eprintln!("Error resuming: {e}");
                    }
                }
            }
        }
    }

    println!();
    println!("Stopping capture...");
    let session_dir = service.session_directory();
    if let Err(e) = service.stop_sensing() {
        eprintln!("Error stopping capture: {e}");
    }
    let _ = feed.join();

    if let Some(dir) = session_dir {
        println!();
        println!("Session saved to {}", dir.display());
        if let Ok(entries) = std::fs::read_dir(&dir) {
            let mut logs: Vec<_> = entries.filter_map(|e| e.ok()).collect();
            logs.sort_by_key(|e| e.file_name());
            for entry in logs {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                println!("  {} ({size} bytes)", entry.file_name().to_string_lossy());
            }
        }
    }
}

fn cmd_pause() {
    let mut config = Config::load().unwrap_or_default();
    config.paused = true;
    if let Err(e) = config.save() {
        eprintln!("Error saving config: {e}");
        std::process::exit(1);
    }
    println!("Capture paused. Use 'mobile-sensing resume' to continue.");
}

fn cmd_resume() {
    let mut config = Config::load().unwrap_or_default();
    config.paused = false;
    if let Err(e) = config.save() {
        eprintln!("Error saving config: {e}");
        std::process::exit(1);
    }
    println!("Capture resumed.");
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();
    let registry = SensorRegistry::with_persistence(config.registry_path());

    println!("Mobile Sensing Agent Status");
    println!("===========================");
    println!();
    println!("Config file:  {}", Config::config_path().display());
    println!("Storage root: {}", config.storage_root.display());
    println!("Paused:       {}", config.paused);
    println!();

    let capturing: Vec<&str> = CATALOG
        .iter()
        .filter(|d| registry.is_compatible(d.kind) && registry.is_enabled(d.kind))
        .map(|d| d.name)
        .collect();
    if capturing.is_empty() {
        println!("No sensors will be captured in the next session.");
        println!("Run 'mobile-sensing probe' to detect available sensors.");
    } else {
        println!("Next session will capture: {}", capturing.join(", "));
    }
}

fn cmd_sensors() {
    let config = Config::load().unwrap_or_default();
    let registry = SensorRegistry::with_persistence(config.registry_path());

    println!("{:<20} {:<12} {:<10} {}", "Sensor", "Compatible", "Enabled", "Permission");
    for descriptor in CATALOG {
        let compatible = if !registry.is_probed(descriptor.kind) {
            "unprobed"
        } else if registry.is_compatible(descriptor.kind) {
            "yes"
        } else {
            "no"
        };
        let enabled = if registry.is_enabled(descriptor.kind) {
            "yes"
        } else {
            "no"
        };
        let permission = if descriptor.requires_permission {
            "required"
        } else {
            "-"
        };
        println!("{:<20} {compatible:<12} {enabled:<10} {permission}", descriptor.name);
    }
}

fn cmd_set_enabled(sensor: &str, enabled: bool) {
    let Some(kind) = SensorKind::from_name(sensor) else {
        eprintln!("Unknown sensor: {sensor}");
        eprintln!("Run 'mobile-sensing sensors' to list the catalog.");
        std::process::exit(1);
    };

    let config = Config::load().unwrap_or_default();
    let mut registry = SensorRegistry::with_persistence(config.registry_path());
    if let Err(e) = registry.set_enabled(kind, enabled) {
        eprintln!("Error saving sensor flags: {e}");
        std::process::exit(1);
    }

    println!(
        "{} {} for future sessions.",
        kind.name(),
        if enabled { "enabled" } else { "disabled" }
    );
    if enabled && registry.is_probed(kind) && !registry.is_compatible(kind) {
        println!("Note: {} is not compatible with this device and will be skipped.", kind.name());
    }
}

fn cmd_probe() {
    let config = Config::load().unwrap_or_default();
    let provider = SyntheticProvider::new();
    let mut registry = SensorRegistry::with_persistence(config.registry_path());

    registry.invalidate();
    let compatible = registry.probe_all(&provider);
    println!("Probed {} sensors: {compatible} compatible.", CATALOG.len());
}
