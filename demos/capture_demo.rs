//! Demonstration of the Mobile Sensing Agent capture pipeline.
//!
//! This example shows how to:
//! 1. Probe a provider for sensor availability
//! 2. Create a capture service and start a session
//! 3. Pause and resume without losing the session
//! 4. Stop and inspect the per-sensor logs
//!
//! Run with: cargo run --example capture_demo

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mobile_sensing_agent::{
    lease::{LogLivenessIndicator, ProcessKeepAlive},
    provider::{synthetic::spawn_feed, SyntheticProvider},
    registry::SensorRegistry,
    sensor::{SensorKind, CATALOG},
    service::CaptureService,
};

fn main() {
    println!("Mobile Sensing Agent - Capture Demo");
    println!("===================================");
    println!();

    let storage_root = std::env::temp_dir().join("mobile-sensing-demo");

    // Probe the provider for availability; pretend one sensor is missing.
    let provider = Arc::new(SyntheticProvider::new());
    provider.mark_unsupported(SensorKind::AmbientTemperature);

    let mut registry = SensorRegistry::new();
    let compatible = registry.probe_all(provider.as_ref());
    println!("Probe found {compatible}/{} sensors compatible", CATALOG.len());

    // Keep the demo output small: capture three sensors.
    for descriptor in CATALOG {
        let keep = matches!(
            descriptor.kind,
            SensorKind::Accelerometer | SensorKind::Gyroscope | SensorKind::Battery
        );
        let _ = registry.set_enabled(descriptor.kind, keep);
    }

    let mut service = CaptureService::new(
        provider.clone(),
        registry,
        storage_root,
        Box::new(ProcessKeepAlive),
        Box::new(LogLivenessIndicator),
    );

    println!();
    println!("Starting capture for 6 seconds (pausing in the middle)...");
    if let Err(e) = service.start_sensing() {
        eprintln!("Error starting capture: {e}");
        return;
    }

    let running = Arc::new(AtomicBool::new(true));
    let feed = spawn_feed(provider, Duration::from_millis(50), running.clone());

    thread::sleep(Duration::from_secs(2));

    println!("Pausing...");
    if let Err(e) = service.pause_sensing() {
        eprintln!("Error pausing: {e}");
    }
    thread::sleep(Duration::from_secs(2));

    println!("Resuming...");
    if let Err(e) = service.resume_sensing() {
        eprintln!("Error resuming: {e}");
    }
    thread::sleep(Duration::from_secs(2));

    println!("Stopping...");
    let session_dir = service.session_directory();
    if let Err(e) = service.stop_sensing() {
        eprintln!("Error stopping: {e}");
    }
    running.store(false, Ordering::SeqCst);
    let _ = feed.join();

    if let Some(dir) = session_dir {
        println!();
        println!("Session directory: {}", dir.display());
        if let Ok(entries) = std::fs::read_dir(&dir) {
            let mut logs: Vec<_> = entries.filter_map(|e| e.ok()).collect();
            logs.sort_by_key(|e| e.file_name());
            for entry in logs {
                let lines = std::fs::read_to_string(entry.path())
                    .map(|c| c.lines().count())
                    .unwrap_or(0);
                println!("  {} ({lines} samples)", entry.file_name().to_string_lossy());
            }
        }
    }

    println!();
    println!("Demo complete!");
}
