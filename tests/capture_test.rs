//! Integration tests for the capture pipeline: session lifecycle,
//! degradation on provider failures, and log file integrity.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use mobile_sensing_agent::{
    lease::{LogLivenessIndicator, ProcessKeepAlive},
    provider::SyntheticProvider,
    registry::SensorRegistry,
    sensor::{SensorKind, SensorReading, SensorSample},
    service::{CaptureService, CaptureState},
    session::CaptureSession,
};

fn scratch_root(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "mobile-sensing-capture-{tag}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn registry_for(provider: &SyntheticProvider, kinds: &[SensorKind]) -> SensorRegistry {
    let mut registry = SensorRegistry::new();
    for &kind in kinds {
        registry.probe_and_cache(kind, provider);
    }
    registry
}

fn service_for(
    provider: Arc<SyntheticProvider>,
    registry: SensorRegistry,
    root: PathBuf,
) -> CaptureService {
    CaptureService::new(
        provider,
        registry,
        root,
        Box::new(ProcessKeepAlive),
        Box::new(LogLivenessIndicator),
    )
}

fn csv_files(dir: &PathBuf) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read session dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".csv"))
        .collect();
    names.sort();
    names
}

#[test]
fn probing_twice_is_idempotent_and_memoized() {
    let provider = SyntheticProvider::new();
    provider.mark_unsupported(SensorKind::StepDetector);
    let mut registry = SensorRegistry::new();

    let good_first = registry.probe_and_cache(SensorKind::Accelerometer, &provider);
    let bad_first = registry.probe_and_cache(SensorKind::StepDetector, &provider);
    let calls = provider.call_count();

    let good_second = registry.probe_and_cache(SensorKind::Accelerometer, &provider);
    let bad_second = registry.probe_and_cache(SensorKind::StepDetector, &provider);

    assert_eq!(good_first, good_second);
    assert_eq!(bad_first, bad_second);
    assert!(good_first);
    assert!(!bad_first);
    // Cached probes perform no provider calls.
    assert_eq!(provider.call_count(), calls);
}

#[test]
fn registration_failure_leaves_other_streams_live() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = registry_for(
        &provider,
        &[SensorKind::Accelerometer, SensorKind::Gyroscope],
    );
    provider.fail_register(SensorKind::Gyroscope);
    let root = scratch_root("degraded-register");

    let mut session =
        CaptureSession::create(provider.clone(), &registry, &root, "s1").expect("create");
    assert_eq!(session.active_sensors(), vec![SensorKind::Accelerometer]);
    session.start().expect("start");

    // The surviving stream is live and writable.
    assert!(provider.emit(
        SensorKind::Accelerometer,
        &SensorSample::triaxial(1.0, 2.0, 3.0)
    ));

    session.stop().expect("stop");
    session.close().expect("close");

    let dir = root.join("s1");
    assert_eq!(csv_files(&dir), vec!["Accelerometer.csv".to_string()]);
}

#[test]
fn start_failure_leaves_no_log_for_failing_sensor() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = registry_for(
        &provider,
        &[SensorKind::Accelerometer, SensorKind::Gyroscope],
    );
    provider.fail_start(SensorKind::Gyroscope);
    let root = scratch_root("degraded-start");

    let mut session =
        CaptureSession::create(provider.clone(), &registry, &root, "s1").expect("create");
    session.start().expect("start");

    // Exactly one stream remains open and capturing.
    assert_eq!(session.active_sensors(), vec![SensorKind::Accelerometer]);
    assert!(provider.emit(
        SensorKind::Accelerometer,
        &SensorSample::triaxial(0.1, 0.2, 0.3)
    ));

    session.stop().expect("stop");
    session.close().expect("close");

    let dir = root.join("s1");
    assert_eq!(csv_files(&dir), vec!["Accelerometer.csv".to_string()]);
}

#[test]
fn stop_then_close_leaves_complete_files() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = registry_for(&provider, &[SensorKind::Accelerometer, SensorKind::Light]);
    let root = scratch_root("integrity");

    let mut session =
        CaptureSession::create(provider.clone(), &registry, &root, "s1").expect("create");
    session.start().expect("start");

    for i in 0..50 {
        provider.emit(
            SensorKind::Accelerometer,
            &SensorSample::triaxial(i as f64, 0.0, 0.0),
        );
        provider.emit(SensorKind::Light, &SensorSample::scalar(100.0 + i as f64));
    }

    session.stop().expect("stop");
    session.close().expect("close");

    let dir = root.join("s1");
    for name in ["Accelerometer.csv", "Light.csv"] {
        let content = std::fs::read_to_string(dir.join(name)).expect("log present");
        assert!(!content.is_empty(), "{name} should not be empty");
        // No partial trailing record: the file ends on a record boundary.
        assert!(content.ends_with('\n'), "{name} has a truncated final record");
        assert_eq!(content.lines().count(), 50);
    }
}

#[test]
fn accelerometer_scenario_three_samples_in_order() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = registry_for(&provider, &[SensorKind::Accelerometer]);
    let root = scratch_root("accel-scenario");

    let mut session =
        CaptureSession::create(provider.clone(), &registry, &root, "s1").expect("create");
    session.start().expect("start");

    let samples = [
        (0, (0.0, 0.0, 0.0)),
        (10, (1.0, 2.0, 3.0)),
        (20, (4.0, 5.0, 6.0)),
    ];
    for (millis, (x, y, z)) in samples {
        let ts = Utc.timestamp_millis_opt(millis).unwrap();
        let sample = SensorSample::at(ts, SensorReading::Triaxial { x, y, z });
        assert!(provider.emit(SensorKind::Accelerometer, &sample));
    }

    session.stop().expect("stop");
    session.close().expect("close");

    let dir = root.join("s1");
    assert_eq!(csv_files(&dir), vec!["Accelerometer.csv".to_string()]);

    let content = std::fs::read_to_string(dir.join("Accelerometer.csv")).expect("read log");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec!["0,0,0,0", "10,1,2,3", "20,4,5,6"]);
}

#[test]
fn pause_resume_reuses_session_and_files() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = registry_for(&provider, &[SensorKind::Accelerometer]);
    let root = scratch_root("pause-resume");
    let mut service = service_for(provider.clone(), registry, root.clone());

    service.start_sensing().expect("start");
    let dir = service.session_directory().expect("session dir");
    provider.emit(
        SensorKind::Accelerometer,
        &SensorSample::triaxial(1.0, 0.0, 0.0),
    );

    service.pause_sensing().expect("pause");
    assert_eq!(service.state(), CaptureState::Paused);

    // Paused means flushed: the first sample is already on disk.
    let log = dir.join("Accelerometer.csv");
    let after_pause = std::fs::read_to_string(&log).expect("read log");
    assert_eq!(after_pause.lines().count(), 1);

    // While paused, delivery is refused.
    assert!(!provider.emit(
        SensorKind::Accelerometer,
        &SensorSample::triaxial(9.0, 9.0, 9.0)
    ));

    service.resume_sensing().expect("resume");
    assert_eq!(service.session_directory().expect("same session"), dir);
    provider.emit(
        SensorKind::Accelerometer,
        &SensorSample::triaxial(2.0, 0.0, 0.0),
    );

    service.stop_sensing().expect("stop");

    // One session directory, one log, both halves of the recording in it.
    let sessions: Vec<_> = std::fs::read_dir(&root)
        .expect("read root")
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(sessions.len(), 1);
    let content = std::fs::read_to_string(&log).expect("read log");
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn double_stop_is_a_noop() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = registry_for(&provider, &[SensorKind::Accelerometer]);
    let mut service = service_for(provider, registry, scratch_root("double-stop"));

    service.start_sensing().expect("start");
    service.stop_sensing().expect("first stop");
    service.stop_sensing().expect("second stop must not raise");
    assert_eq!(service.state(), CaptureState::Stopped);
}

#[test]
fn session_with_no_sensors_is_valid_but_distinct_from_none() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = SensorRegistry::new(); // nothing probed, nothing enabled
    let root = scratch_root("no-sensors");
    let mut service = service_for(provider, registry, root.clone());

    service.start_sensing().expect("start with zero sensors");
    assert_eq!(service.state(), CaptureState::Sensing);
    let dir = service.session_directory().expect("session exists");
    assert!(dir.exists());
    assert!(csv_files(&dir).is_empty());

    service.stop_sensing().expect("stop");
    assert!(service.session_directory().is_none());
}

#[test]
fn disabled_sensor_is_excluded_despite_compatibility() {
    let provider = Arc::new(SyntheticProvider::new());
    let mut registry = registry_for(
        &provider,
        &[SensorKind::Accelerometer, SensorKind::Battery],
    );
    registry
        .set_enabled(SensorKind::Battery, false)
        .expect("disable battery");
    let root = scratch_root("disabled");

    let session = CaptureSession::create(provider, &registry, &root, "s1").expect("create");
    assert_eq!(session.active_sensors(), vec![SensorKind::Accelerometer]);
}

#[test]
fn involuntary_teardown_flushes_and_closes() {
    let provider = Arc::new(SyntheticProvider::new());
    let registry = registry_for(&provider, &[SensorKind::Accelerometer]);
    let root = scratch_root("teardown");

    let dir;
    {
        let mut service = service_for(provider.clone(), registry, root);
        service.start_sensing().expect("start");
        dir = service.session_directory().expect("session dir");
        provider.emit(
            SensorKind::Accelerometer,
            &SensorSample::triaxial(7.0, 8.0, 9.0),
        );
        // Dropped without an explicit stop, as when the host process is killed.
    }

    let content = std::fs::read_to_string(dir.join("Accelerometer.csv")).expect("log flushed");
    assert_eq!(content.lines().count(), 1);
    assert!(content.ends_with('\n'));
}
