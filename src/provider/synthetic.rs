//! In-process sensor provider producing synthetic readings.
//!
//! This is the provider used by the CLI and the test suite: it implements the
//! full [`SensorProvider`] contract with an in-memory sensor bank, supports
//! scripted failures per sensor, and can fan out samples to subscribed sinks
//! from any thread via [`SyntheticProvider::emit`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::provider::{ProviderError, SensorProvider};
use crate::sensor::{SensorKind, SensorReading, SensorSample, CATALOG};
use crate::writer::RecordSink;

#[derive(Default)]
struct Bank {
    registered: HashSet<SensorKind>,
    sensing: HashSet<SensorKind>,
    sinks: HashMap<SensorKind, RecordSink>,
    unsupported: HashSet<SensorKind>,
    fail_register: HashSet<SensorKind>,
    fail_start: HashSet<SensorKind>,
    // Counts every trait-level provider call, so tests can assert that a
    // memoized probe performs none.
    calls: u64,
}

/// A scriptable provider for demos and tests.
#[derive(Default)]
pub struct SyntheticProvider {
    bank: Mutex<Bank>,
}

impl SyntheticProvider {
    /// Create a provider where every catalog sensor is supported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a sensor as absent from the device: registering it fails.
    pub fn mark_unsupported(&self, kind: SensorKind) {
        self.lock().unsupported.insert(kind);
    }

    /// Script `register` to fail for the given sensor.
    pub fn fail_register(&self, kind: SensorKind) {
        self.lock().fail_register.insert(kind);
    }

    /// Script `start_continuous_sensing` to fail for the given sensor.
    pub fn fail_start(&self, kind: SensorKind) {
        self.lock().fail_start.insert(kind);
    }

    /// Number of provider operations invoked so far.
    pub fn call_count(&self) -> u64 {
        self.lock().calls
    }

    /// Whether the sensor is currently delivering.
    pub fn is_sensing(&self, kind: SensorKind) -> bool {
        self.lock().sensing.contains(&kind)
    }

    /// Deliver one sample for a sensor, as the hardware would.
    ///
    /// Returns true if the sample reached a subscribed sink; false if the
    /// sensor is not currently sensing or has no subscriber.
    pub fn emit(&self, kind: SensorKind, sample: &SensorSample) -> bool {
        let bank = self.lock();
        if !bank.sensing.contains(&kind) {
            return false;
        }
        match bank.sinks.get(&kind) {
            Some(sink) => {
                sink.on_event(sample);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Bank> {
        // Bank contains no poisoning-sensitive state; recover the guard.
        self.bank.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SensorProvider for SyntheticProvider {
    fn register(&self, kind: SensorKind) -> Result<(), ProviderError> {
        let mut bank = self.lock();
        bank.calls += 1;
        if bank.unsupported.contains(&kind) {
            return Err(ProviderError::Unsupported(kind));
        }
        if bank.fail_register.contains(&kind) {
            return Err(ProviderError::Failed {
                kind,
                reason: "scripted registration failure".to_string(),
            });
        }
        if !bank.registered.insert(kind) {
            return Err(ProviderError::AlreadyRegistered(kind));
        }
        Ok(())
    }

    fn deregister(&self, kind: SensorKind) -> Result<(), ProviderError> {
        let mut bank = self.lock();
        bank.calls += 1;
        if !bank.registered.remove(&kind) {
            return Err(ProviderError::NotRegistered(kind));
        }
        bank.sensing.remove(&kind);
        Ok(())
    }

    fn start_continuous_sensing(&self, kind: SensorKind) -> Result<(), ProviderError> {
        let mut bank = self.lock();
        bank.calls += 1;
        if !bank.registered.contains(&kind) {
            return Err(ProviderError::NotRegistered(kind));
        }
        if bank.fail_start.contains(&kind) {
            return Err(ProviderError::Failed {
                kind,
                reason: "scripted start failure".to_string(),
            });
        }
        bank.sensing.insert(kind);
        Ok(())
    }

    fn stop_continuous_sensing(&self, kind: SensorKind) -> Result<(), ProviderError> {
        let mut bank = self.lock();
        bank.calls += 1;
        if !bank.registered.contains(&kind) {
            return Err(ProviderError::NotRegistered(kind));
        }
        bank.sensing.remove(&kind);
        Ok(())
    }

    fn subscribe(&self, kind: SensorKind, sink: RecordSink) -> Result<(), ProviderError> {
        let mut bank = self.lock();
        bank.calls += 1;
        if !bank.registered.contains(&kind) {
            return Err(ProviderError::NotRegistered(kind));
        }
        bank.sinks.insert(kind, sink);
        Ok(())
    }

    fn unsubscribe(&self, kind: SensorKind) -> Result<(), ProviderError> {
        let mut bank = self.lock();
        bank.calls += 1;
        if bank.sinks.remove(&kind).is_none() {
            return Err(ProviderError::NotRegistered(kind));
        }
        Ok(())
    }
}

/// Drive a provider with a steady stream of plausible readings.
///
/// Spawns a thread that emits a sample for every currently-sensing sensor
/// once per `period` until `running` goes false. Used by the CLI `start`
/// command and the capture demo.
pub fn spawn_feed(
    provider: Arc<SyntheticProvider>,
    period: Duration,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let started = Instant::now();
        let mut steps: u64 = 0;
        while running.load(Ordering::SeqCst) {
            let t = started.elapsed().as_secs_f64();
            for descriptor in CATALOG {
                let kind = descriptor.kind;
                if !provider.is_sensing(kind) {
                    continue;
                }
                let sample = SensorSample::new(synthesize(kind, t, &mut steps));
                provider.emit(kind, &sample);
            }
            thread::sleep(period);
        }
    })
}

/// Deterministic waveforms standing in for real hardware readings.
fn synthesize(kind: SensorKind, t: f64, steps: &mut u64) -> SensorReading {
    match kind {
        SensorKind::Accelerometer => SensorReading::Triaxial {
            x: t.sin(),
            y: t.cos(),
            z: 9.81,
        },
        SensorKind::Gravity => SensorReading::Triaxial {
            x: 0.0,
            y: 0.0,
            z: 9.81,
        },
        SensorKind::Gyroscope | SensorKind::LinearAcceleration => SensorReading::Triaxial {
            x: (t * 2.0).sin() * 0.1,
            y: (t * 2.0).cos() * 0.1,
            z: 0.0,
        },
        SensorKind::Magnetometer => SensorReading::Triaxial {
            x: 22.0 + t.sin(),
            y: -4.0,
            z: 41.0,
        },
        SensorKind::Rotation => SensorReading::RotationVector {
            x: (t * 0.5).sin(),
            y: 0.0,
            z: (t * 0.5).cos(),
            scalar: 1.0,
        },
        SensorKind::AmbientTemperature => SensorReading::Scalar {
            value: 21.0 + (t * 0.01).sin(),
        },
        SensorKind::Light => SensorReading::Scalar {
            value: 300.0 + 50.0 * t.sin(),
        },
        SensorKind::AudioLevel => SensorReading::Scalar {
            value: 40.0 + 10.0 * (t * 3.0).sin().abs(),
        },
        SensorKind::Battery => SensorReading::Battery {
            charge: (1.0 - t / 36_000.0).max(0.0),
            temperature: 30.0,
            voltage: 4.05,
        },
        SensorKind::StepCounter => {
            *steps += 1;
            SensorReading::StepCount { steps: *steps }
        }
        SensorKind::StepDetector => SensorReading::StepDetected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_start_stop_deregister_cycle() {
        let provider = SyntheticProvider::new();
        provider.register(SensorKind::Accelerometer).expect("register");
        provider
            .start_continuous_sensing(SensorKind::Accelerometer)
            .expect("start");
        assert!(provider.is_sensing(SensorKind::Accelerometer));
        provider
            .stop_continuous_sensing(SensorKind::Accelerometer)
            .expect("stop");
        assert!(!provider.is_sensing(SensorKind::Accelerometer));
        provider.deregister(SensorKind::Accelerometer).expect("deregister");
    }

    #[test]
    fn test_unsupported_sensor_fails_registration() {
        let provider = SyntheticProvider::new();
        provider.mark_unsupported(SensorKind::StepDetector);
        assert!(matches!(
            provider.register(SensorKind::StepDetector),
            Err(ProviderError::Unsupported(SensorKind::StepDetector))
        ));
    }

    #[test]
    fn test_start_requires_registration() {
        let provider = SyntheticProvider::new();
        assert!(matches!(
            provider.start_continuous_sensing(SensorKind::Light),
            Err(ProviderError::NotRegistered(SensorKind::Light))
        ));
    }

    #[test]
    fn test_emit_requires_active_sensing() {
        let provider = SyntheticProvider::new();
        let sample = SensorSample::triaxial(1.0, 0.0, 0.0);
        assert!(!provider.emit(SensorKind::Accelerometer, &sample));
    }
}
