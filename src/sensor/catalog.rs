//! The static sensor catalog.
//!
//! Every sensor the agent can capture is listed here. Catalog entries never
//! change at runtime; whether a given sensor is actually available on the
//! current device is a separate, per-device question answered by the
//! [`SensorRegistry`](crate::registry::SensorRegistry).

use serde::{Deserialize, Serialize};

/// One of the closed set of measurement sources the agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Accelerometer,
    AmbientTemperature,
    Battery,
    Gravity,
    Gyroscope,
    Light,
    LinearAcceleration,
    Magnetometer,
    Rotation,
    StepCounter,
    StepDetector,
    AudioLevel,
}

impl SensorKind {
    /// Human-readable sensor name, also used for the per-sensor log file name.
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "Accelerometer",
            SensorKind::AmbientTemperature => "Ambient Temperature",
            SensorKind::Battery => "Battery",
            SensorKind::Gravity => "Gravity",
            SensorKind::Gyroscope => "Gyroscope",
            SensorKind::Light => "Light",
            SensorKind::LinearAcceleration => "Linear Acceleration",
            SensorKind::Magnetometer => "Magnetometer",
            SensorKind::Rotation => "Rotation",
            SensorKind::StepCounter => "Step Counter",
            SensorKind::StepDetector => "Step Detector",
            SensorKind::AudioLevel => "Audio Level",
        }
    }

    /// Look a sensor up by its catalog name (case-insensitive).
    pub fn from_name(name: &str) -> Option<SensorKind> {
        CATALOG
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name.trim()))
            .map(|d| d.kind)
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An immutable catalog entry describing one sensor kind.
#[derive(Debug, Clone, Copy)]
pub struct SensorDescriptor {
    /// Catalog name, unique within the catalog.
    pub name: &'static str,
    pub kind: SensorKind,
    /// Whether capturing this sensor needs a user-granted permission
    /// (e.g. microphone access for the audio level sensor).
    pub requires_permission: bool,
}

const fn descriptor(name: &'static str, kind: SensorKind) -> SensorDescriptor {
    SensorDescriptor {
        name,
        kind,
        requires_permission: false,
    }
}

const fn permission_descriptor(name: &'static str, kind: SensorKind) -> SensorDescriptor {
    SensorDescriptor {
        name,
        kind,
        requires_permission: true,
    }
}

/// Every sensor the agent supports, in stable display order.
pub const CATALOG: &[SensorDescriptor] = &[
    descriptor("Accelerometer", SensorKind::Accelerometer),
    descriptor("Ambient Temperature", SensorKind::AmbientTemperature),
    descriptor("Battery", SensorKind::Battery),
    descriptor("Gravity", SensorKind::Gravity),
    descriptor("Gyroscope", SensorKind::Gyroscope),
    descriptor("Light", SensorKind::Light),
    descriptor("Linear Acceleration", SensorKind::LinearAcceleration),
    descriptor("Magnetometer", SensorKind::Magnetometer),
    descriptor("Rotation", SensorKind::Rotation),
    descriptor("Step Counter", SensorKind::StepCounter),
    descriptor("Step Detector", SensorKind::StepDetector),
    permission_descriptor("Audio Level", SensorKind::AudioLevel),
];
