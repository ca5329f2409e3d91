//! Sensor samples and their on-disk encoding.
//!
//! Each sample is persisted as one newline-terminated line of delimited text
//! with a fixed field order per sensor kind: the UTC timestamp in
//! milliseconds first, then the reading's values. No header row is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reading delivered by a sensor.
///
/// The variant carried must match the sensor kind the sample is delivered
/// for: motion sensors produce [`SensorReading::Triaxial`], the rotation
/// vector adds a scalar component, environmental sensors produce a single
/// value, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorReading {
    /// Three-axis reading (accelerometer, gravity, gyroscope, linear
    /// acceleration, magnetometer).
    Triaxial { x: f64, y: f64, z: f64 },
    /// Rotation vector with its scalar component.
    RotationVector { x: f64, y: f64, z: f64, scalar: f64 },
    /// Single-valued reading (light, ambient temperature, audio level).
    Scalar { value: f64 },
    /// Battery state of charge, temperature and voltage.
    Battery {
        charge: f64,
        temperature: f64,
        voltage: f64,
    },
    /// Cumulative step count since device boot.
    StepCount { steps: u64 },
    /// A single detected step.
    StepDetected,
}

/// One timestamped sample from one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp: DateTime<Utc>,
    pub reading: SensorReading,
}

impl SensorSample {
    /// Create a sample stamped with the current time.
    pub fn new(reading: SensorReading) -> Self {
        Self {
            timestamp: Utc::now(),
            reading,
        }
    }

    /// Create a sample with an explicit timestamp.
    pub fn at(timestamp: DateTime<Utc>, reading: SensorReading) -> Self {
        Self { timestamp, reading }
    }

    /// Convenience constructor for three-axis readings.
    pub fn triaxial(x: f64, y: f64, z: f64) -> Self {
        Self::new(SensorReading::Triaxial { x, y, z })
    }

    /// Convenience constructor for single-valued readings.
    pub fn scalar(value: f64) -> Self {
        Self::new(SensorReading::Scalar { value })
    }

    /// Encode the sample as one comma-separated record, without the trailing
    /// newline. Field order is fixed: timestamp millis, then values.
    pub fn csv_line(&self) -> String {
        let ts = self.timestamp.timestamp_millis();
        match &self.reading {
            SensorReading::Triaxial { x, y, z } => format!("{ts},{x},{y},{z}"),
            SensorReading::RotationVector { x, y, z, scalar } => {
                format!("{ts},{x},{y},{z},{scalar}")
            }
            SensorReading::Scalar { value } => format!("{ts},{value}"),
            SensorReading::Battery {
                charge,
                temperature,
                voltage,
            } => format!("{ts},{charge},{temperature},{voltage}"),
            SensorReading::StepCount { steps } => format!("{ts},{steps}"),
            SensorReading::StepDetected => format!("{ts},1"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_triaxial_field_order() {
        let ts = Utc.timestamp_millis_opt(10).unwrap();
        let sample = SensorSample::at(
            ts,
            SensorReading::Triaxial {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
        );
        assert_eq!(sample.csv_line(), "10,1,2,3");
    }

    #[test]
    fn test_scalar_encoding() {
        let ts = Utc.timestamp_millis_opt(1500).unwrap();
        let sample = SensorSample::at(ts, SensorReading::Scalar { value: 42.5 });
        assert_eq!(sample.csv_line(), "1500,42.5");
    }

    #[test]
    fn test_battery_encoding() {
        let ts = Utc.timestamp_millis_opt(0).unwrap();
        let sample = SensorSample::at(
            ts,
            SensorReading::Battery {
                charge: 0.87,
                temperature: 30.5,
                voltage: 4.1,
            },
        );
        assert_eq!(sample.csv_line(), "0,0.87,30.5,4.1");
    }

    #[test]
    fn test_lines_never_contain_newlines() {
        let samples = [
            SensorSample::triaxial(0.0, 0.0, 0.0),
            SensorSample::scalar(1.0),
            SensorSample::new(SensorReading::StepDetected),
            SensorSample::new(SensorReading::StepCount { steps: 120 }),
        ];
        for sample in &samples {
            assert!(!sample.csv_line().contains('\n'));
        }
    }
}
