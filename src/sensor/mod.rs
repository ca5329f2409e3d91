//! Sensor catalog and sample types for the capture pipeline.
//!
//! The set of sensors the agent knows how to capture is closed and defined
//! by a static catalog; per-device availability is tracked separately by the
//! registry.

pub mod catalog;
pub mod sample;

// Re-export commonly used types
pub use catalog::{SensorDescriptor, SensorKind, CATALOG};
pub use sample::{SensorReading, SensorSample};
