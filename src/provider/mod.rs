//! The sensor provider boundary.
//!
//! The provider is the external collaborator that owns the actual hardware
//! sensors. The capture pipeline only talks to it through [`SensorProvider`]:
//! register a sensor, subscribe a sink for its samples, start and stop
//! continuous delivery. Any provider failure is treated as "this sensor is
//! unavailable", never as fatal to a whole session.

pub mod synthetic;

use std::sync::Arc;

use crate::sensor::SensorKind;
use crate::writer::RecordSink;

pub use synthetic::SyntheticProvider;

/// Errors a provider can raise for any of its operations.
#[derive(Debug)]
pub enum ProviderError {
    /// The device has no such sensor.
    Unsupported(SensorKind),
    /// The operation requires the sensor to be registered first.
    NotRegistered(SensorKind),
    /// The sensor is already registered.
    AlreadyRegistered(SensorKind),
    /// Provider-specific failure.
    Failed { kind: SensorKind, reason: String },
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Unsupported(kind) => write!(f, "{kind} is not supported on this device"),
            ProviderError::NotRegistered(kind) => write!(f, "{kind} is not registered"),
            ProviderError::AlreadyRegistered(kind) => write!(f, "{kind} is already registered"),
            ProviderError::Failed { kind, reason } => write!(f, "{kind} failed: {reason}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Push-style access to a device's sensors.
///
/// Delivery is asynchronous: after `subscribe` and `start_continuous_sensing`,
/// the provider invokes the sink once per sample on its own thread. Sinks must
/// return quickly; [`RecordSink`](crate::writer::RecordSink) guarantees that.
pub trait SensorProvider: Send + Sync {
    fn register(&self, kind: SensorKind) -> Result<(), ProviderError>;
    fn deregister(&self, kind: SensorKind) -> Result<(), ProviderError>;
    fn start_continuous_sensing(&self, kind: SensorKind) -> Result<(), ProviderError>;
    fn stop_continuous_sensing(&self, kind: SensorKind) -> Result<(), ProviderError>;
    fn subscribe(&self, kind: SensorKind, sink: RecordSink) -> Result<(), ProviderError>;
    fn unsubscribe(&self, kind: SensorKind) -> Result<(), ProviderError>;
}

/// Provider handle shared between the service, sessions and the registry.
pub type SharedProvider = Arc<dyn SensorProvider>;
