//! Mobile Sensing Agent - continuous multi-sensor capture with durable logs.
//!
//! This library acquires readings from a closed catalog of device sensors at
//! their native rates and persists each sensor's stream to an append-only
//! per-session log, surviving backgrounding and abrupt teardown.
//!
//! # Guarantees
//!
//! - **Flush before close**: every control path flushes buffered data before
//!   closing a stream, so already-written data is never corrupted
//! - **Independent streams**: each sensor's writer runs on its own thread
//!   behind its own channel; a slow disk for one never stalls another
//! - **Graceful degradation**: a missing or failing sensor is omitted from
//!   the session, never fatal to the sensors that work
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Mobile Sensing Agent                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌────────────────┐   ┌──────────────┐   │
//! │  │CaptureService│──▶│ CaptureSession │──▶│ StreamWriter │   │
//! │  │(state machine│   │ (one recording)│   │ (per sensor) │   │
//! │  │ + leases)    │   └────────────────┘   └──────────────┘   │
//! │  └──────────────┘          │                    ▲           │
//! │         │                  ▼                    │           │
//! │         ▼           ┌──────────────┐     ┌────────────┐     │
//! │  ┌──────────────┐   │SensorRegistry│     │ RecordSink │     │
//! │  │ StayAlive /  │   │(compatible + │     │ (provider  │     │
//! │  │ Liveness     │   │ enabled)     │     │  callback) │     │
//! │  └──────────────┘   └──────────────┘     └────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobile_sensing_agent::{
//!     lease::{LogLivenessIndicator, ProcessKeepAlive},
//!     provider::SyntheticProvider,
//!     registry::SensorRegistry,
//!     service::CaptureService,
//! };
//!
//! let provider = Arc::new(SyntheticProvider::new());
//! let mut registry = SensorRegistry::new();
//! registry.probe_all(provider.as_ref());
//!
//! let mut service = CaptureService::new(
//!     provider,
//!     registry,
//!     "/tmp/sessions".into(),
//!     Box::new(ProcessKeepAlive),
//!     Box::new(LogLivenessIndicator),
//! );
//! service.start_sensing().expect("failed to start sensing");
//! ```

pub mod config;
pub mod lease;
pub mod provider;
pub mod registry;
pub mod sensor;
pub mod service;
pub mod session;
pub mod writer;

// Re-export key types at crate root for convenience
pub use config::Config;
pub use lease::{LivenessIndicator, StayAliveLease, MAX_LEASE_HOLD};
pub use provider::{ProviderError, SensorProvider, SharedProvider, SyntheticProvider};
pub use registry::SensorRegistry;
pub use sensor::{SensorDescriptor, SensorKind, SensorReading, SensorSample, CATALOG};
pub use service::{CaptureService, CaptureState, ServiceError};
pub use session::{CaptureSession, SessionError};
pub use writer::{RecordSink, StreamWriter, WriterError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
