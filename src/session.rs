//! One bounded recording across one or more sensor streams.
//!
//! A session owns its output directory and one [`StreamWriter`] per selected
//! sensor. Creation decides the sensor set (enabled and compatible per the
//! registry), wires each sensor's sink into the provider, and degrades
//! gracefully: a sensor the provider refuses is omitted, never fatal.
//!
//! Control operations are best-effort loops: on stop and close every stream
//! gets its flush/close attempt regardless of earlier failures, and failures
//! are aggregated instead of thrown mid-loop.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::provider::SharedProvider;
use crate::registry::SensorRegistry;
use crate::sensor::{SensorKind, CATALOG};
use crate::writer::StreamWriter;

/// Session lifecycle errors.
#[derive(Debug)]
pub enum SessionError {
    /// The session directory already exists. Labels must be temporally
    /// unique; a caller reusing one within the same second gets this error
    /// rather than silently appending into an old recording.
    DirectoryExists(PathBuf),
    /// The storage root or session directory could not be created.
    CreateDirectory(std::io::Error),
    /// One or more streams failed during stop or close. Every stream still
    /// received its flush/close attempt.
    Teardown { failures: Vec<String> },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::DirectoryExists(path) => {
                write!(f, "session directory already exists: {}", path.display())
            }
            SessionError::CreateDirectory(e) => {
                write!(f, "could not create session directory: {e}")
            }
            SessionError::Teardown { failures } => {
                write!(f, "session teardown had failures: {}", failures.join("; "))
            }
        }
    }
}

impl std::error::Error for SessionError {}

struct ActiveStream {
    kind: SensorKind,
    writer: StreamWriter,
}

/// A live capture session: the set of subscribed sensors and their writers.
pub struct CaptureSession {
    provider: SharedProvider,
    directory: PathBuf,
    streams: Vec<ActiveStream>,
    is_sensing: bool,
}

impl CaptureSession {
    /// Create a session directory named `label` under `storage_root` and
    /// open a stream for every sensor that is enabled and compatible.
    ///
    /// Per-sensor wiring is register → open writer → subscribe; a provider
    /// failure at any step omits that sensor (logged) and leaves no log file
    /// behind. A session with zero sensors is valid: it records nothing but
    /// is distinguishable from "no session".
    pub fn create(
        provider: SharedProvider,
        registry: &SensorRegistry,
        storage_root: &Path,
        label: &str,
    ) -> Result<CaptureSession, SessionError> {
        std::fs::create_dir_all(storage_root).map_err(SessionError::CreateDirectory)?;
        let directory = storage_root.join(label);
        if directory.exists() {
            return Err(SessionError::DirectoryExists(directory));
        }
        std::fs::create_dir(&directory).map_err(SessionError::CreateDirectory)?;

        let mut streams = Vec::new();
        for descriptor in CATALOG {
            let kind = descriptor.kind;
            if !registry.is_enabled(kind) || !registry.is_compatible(kind) {
                continue;
            }

            if let Err(e) = provider.register(kind) {
                warn!(sensor = kind.name(), error = %e, "registration failed, sensor omitted from session");
                continue;
            }

            let (writer, sink) = match StreamWriter::open(kind, &directory) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(sensor = kind.name(), error = %e, "could not open log, sensor omitted from session");
                    let _ = provider.deregister(kind);
                    continue;
                }
            };

            if let Err(e) = provider.subscribe(kind, sink) {
                warn!(sensor = kind.name(), error = %e, "subscription failed, sensor omitted from session");
                let _ = provider.deregister(kind);
                let path = writer.path().to_path_buf();
                let _ = writer.close();
                let _ = std::fs::remove_file(&path);
                continue;
            }

            streams.push(ActiveStream { kind, writer });
        }

        info!(
            directory = %directory.display(),
            sensors = streams.len(),
            "capture session created"
        );
        Ok(CaptureSession {
            provider,
            directory,
            streams,
            is_sensing: false,
        })
    }

    /// Begin live delivery for every subscribed sensor.
    ///
    /// A sensor whose provider refuses to start is torn down (its empty log
    /// removed) and the session continues with the rest. Starting a session
    /// with no sensors is legal and degenerates to an idle session.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let mut failed = Vec::new();
        for stream in &self.streams {
            if let Err(e) = self.provider.start_continuous_sensing(stream.kind) {
                warn!(sensor = stream.kind.name(), error = %e, "sensor failed to start, removing its stream");
                failed.push(stream.kind);
            }
        }
        for kind in failed {
            self.discard_stream(kind);
        }
        self.is_sensing = true;
        Ok(())
    }

    /// Stop delivery for every sensor, then flush every writer.
    ///
    /// Calling stop twice, or before start, is a no-op. Once stop returns no
    /// further writes are accepted for any stream: delivery is stopped for
    /// all sensors before the first flush, and each flush drains whatever the
    /// sensor delivered up to that point.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        if !self.is_sensing {
            return Ok(());
        }
        self.is_sensing = false;

        let mut failures = Vec::new();
        for stream in &self.streams {
            if let Err(e) = self.provider.stop_continuous_sensing(stream.kind) {
                warn!(sensor = stream.kind.name(), error = %e, "failed to stop sensing");
                failures.push(format!("{}: {e}", stream.kind.name()));
            }
        }
        for stream in &self.streams {
            if let Err(e) = stream.writer.flush() {
                warn!(sensor = stream.kind.name(), error = %e, "flush failed");
                failures.push(format!("{}: {e}", stream.kind.name()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SessionError::Teardown { failures })
        }
    }

    /// Unsubscribe, deregister, flush and close every stream.
    ///
    /// Flush always precedes close: some buffered implementations swallow
    /// errors raised during close, and data loss there would be silent.
    pub fn close(&mut self) -> Result<(), SessionError> {
        let mut failures = Vec::new();
        for stream in std::mem::take(&mut self.streams) {
            let name = stream.kind.name();
            if let Err(e) = self.provider.unsubscribe(stream.kind) {
                warn!(sensor = name, error = %e, "unsubscribe failed");
                failures.push(format!("{name}: {e}"));
            }
            if let Err(e) = self.provider.deregister(stream.kind) {
                warn!(sensor = name, error = %e, "deregister failed");
                failures.push(format!("{name}: {e}"));
            }
            if let Err(e) = stream.writer.flush() {
                warn!(sensor = name, error = %e, "flush failed");
                failures.push(format!("{name}: {e}"));
            }
            if let Err(e) = stream.writer.close() {
                warn!(sensor = name, error = %e, "close failed");
                failures.push(format!("{name}: {e}"));
            }
        }

        info!(directory = %self.directory.display(), "capture session closed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SessionError::Teardown { failures })
        }
    }

    /// Whether the session is currently delivering samples to its writers.
    pub fn is_sensing(&self) -> bool {
        self.is_sensing
    }

    /// Directory all of this session's logs live in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Sensors with an open stream, in catalog order.
    pub fn active_sensors(&self) -> Vec<SensorKind> {
        self.streams.iter().map(|s| s.kind).collect()
    }

    fn discard_stream(&mut self, kind: SensorKind) {
        let Some(position) = self.streams.iter().position(|s| s.kind == kind) else {
            return;
        };
        let stream = self.streams.remove(position);
        let _ = self.provider.unsubscribe(kind);
        let _ = self.provider.deregister(kind);

        let path = stream.writer.path().to_path_buf();
        let _ = stream.writer.flush();
        let _ = stream.writer.close();
        // A stream that never captured anything leaves no log behind.
        if std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(false) {
            let _ = std::fs::remove_file(&path);
        }
    }
}
