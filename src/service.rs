//! Process-wide capture coordinator and its state machine.
//!
//! The service owns at most one [`CaptureSession`] at a time and drives it
//! through `Stopped → Sensing → Paused → Sensing → Stopped`. Starting
//! acquires the stay-alive lease and raises the liveness indicator; stopping
//! releases both, flushes and closes every stream, and discards the session.
//! Dropping the service performs the full stop sequence, so an involuntary
//! teardown never leaves unflushed buffers behind.
//!
//! The control surface is meant to be driven by a single caller at a time;
//! the five transitions here are the entire legal set and anything else is
//! rejected as [`ServiceError::InvalidTransition`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{error, info, warn};

use crate::lease::{
    IndicatorGuard, LeaseGuard, LivenessIndicator, StayAliveLease, MAX_LEASE_HOLD,
};
use crate::provider::SharedProvider;
use crate::registry::SensorRegistry;
use crate::session::{CaptureSession, SessionError};

/// Renew the stay-alive lease when less than this much hold remains.
const LEASE_RENEW_MARGIN: Duration = Duration::from_secs(300);

/// The capture state machine's states.
///
/// Sensing and Paused both imply a live session exists; Stopped implies none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Stopped,
    Sensing,
    Paused,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CaptureState::Stopped => "stopped",
            CaptureState::Sensing => "sensing",
            CaptureState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Errors from the service control surface.
#[derive(Debug)]
pub enum ServiceError {
    /// The operation is not legal from the current state. A caller defect,
    /// rejected rather than silently tolerated.
    InvalidTransition {
        from: CaptureState,
        operation: &'static str,
    },
    /// A session already exists where none should. Indicates a lifecycle bug.
    SessionExists,
    Session(SessionError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::InvalidTransition { from, operation } => {
                write!(f, "{operation} is not valid while {from}")
            }
            ServiceError::SessionExists => {
                write!(f, "a capture session already exists")
            }
            ServiceError::Session(e) => write!(f, "session error: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<SessionError> for ServiceError {
    fn from(e: SessionError) -> Self {
        ServiceError::Session(e)
    }
}

/// Long-lived coordinator owning the session, the registry view, and the
/// stay-alive/liveness resources.
pub struct CaptureService {
    provider: SharedProvider,
    registry: SensorRegistry,
    storage_root: PathBuf,
    state: CaptureState,
    session: Option<CaptureSession>,
    stay_alive: Box<dyn StayAliveLease>,
    indicator: Box<dyn LivenessIndicator>,
    lease_guard: Option<Box<dyn LeaseGuard>>,
    indicator_guard: Option<Box<dyn IndicatorGuard>>,
}

impl CaptureService {
    pub fn new(
        provider: SharedProvider,
        registry: SensorRegistry,
        storage_root: PathBuf,
        stay_alive: Box<dyn StayAliveLease>,
        indicator: Box<dyn LivenessIndicator>,
    ) -> Self {
        Self {
            provider,
            registry,
            storage_root,
            state: CaptureState::Stopped,
            session: None,
            stay_alive,
            indicator,
            lease_guard: None,
            indicator_guard: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Whether a session is currently delivering samples.
    pub fn is_sensing(&self) -> bool {
        self.state == CaptureState::Sensing
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SensorRegistry {
        &mut self.registry
    }

    /// Directory of the live session, if one exists.
    pub fn session_directory(&self) -> Option<PathBuf> {
        self.session.as_ref().map(|s| s.directory().to_path_buf())
    }

    /// Stopped → Sensing: create a session labeled with the current local
    /// time, acquire the stay-alive lease, start delivery, raise the
    /// liveness indicator.
    pub fn start_sensing(&mut self) -> Result<(), ServiceError> {
        if self.state != CaptureState::Stopped {
            return Err(ServiceError::InvalidTransition {
                from: self.state,
                operation: "start_sensing",
            });
        }
        if self.session.is_some() {
            // Stopped state with a live session should be impossible.
            error!("capture session already exists at start; refusing to create another");
            return Err(ServiceError::SessionExists);
        }

        let label = Local::now().format("%Y-%m-%d_%H.%M.%S").to_string();
        let mut session = CaptureSession::create(
            self.provider.clone(),
            &self.registry,
            &self.storage_root,
            &label,
        )?;

        self.lease_guard = Some(self.stay_alive.acquire(MAX_LEASE_HOLD));
        if let Err(e) = session.start() {
            warn!(error = %e, "session started in degraded mode");
        }
        self.indicator_guard = Some(self.indicator.raise());
        self.session = Some(session);
        self.state = CaptureState::Sensing;
        info!(%label, "sensing started");
        Ok(())
    }

    /// Sensing → Paused: stop delivery and flush every stream, but keep the
    /// session, its writers and its subscriptions alive for resume.
    pub fn pause_sensing(&mut self) -> Result<(), ServiceError> {
        if self.state != CaptureState::Sensing {
            return Err(ServiceError::InvalidTransition {
                from: self.state,
                operation: "pause_sensing",
            });
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.stop() {
                warn!(error = %e, "pause flushed with failures");
            }
        }
        self.state = CaptureState::Paused;
        info!("sensing paused");
        Ok(())
    }

    /// Paused → Sensing: restart delivery on the same session. No new
    /// directory or log files are created.
    pub fn resume_sensing(&mut self) -> Result<(), ServiceError> {
        if self.state != CaptureState::Paused {
            return Err(ServiceError::InvalidTransition {
                from: self.state,
                operation: "resume_sensing",
            });
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.start() {
                warn!(error = %e, "session resumed in degraded mode");
            }
        }
        self.state = CaptureState::Sensing;
        info!("sensing resumed");
        Ok(())
    }

    /// Sensing or Paused → Stopped: stop, flush, close and discard the
    /// session, release the stay-alive lease, lower the liveness indicator.
    ///
    /// Calling this with no active session is a logged no-op, so a redundant
    /// stop never raises.
    pub fn stop_sensing(&mut self) -> Result<(), ServiceError> {
        let Some(mut session) = self.session.take() else {
            info!("stop requested with no active session; ignoring");
            self.state = CaptureState::Stopped;
            return Ok(());
        };

        if session.is_sensing() {
            if let Err(e) = session.stop() {
                error!(error = %e, "stop completed with stream failures");
            }
        }
        if let Err(e) = session.close() {
            error!(error = %e, "close completed with stream failures");
        }

        // Guard drops release the lease and lower the indicator.
        self.lease_guard = None;
        self.indicator_guard = None;
        self.state = CaptureState::Stopped;
        info!("sensing stopped");
        Ok(())
    }

    /// Re-arm the stay-alive lease if its bounded hold is about to lapse.
    /// Intended to be called periodically from the host's control loop.
    pub fn renew_stay_alive(&mut self) {
        if let Some(guard) = self.lease_guard.as_mut() {
            let remaining = guard.expires_at().saturating_duration_since(Instant::now());
            if remaining < LEASE_RENEW_MARGIN {
                guard.renew(MAX_LEASE_HOLD);
            }
        }
    }
}

impl Drop for CaptureService {
    /// Involuntary teardown runs the same sequence as an explicit stop, so
    /// no session is ever left with unflushed buffers.
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.stop_sensing();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::{LogLivenessIndicator, ProcessKeepAlive};
    use crate::provider::SyntheticProvider;
    use crate::sensor::SensorKind;
    use std::sync::Arc;

    fn scratch_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mobile-sensing-service-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn service_with(provider: Arc<SyntheticProvider>, root: PathBuf) -> CaptureService {
        let mut registry = SensorRegistry::new();
        registry.probe_and_cache(SensorKind::Accelerometer, provider.as_ref());
        CaptureService::new(
            provider,
            registry,
            root,
            Box::new(ProcessKeepAlive),
            Box::new(LogLivenessIndicator),
        )
    }

    #[test]
    fn test_initial_state_is_stopped() {
        let provider = Arc::new(SyntheticProvider::new());
        let service = service_with(provider, scratch_root("init"));
        assert_eq!(service.state(), CaptureState::Stopped);
        assert!(!service.is_sensing());
    }

    #[test]
    fn test_full_cycle() {
        let provider = Arc::new(SyntheticProvider::new());
        let mut service = service_with(provider, scratch_root("cycle"));

        service.start_sensing().expect("start");
        assert_eq!(service.state(), CaptureState::Sensing);
        service.pause_sensing().expect("pause");
        assert_eq!(service.state(), CaptureState::Paused);
        service.resume_sensing().expect("resume");
        assert_eq!(service.state(), CaptureState::Sensing);
        service.stop_sensing().expect("stop");
        assert_eq!(service.state(), CaptureState::Stopped);
        assert!(service.session_directory().is_none());
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let provider = Arc::new(SyntheticProvider::new());
        let mut service = service_with(provider, scratch_root("illegal"));

        assert!(matches!(
            service.pause_sensing(),
            Err(ServiceError::InvalidTransition { .. })
        ));
        assert!(matches!(
            service.resume_sensing(),
            Err(ServiceError::InvalidTransition { .. })
        ));

        service.start_sensing().expect("start");
        assert!(matches!(
            service.start_sensing(),
            Err(ServiceError::InvalidTransition { .. })
        ));
        service.stop_sensing().expect("stop");
    }

    #[test]
    fn test_double_stop_is_noop() {
        let provider = Arc::new(SyntheticProvider::new());
        let mut service = service_with(provider, scratch_root("double-stop"));

        service.start_sensing().expect("start");
        service.stop_sensing().expect("first stop");
        service.stop_sensing().expect("second stop is a no-op");
        assert_eq!(service.state(), CaptureState::Stopped);
    }

    #[test]
    fn test_stop_from_paused() {
        let provider = Arc::new(SyntheticProvider::new());
        let mut service = service_with(provider, scratch_root("stop-paused"));

        service.start_sensing().expect("start");
        service.pause_sensing().expect("pause");
        service.stop_sensing().expect("stop from paused");
        assert_eq!(service.state(), CaptureState::Stopped);
    }
}
