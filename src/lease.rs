//! Stay-alive and liveness resources held while capture runs.
//!
//! The platform resources that keep capture alive in the background (a wake
//! lock and a persistent notification on the original mobile target) are
//! modeled as two injectable lease factories. Acquisition returns a guard;
//! the resource is released when the guard drops, so release happens on
//! every exit path including abrupt teardown.

use std::time::{Duration, Instant};

use tracing::{debug, info};

/// Longest a stay-alive lease may be held before it must be renewed.
/// Bounds worst-case resource pinning if a release is ever missed.
pub const MAX_LEASE_HOLD: Duration = Duration::from_secs(3600);

/// Keeps the host from suspending the process while capture is active.
pub trait StayAliveLease: Send {
    /// Acquire the lease for at most `max_hold`.
    fn acquire(&self, max_hold: Duration) -> Box<dyn LeaseGuard>;
}

/// A held stay-alive lease; dropping it releases the resource.
pub trait LeaseGuard: Send {
    /// Re-arm the lease for another `max_hold` instead of letting it lapse.
    fn renew(&mut self, max_hold: Duration);
    /// When the current hold lapses if not renewed.
    fn expires_at(&self) -> Instant;
}

/// A user-visible signal that capture is ongoing.
pub trait LivenessIndicator: Send {
    /// Raise the indicator; it stays visible until the guard drops.
    fn raise(&self) -> Box<dyn IndicatorGuard>;
}

/// A raised liveness indicator; dropping it lowers the signal.
pub trait IndicatorGuard: Send {}

/// Default stay-alive lease: tracks the hold window and logs transitions.
/// Stands in for a platform wake lock on hosts that do not need one.
pub struct ProcessKeepAlive;

impl StayAliveLease for ProcessKeepAlive {
    fn acquire(&self, max_hold: Duration) -> Box<dyn LeaseGuard> {
        debug!(max_hold_secs = max_hold.as_secs(), "stay-alive lease acquired");
        Box::new(ProcessLeaseGuard {
            expires_at: Instant::now() + max_hold,
        })
    }
}

struct ProcessLeaseGuard {
    expires_at: Instant,
}

impl LeaseGuard for ProcessLeaseGuard {
    fn renew(&mut self, max_hold: Duration) {
        self.expires_at = Instant::now() + max_hold;
        debug!(max_hold_secs = max_hold.as_secs(), "stay-alive lease renewed");
    }

    fn expires_at(&self) -> Instant {
        self.expires_at
    }
}

impl Drop for ProcessLeaseGuard {
    fn drop(&mut self) {
        debug!("stay-alive lease released");
    }
}

/// Default liveness indicator: announces capture state in the log.
pub struct LogLivenessIndicator;

impl LivenessIndicator for LogLivenessIndicator {
    fn raise(&self) -> Box<dyn IndicatorGuard> {
        info!("capture in progress");
        Box::new(LogIndicatorGuard)
    }
}

struct LogIndicatorGuard;

impl IndicatorGuard for LogIndicatorGuard {}

impl Drop for LogIndicatorGuard {
    fn drop(&mut self) {
        info!("capture ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_expiry_window() {
        let lease = ProcessKeepAlive;
        let guard = lease.acquire(Duration::from_secs(10));
        let remaining = guard.expires_at().saturating_duration_since(Instant::now());
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining > Duration::from_secs(8));
    }

    #[test]
    fn test_renew_extends_expiry() {
        let lease = ProcessKeepAlive;
        let mut guard = lease.acquire(Duration::from_secs(1));
        let before = guard.expires_at();
        guard.renew(Duration::from_secs(60));
        assert!(guard.expires_at() > before);
    }
}
