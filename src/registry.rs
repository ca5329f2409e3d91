//! Per-device sensor availability and user preferences.
//!
//! Two flags per sensor: *compatible* (the device can actually run it,
//! established once by a probe and cached) and *enabled* (the user wants it
//! in future sessions). A compatible sensor can be disabled; a disabled
//! sensor is simply excluded from the next session.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::SensorProvider;
use crate::sensor::{SensorKind, CATALOG};

/// Registry persistence errors.
#[derive(Debug)]
pub enum RegistryError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::IoError(e) => write!(f, "IO error: {e}"),
            RegistryError::ParseError(e) => write!(f, "Parse error: {e}"),
            RegistryError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// On-disk format for the two flag tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedFlags {
    compatible: BTreeMap<String, bool>,
    enabled: BTreeMap<String, bool>,
}

/// Maps catalog sensors to their per-device availability flags.
pub struct SensorRegistry {
    flags: PersistedFlags,
    persist_path: Option<PathBuf>,
}

impl SensorRegistry {
    /// Create an in-memory registry with nothing probed yet.
    pub fn new() -> Self {
        Self {
            flags: PersistedFlags::default(),
            persist_path: None,
        }
    }

    /// Create a registry backed by a JSON file, loading any existing flags.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut registry = Self::new();
        registry.persist_path = Some(path);
        if let Err(e) = registry.load() {
            warn!(error = %e, "could not load sensor flags, starting fresh");
        }
        registry
    }

    /// Whether the device supports this sensor. False until probed.
    pub fn is_compatible(&self, kind: SensorKind) -> bool {
        self.flags
            .compatible
            .get(kind.name())
            .copied()
            .unwrap_or(false)
    }

    /// Whether the user wants this sensor in future sessions.
    pub fn is_enabled(&self, kind: SensorKind) -> bool {
        self.flags
            .enabled
            .get(kind.name())
            .copied()
            .unwrap_or(false)
    }

    /// Whether a compatibility probe has already run for this sensor.
    pub fn is_probed(&self, kind: SensorKind) -> bool {
        self.flags.compatible.contains_key(kind.name())
    }

    /// Toggle user preference for a sensor and persist the change.
    pub fn set_enabled(&mut self, kind: SensorKind, enabled: bool) -> Result<(), RegistryError> {
        self.flags.enabled.insert(kind.name().to_string(), enabled);
        self.save()
    }

    /// Establish whether the device supports a sensor and cache the answer.
    ///
    /// The probe runs a full register → start → stop → deregister cycle
    /// against the provider; any failure marks the sensor incompatible and is
    /// never propagated, so one broken sensor cannot block the others.
    /// Memoized: once a result is cached, no provider calls are made until
    /// the cache is cleared via [`SensorRegistry::invalidate`]. A sensor
    /// found compatible on its first probe is enabled by default.
    pub fn probe_and_cache(&mut self, kind: SensorKind, provider: &dyn SensorProvider) -> bool {
        if let Some(&cached) = self.flags.compatible.get(kind.name()) {
            return cached;
        }

        let compatible = run_probe(kind, provider);
        self.flags
            .compatible
            .insert(kind.name().to_string(), compatible);
        if compatible {
            self.flags
                .enabled
                .entry(kind.name().to_string())
                .or_insert(true);
        }
        if let Err(e) = self.save() {
            warn!(error = %e, "could not persist sensor flags");
        }
        compatible
    }

    /// Probe every catalog sensor; returns how many are compatible.
    pub fn probe_all(&mut self, provider: &dyn SensorProvider) -> usize {
        CATALOG
            .iter()
            .filter(|d| self.probe_and_cache(d.kind, provider))
            .count()
    }

    /// Clear the compatibility cache so the next probe re-runs.
    ///
    /// User enabled/disabled preferences survive invalidation; only the
    /// device-capability answers are discarded (e.g. after an OS permission
    /// change).
    pub fn invalidate(&mut self) {
        self.flags.compatible.clear();
        if let Err(e) = self.save() {
            warn!(error = %e, "could not persist sensor flags");
        }
    }

    /// Save flags to disk, if this registry is persistent.
    pub fn save(&self) -> Result<(), RegistryError> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::IoError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.flags)
            .map_err(|e| RegistryError::SerializeError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| RegistryError::IoError(e.to_string()))?;
        Ok(())
    }

    fn load(&mut self) -> Result<(), RegistryError> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| RegistryError::IoError(e.to_string()))?;
            self.flags = serde_json::from_str(&content)
                .map_err(|e| RegistryError::ParseError(e.to_string()))?;
        }
        Ok(())
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn run_probe(kind: SensorKind, provider: &dyn SensorProvider) -> bool {
    let result = provider
        .register(kind)
        .and_then(|_| provider.start_continuous_sensing(kind))
        .and_then(|_| provider.stop_continuous_sensing(kind))
        .and_then(|_| provider.deregister(kind));
    match result {
        Ok(()) => {
            debug!(sensor = kind.name(), "probe succeeded");
            true
        }
        Err(e) => {
            // Leave nothing half-registered behind a failed probe.
            let _ = provider.deregister(kind);
            warn!(sensor = kind.name(), error = %e, "probe failed, marking incompatible");
            false
        }
    }
}
