// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — State Drift Monitor
// ─────────────────────────────────────────────────────────────────────

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use concord_types::{ConcordError, ConcordResult};

/// Live expectation for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFingerprint {
    pub component_id: String,
    pub expected_hash: String,
}

/// Tracks expected fingerprints and the set of components that have
/// drifted since their last manual re-verification.
///
/// Expectations are overwritten only by [`DriftMonitor::update`]. A
/// mismatch quarantines the component; it stays untrusted, even if its
/// hash later matches again, until [`DriftMonitor::reverify`] succeeds.
#[derive(Default)]
pub struct DriftMonitor {
    expected: RwLock<HashMap<String, String>>,
    untrusted: RwLock<BTreeSet<String>>,
}

impl DriftMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the first expectation for `component`.
    ///
    /// Registering the same hash again is a no-op. Registering a
    /// different hash is refused: changing an expectation goes through
    /// `update` so it is never implicit.
    pub fn register_expected(&self, component: &str, hash: &str) -> ConcordResult<()> {
        let mut expected = self.expected.write();
        match expected.get(component) {
            Some(existing) if existing == hash => Ok(()),
            Some(existing) => Err(ConcordError::Validation(format!(
                "component '{component}' already expects {existing}; use update to change it"
            ))),
            None => {
                expected.insert(component.to_string(), hash.to_string());
                log::info!("drift monitor: registered '{component}'");
                Ok(())
            }
        }
    }

    pub fn get_expected(&self, component: &str) -> Option<String> {
        self.expected.read().get(component).cloned()
    }

    /// Explicitly replace the expectation. Returns the previous hash.
    pub fn update(&self, component: &str, hash: &str) -> Option<String> {
        let prior = self
            .expected
            .write()
            .insert(component.to_string(), hash.to_string());
        log::info!(
            "drift monitor: expectation for '{component}' updated (prior: {})",
            prior.as_deref().unwrap_or("none")
        );
        prior
    }

    /// True only for a registered, trusted component whose hash matches.
    /// A mismatch marks the component untrusted.
    pub fn verify(&self, component: &str, current_hash: &str) -> bool {
        self.require_trusted(component, current_hash).is_ok()
    }

    /// `verify` with the failure reason.
    pub fn require_trusted(&self, component: &str, current_hash: &str) -> ConcordResult<()> {
        if self.untrusted.read().contains(component) {
            return Err(ConcordError::Untrusted {
                component: component.to_string(),
            });
        }
        let expected = self
            .get_expected(component)
            .ok_or_else(|| ConcordError::UnknownComponent(component.to_string()))?;
        if expected != current_hash {
            self.untrusted.write().insert(component.to_string());
            log::error!(
                "drift detected: '{component}' expected {expected}, found {current_hash}"
            );
            return Err(ConcordError::DriftDetected {
                component: component.to_string(),
                expected,
                actual: current_hash.to_string(),
            });
        }
        Ok(())
    }

    /// Manual re-verification: lifts quarantine if `current_hash` matches
    /// the (possibly just updated) expectation.
    pub fn reverify(&self, component: &str, current_hash: &str) -> ConcordResult<()> {
        let expected = self
            .get_expected(component)
            .ok_or_else(|| ConcordError::UnknownComponent(component.to_string()))?;
        if expected != current_hash {
            return Err(ConcordError::DriftDetected {
                component: component.to_string(),
                expected,
                actual: current_hash.to_string(),
            });
        }
        if self.untrusted.write().remove(component) {
            log::info!("drift monitor: '{component}' re-verified");
        }
        Ok(())
    }

    pub fn is_trusted(&self, component: &str) -> bool {
        !self.untrusted.read().contains(component)
    }

    /// Components currently quarantined, sorted.
    pub fn untrusted(&self) -> Vec<String> {
        self.untrusted.read().iter().cloned().collect()
    }

    /// All live expectations, sorted by component.
    pub fn fingerprints(&self) -> Vec<ComponentFingerprint> {
        let mut out: Vec<_> = self
            .expected
            .read()
            .iter()
            .map(|(component_id, expected_hash)| ComponentFingerprint {
                component_id: component_id.clone(),
                expected_hash: expected_hash.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.component_id.cmp(&b.component_id));
        out
    }
}
