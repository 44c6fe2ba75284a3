// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConcordError, ConcordResult};

/// Runtime configuration for the Concord Kernel.
///
/// Module priorities, weights and violation penalties are *not* here:
/// they are fixed per module at construction and never tunable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcordConfig {
    /// Bounded wait for each module's verdict, in milliseconds.
    /// A module that misses it is treated as reporting the neutral score.
    /// Default: 50.
    pub module_timeout_ms: u64,

    /// Score returned when no rule matches, and for faulted modules.
    /// Default: 0.5.
    pub neutral_score: f64,

    /// Allowed deviation of the summed module weights from 1.0.
    /// Default: 1e-9.
    pub weight_tolerance: f64,

    /// Minimum conviction (|score - neutral| * 2) each side of a pair of
    /// disjoint evidence sets must reach before the engine refuses to force
    /// a single verdict. `None` means uncalibrated: any two disjoint sides
    /// leaning opposite ways deadlock.
    pub density_threshold: Option<f64>,

    /// Minimum number of coherent facts an invented concept must unify.
    /// Default: 2.
    pub min_concept_facts: usize,

    /// JSON-lines file receiving one record per resolution. Disabled when `None`.
    pub audit_log_path: Option<PathBuf>,
}

impl Default for ConcordConfig {
    fn default() -> Self {
        Self {
            module_timeout_ms: 50,
            neutral_score: 0.5,
            weight_tolerance: 1e-9,
            density_threshold: None,
            min_concept_facts: 2,
            audit_log_path: None,
        }
    }
}

impl ConcordConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> ConcordResult<()> {
        if self.module_timeout_ms == 0 {
            return Err(ConcordError::Config(
                "module_timeout_ms must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.neutral_score) {
            return Err(ConcordError::Config(format!(
                "neutral_score must be in [0, 1], got {}",
                self.neutral_score
            )));
        }
        if !(self.weight_tolerance >= 0.0) {
            return Err(ConcordError::Config(format!(
                "weight_tolerance must be >= 0, got {}",
                self.weight_tolerance
            )));
        }
        if let Some(threshold) = self.density_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConcordError::Config(format!(
                    "density_threshold must be in [0, 1], got {threshold}"
                )));
            }
        }
        if self.min_concept_facts == 0 {
            return Err(ConcordError::Config(
                "min_concept_facts must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective density threshold (0.0 when uncalibrated).
    pub fn effective_density_threshold(&self) -> f64 {
        self.density_threshold.unwrap_or(0.0)
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ConcordResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ConcordError::Config(format!("JSON parse error: {e}")))
    }
}
