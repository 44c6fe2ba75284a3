// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel Verdict Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::concept::ConceptOutcome;
use crate::error::{ConcordError, ConcordResult};

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// One module's judgment of one action. Produced fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Categorical breach of the module's framework.
    pub violation: bool,
    /// Score in [0, 1]; meaningless for resolution when `violation` is set.
    pub score: f64,
    /// Tag of the rule that decided the result.
    pub reason: Option<String>,
    /// Fact keys consulted by the deciding rule (the module's evidence).
    #[serde(default)]
    pub cited_facts: BTreeSet<String>,
    /// Set when the module panicked or missed its deadline.
    #[serde(default)]
    pub fault: Option<String>,
}

impl EvaluationResult {
    /// No rule matched.
    pub fn neutral(score: f64) -> Self {
        Self {
            violation: false,
            score: clamp_score(score, 0.0, 1.0),
            reason: None,
            cited_facts: BTreeSet::new(),
            fault: None,
        }
    }

    pub fn violation(reason: impl Into<String>, cited_facts: BTreeSet<String>) -> Self {
        Self {
            violation: true,
            score: 0.0,
            reason: Some(reason.into()),
            cited_facts,
            fault: None,
        }
    }

    pub fn scored(score: f64, reason: impl Into<String>, cited_facts: BTreeSet<String>) -> Self {
        Self {
            violation: false,
            score: clamp_score(score, 0.0, 1.0),
            reason: Some(reason.into()),
            cited_facts,
            fault: None,
        }
    }

    /// Neutral stand-in for a module that panicked or timed out.
    pub fn faulted(neutral_score: f64, fault: impl Into<String>) -> Self {
        Self {
            fault: Some(fault.into()),
            ..Self::neutral(neutral_score)
        }
    }
}

/// Static identity of a rule module. Fixed at construction; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMeta {
    name: String,
    version: u32,
    priority: f64,
    weight: f64,
    violation_penalty: f64,
}

impl ModuleMeta {
    pub fn new(
        name: impl Into<String>,
        version: u32,
        priority: f64,
        weight: f64,
        violation_penalty: f64,
    ) -> ConcordResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConcordError::Validation("module name must not be empty".into()));
        }
        if !priority.is_finite() {
            return Err(ConcordError::Validation(format!(
                "module '{name}': priority must be finite"
            )));
        }
        if !(0.0..=1.0).contains(&weight) {
            return Err(ConcordError::Validation(format!(
                "module '{name}': weight must be in [0, 1], got {weight}"
            )));
        }
        if !(0.0..=1.0).contains(&violation_penalty) {
            return Err(ConcordError::Validation(format!(
                "module '{name}': violation_penalty must be in [0, 1], got {violation_penalty}"
            )));
        }
        Ok(Self {
            name,
            version,
            priority,
            weight,
            violation_penalty,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn violation_penalty(&self) -> f64 {
        self.violation_penalty
    }

    /// Always true: priority and weight cannot change after registration.
    pub fn immutable(&self) -> bool {
        true
    }
}

/// One line of a resolution's per-module breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub module: String,
    pub priority: f64,
    pub raw_score: f64,
    pub weight: f64,
    pub weighted_contribution: f64,
    pub violation: bool,
    pub reason: Option<String>,
    #[serde(default)]
    pub cited_facts: BTreeSet<String>,
    #[serde(default)]
    pub fault: Option<String>,
}

/// How the final score was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionMode {
    BlockedByPriority { module: String },
    WeightedSynthesis,
    HumanOverride,
    InsufficientSharedDensity,
}

impl ResolutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMode::BlockedByPriority { .. } => "blocked_by_priority",
            ResolutionMode::WeightedSynthesis => "weighted_synthesis",
            ResolutionMode::HumanOverride => "human_override",
            ResolutionMode::InsufficientSharedDensity => "insufficient_shared_density",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionMode::BlockedByPriority { module } => {
                write!(f, "blocked_by_priority({module})")
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// One side of a contested (two-evidence-set) resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSide {
    pub action_id: String,
    /// What this side alone would have resolved to.
    pub score: f64,
    /// |score - neutral| * 2, in [0, 1].
    pub conviction: f64,
    pub evidence: BTreeSet<String>,
    pub breakdown: Vec<BreakdownEntry>,
}

/// Both sides' evidence, attached to a contested resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestedEvidence {
    pub side_a: EvidenceSide,
    pub side_b: EvidenceSide,
    pub shared_facts: BTreeSet<String>,
}

/// The automatic resolution an override superseded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorResolution {
    pub sequence: u64,
    pub final_score: f64,
    pub mode: ResolutionMode,
    pub timestamp: DateTime<Utc>,
}

/// Immutable outcome of one resolution; also the persisted log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub action_id: String,
    #[serde(default)]
    pub context: Option<String>,
    /// `None` only for `InsufficientSharedDensity`: no forced verdict exists.
    pub final_score: Option<f64>,
    pub mode: ResolutionMode,
    pub breakdown: Vec<BreakdownEntry>,
    #[serde(default)]
    pub contested: Option<ContestedEvidence>,
    #[serde(default)]
    pub override_applied: bool,
    #[serde(default)]
    pub prior_automatic: Option<PriorResolution>,
    #[serde(default)]
    pub concepts: Vec<ConceptOutcome>,
    /// Position in the kernel's resolution log.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl ResolutionRecord {
    pub fn is_blocked(&self) -> bool {
        matches!(self.mode, ResolutionMode::BlockedByPriority { .. })
    }

    pub fn is_deadlocked(&self) -> bool {
        self.mode == ResolutionMode::InsufficientSharedDensity
    }

    /// Breakdown entries whose module faulted.
    pub fn warnings(&self) -> impl Iterator<Item = &BreakdownEntry> {
        self.breakdown.iter().filter(|e| e.fault.is_some())
    }
}
