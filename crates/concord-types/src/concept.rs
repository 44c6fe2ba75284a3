// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel Concept Types
// ─────────────────────────────────────────────────────────────────────
//! Invented concepts: named abstractions proposed to unify a cluster of
//! facts. These are plain tagged data; a concept never becomes code.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ground fact `predicate(subject) = value`.
///
/// Two literals contradict when they share predicate and subject but
/// disagree on the value; a negation is simply the value `"false"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactLiteral {
    pub predicate: String,
    pub subject: String,
    pub value: String,
}

impl FactLiteral {
    pub fn valued(
        predicate: impl Into<String>,
        subject: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            predicate: predicate.into(),
            subject: subject.into(),
            value: value.into(),
        }
    }

    pub fn asserted(predicate: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::valued(predicate, subject, "true")
    }

    pub fn negated(predicate: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::valued(predicate, subject, "false")
    }

    pub fn contradicts(&self, other: &FactLiteral) -> bool {
        self.predicate == other.predicate
            && self.subject == other.subject
            && self.value != other.value
    }
}

impl fmt::Display for FactLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.as_str() {
            "true" => write!(f, "{}({})", self.predicate, self.subject),
            "false" => write!(f, "not {}({})", self.predicate, self.subject),
            v => write!(f, "{}({})={}", self.predicate, self.subject, v),
        }
    }
}

/// Why a concept is claimed to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tag", rename_all = "snake_case")]
pub enum Grounding {
    /// Grounded in observed evidence (tag names the source).
    Observed(String),
    /// Derived from existing rules or concepts (tag names the derivation).
    Derived(String),
    /// "This concept exists because no simpler concept unifies the cluster."
    NoSimplerUnifier,
}

impl Grounding {
    /// True when the grounding offers no content independent of the concept itself.
    pub fn is_self_referential(&self) -> bool {
        matches!(self, Grounding::NoSimplerUnifier)
    }
}

/// A request to invent (or reuse) a named abstraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptProposal {
    pub name: String,
    pub supporting_facts: Vec<FactLiteral>,
    pub grounding: Grounding,
}

impl ConceptProposal {
    pub fn new(
        name: impl Into<String>,
        supporting_facts: impl IntoIterator<Item = FactLiteral>,
        grounding: Grounding,
    ) -> Self {
        Self {
            name: name.into(),
            supporting_facts: supporting_facts.into_iter().collect(),
            grounding,
        }
    }
}

/// Snapshot of an accepted concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventedConcept {
    pub name: String,
    pub supporting_facts: BTreeSet<FactLiteral>,
    pub grounding: Grounding,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Machine-readable rejection reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    Contradiction,
    Noise,
    SelfReferentialParadox,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::Contradiction => "contradiction",
            RejectionReason::Noise => "noise",
            RejectionReason::SelfReferentialParadox => "self-referential-paradox",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `propose`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ConceptDecision {
    Accepted(InventedConcept),
    Rejected { name: String, reason: RejectionReason },
}

impl ConceptDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ConceptDecision::Accepted(_))
    }

    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        match self {
            ConceptDecision::Rejected { reason, .. } => Some(*reason),
            ConceptDecision::Accepted(_) => None,
        }
    }
}

/// What happened to a concept invoked during one resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConceptOutcome {
    Invented { name: String },
    Reused { name: String, usage_count: u64 },
    Rejected { name: String, reason: RejectionReason },
}

impl From<ConceptDecision> for ConceptOutcome {
    /// A fresh admission: acceptance means the concept was just invented.
    fn from(decision: ConceptDecision) -> Self {
        match decision {
            ConceptDecision::Accepted(concept) => ConceptOutcome::Invented { name: concept.name },
            ConceptDecision::Rejected { name, reason } => ConceptOutcome::Rejected { name, reason },
        }
    }
}
