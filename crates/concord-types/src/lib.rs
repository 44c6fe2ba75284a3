// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! Concord Kernel — the multi-framework deliberation core that turns
//! independent rule-module verdicts into one auditable decision.

pub mod action;
pub mod concept;
pub mod config;
pub mod error;
pub mod verdict;

pub use action::{Action, FactContext, FactValue};
pub use concept::{
    ConceptDecision, ConceptOutcome, ConceptProposal, FactLiteral, Grounding, InventedConcept,
    RejectionReason,
};
pub use config::ConcordConfig;
pub use error::{ConcordError, ConcordResult};
pub use verdict::{
    clamp_score, BreakdownEntry, ContestedEvidence, EvaluationResult, EvidenceSide, ModuleMeta,
    PriorResolution, ResolutionMode, ResolutionRecord,
};
