// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Multi-evaluator deliberation: independent framework modules judge an
//! action, and the resolution engine turns their verdicts into one
//! auditable decision.
//!
//! # Safety Invariants
//!
//! 1. **Dominance is irreversible**: a violation reported by a module
//!    fixes the final score at that module's penalty. No lower-priority
//!    score participates. Priorities and weights are immutable after
//!    construction and validated once at startup (distinct priorities,
//!    weights summing to 1.0).
//!
//! 2. **A misbehaving module cannot stall or abort a resolution**:
//!    modules run on their own threads under a deadline. Panics are
//!    caught via `catch_unwind`; timeouts and non-finite scores are
//!    replaced by the neutral score and surfaced as breakdown warnings.
//!    A violation reported with a non-finite score still dominates.
//!
//! 3. **Integrity failures are never verdicts**: a forked or drifted
//!    component makes `resolve` return `Err`. A low score always means
//!    "judged", never "compromised".
//!
//! 4. **No false consensus**: disjoint evidence sets that pull opposite
//!    ways produce `insufficient_shared_density`, never a forced score.
//!
//! 5. **Every decision is logged once, in order**: overrides included,
//!    with the automatic verdict they superseded. The log commits to a
//!    Merkle root, so an edited or dropped record is detectable.

pub mod audit;
pub mod kernel;
pub mod modules;
pub mod resolver;
pub mod rules;

pub use audit::{replay, replay_trail, AuditEntry, AuditTrail, JsonlSink, ResolutionLog};
pub use kernel::{DeliberationKernel, AUDIT_COMPONENT, ENGINE_COMPONENT};
pub use modules::{
    honesty, reason, rights, standard_modules, utility, Evaluator, FrameworkModule, NEUTRAL_SCORE,
};
pub use resolver::{ModuleResults, ResolutionEngine, Side};
pub use rules::{Guard, Rule, RuleOutcome, RuleSet};
