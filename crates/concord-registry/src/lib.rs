// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Registries
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Durable, human-facing registries of the Concord Kernel.
//!
//! - [`ConceptRegistry`]: abstractions invented during deliberation,
//!   admitted only through an invariant-checked path and kept for
//!   human review together with everything that was rejected.
//! - [`OverrideRegistry`]: human-supplied forced scores, consulted
//!   before any automated resolution.

pub mod concepts;
pub mod overrides;

pub use concepts::{ConceptRegistry, ConceptReview, ReviewOutcome};
pub use overrides::{Override, OverrideEvent, OverrideEventKind, OverrideRegistry};
