// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Honesty Module (Kantian Duties)
// ─────────────────────────────────────────────────────────────────────
//! Categorical duties: never lie, deceive, manipulate or coerce, and
//! never treat a person merely as a means.

use concord_types::{ConcordResult, ModuleMeta};

use crate::rules::{Guard, Rule, RuleSet};

use super::FrameworkModule;

pub const VERSION: u32 = 1;

pub fn honesty_rules() -> RuleSet {
    RuleSet::new(vec![
        Rule::violation("deception", Guard::is_true("lie")),
        Rule::violation("deception", Guard::is_true("deceive")),
        Rule::violation("manipulation", Guard::is_true("manipulate")),
        Rule::violation("coercion", Guard::is_true("coerce")),
        Rule::violation("instrumentalization", Guard::is_true("treats_as_means_only")),
        Rule::score("universalizable_maxim", Guard::is_true("universalizable"), 0.9),
        Rule::score("promise_kept", Guard::is_true("promise_kept"), 0.8),
        Rule::score("promise_broken", Guard::is_false("promise_kept"), 0.2),
    ])
}

pub fn honesty() -> ConcordResult<FrameworkModule> {
    let meta = ModuleMeta::new("honesty", VERSION, 1.0, 0.25, 0.0)?;
    Ok(FrameworkModule::new(meta, honesty_rules()))
}
