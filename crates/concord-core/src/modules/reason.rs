// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reason Module (Spinozan Adequate Ideas)
// ─────────────────────────────────────────────────────────────────────
//! Rewards action from adequate (informed, certain) ideas and marks
//! action driven by passion or confusion.

use concord_types::{ConcordResult, ModuleMeta};

use crate::rules::{Guard, Rule, RuleSet};

use super::FrameworkModule;

pub const VERSION: u32 = 1;

pub fn reason_rules() -> RuleSet {
    RuleSet::new(vec![
        Rule::violation("self_destruction", Guard::is_true("self_destructive")),
        Rule::score(
            "adequate_idea",
            Guard::all([Guard::at_least("certainty", 0.8), Guard::is_true("informed")]),
            0.85,
        ),
        Rule::score("informed_choice", Guard::is_true("informed"), 0.75),
        Rule::score("inadequate_idea", Guard::below("certainty", 0.3), 0.35),
        Rule::score(
            "passion_under_pressure",
            Guard::is("time_pressure", "immediate"),
            0.45,
        ),
    ])
}

pub fn reason() -> ConcordResult<FrameworkModule> {
    let meta = ModuleMeta::new("reason", VERSION, 0.7, 0.20, 0.2)?;
    Ok(FrameworkModule::new(meta, reason_rules()))
}
