// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Utility Module (Humean Welfare)
// ─────────────────────────────────────────────────────────────────────

use concord_types::{ConcordResult, ModuleMeta};

use crate::rules::{Guard, Rule, RuleSet};

use super::FrameworkModule;

pub const VERSION: u32 = 1;

/// `net_welfare` is a signed aggregate in [-1, 1].
pub fn utility_rules() -> RuleSet {
    RuleSet::new(vec![
        Rule::violation("gratuitous_suffering", Guard::is_true("gratuitous_suffering")),
        Rule::score("high_welfare", Guard::at_least("net_welfare", 0.5), 0.9),
        Rule::score("positive_welfare", Guard::at_least("net_welfare", 0.0), 0.7),
        Rule::score("net_harm", Guard::below("net_welfare", 0.0), 0.2),
        Rule::score("sympathy", Guard::is_true("promotes_sympathy"), 0.75),
    ])
}

pub fn utility() -> ConcordResult<FrameworkModule> {
    let meta = ModuleMeta::new("utility", VERSION, 0.6, 0.25, 0.3)?;
    Ok(FrameworkModule::new(meta, utility_rules()))
}
