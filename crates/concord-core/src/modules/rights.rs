// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Rights Module (Lockean Natural Rights)
// ─────────────────────────────────────────────────────────────────────

use concord_types::{ConcordResult, ModuleMeta};

use crate::rules::{Guard, Rule, RuleSet};

use super::FrameworkModule;

pub const VERSION: u32 = 1;

/// Life, liberty and property. Restricting liberty is a violation only
/// when consent is known to be absent.
pub fn rights_rules() -> RuleSet {
    RuleSet::new(vec![
        Rule::violation("harm_to_life", Guard::is_true("harm_life")),
        Rule::violation(
            "liberty_without_consent",
            Guard::all([Guard::is_true("restrict_liberty"), Guard::is_false("consent")]),
        ),
        Rule::violation("property_violation", Guard::is_true("violate_property")),
        Rule::score(
            "consented_restriction",
            Guard::all([Guard::is_true("restrict_liberty"), Guard::is_true("consent")]),
            0.6,
        ),
        Rule::score("protects_rights", Guard::is_true("protects_rights"), 0.9),
    ])
}

pub fn rights() -> ConcordResult<FrameworkModule> {
    let meta = ModuleMeta::new("rights", VERSION, 0.9, 0.30, 0.1)?;
    Ok(FrameworkModule::new(meta, rights_rules()))
}
