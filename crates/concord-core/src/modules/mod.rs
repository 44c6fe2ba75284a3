// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Framework Rule Modules
// ─────────────────────────────────────────────────────────────────────
//! Independent judgment modules, one per ethical framework.
//!
//! A module is a pure function of its fixed rule set and the action's
//! facts. Identity (`ModuleMeta`) is fixed at construction: nothing a
//! module does at runtime can move it in the dominance hierarchy or
//! change its weight.
//!
//! | module   | framework          | priority | weight | violation penalty |
//! |----------|--------------------|----------|--------|-------------------|
//! | honesty  | Kantian duties     | 1.0      | 0.25   | 0.0               |
//! | rights   | Lockean rights     | 0.9      | 0.30   | 0.1               |
//! | reason   | Spinozan reason    | 0.7      | 0.20   | 0.2               |
//! | utility  | Humean welfare     | 0.6      | 0.25   | 0.3               |

mod honesty;
mod reason;
mod rights;
mod utility;

use serde_json::{json, Value};

use concord_integrity::StateFingerprint;
use concord_types::{Action, ConcordResult, EvaluationResult, ModuleMeta};

use crate::rules::{RuleOutcome, RuleSet};

pub use honesty::{honesty, honesty_rules};
pub use reason::{reason, reason_rules};
pub use rights::{rights, rights_rules};
pub use utility::{utility, utility_rules};

/// Score a module reports when none of its rules matched.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Plugin interface for rule modules.
///
/// Implementations must be side-effect free per call. `fingerprint`
/// must be deterministic over the module's stable configuration; the
/// kernel treats any change it did not sanction as drift.
pub trait Evaluator: Send + Sync {
    fn meta(&self) -> &ModuleMeta;

    fn evaluate(&self, action: &Action) -> EvaluationResult;

    fn fingerprint(&self) -> String;
}

/// A module defined entirely by metadata plus an ordered rule set.
#[derive(Debug, Clone)]
pub struct FrameworkModule {
    meta: ModuleMeta,
    rules: RuleSet,
    neutral_score: f64,
}

impl FrameworkModule {
    pub fn new(meta: ModuleMeta, rules: RuleSet) -> Self {
        Self {
            meta,
            rules,
            neutral_score: NEUTRAL_SCORE,
        }
    }

    pub fn with_neutral_score(mut self, neutral_score: f64) -> Self {
        self.neutral_score = neutral_score;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

impl StateFingerprint for FrameworkModule {
    fn state(&self) -> Value {
        json!({
            "meta": self.meta,
            "neutral_score": self.neutral_score,
            "rules": self.rules,
        })
    }
}

impl Evaluator for FrameworkModule {
    fn meta(&self) -> &ModuleMeta {
        &self.meta
    }

    fn evaluate(&self, action: &Action) -> EvaluationResult {
        let ctx = action.context();
        match self.rules.first_match(&ctx) {
            Some(rule) => {
                let cited = rule.guard.keys();
                match rule.outcome {
                    RuleOutcome::Violation => EvaluationResult::violation(&rule.tag, cited),
                    RuleOutcome::Score(score) => EvaluationResult::scored(score, &rule.tag, cited),
                }
            }
            None => EvaluationResult::neutral(self.neutral_score),
        }
    }

    fn fingerprint(&self) -> String {
        StateFingerprint::fingerprint(self)
    }
}

/// The four framework modules with their standard identities.
pub fn standard_modules() -> ConcordResult<Vec<FrameworkModule>> {
    Ok(vec![honesty()?, rights()?, reason()?, utility()?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_weights_sum_to_one() {
        let sum: f64 = standard_modules().unwrap().iter().map(|m| m.meta().weight()).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_priorities_distinct_and_ordered() {
        let modules = standard_modules().unwrap();
        let priorities: Vec<f64> = modules.iter().map(|m| m.meta().priority()).collect();
        assert_eq!(priorities, vec![1.0, 0.9, 0.7, 0.6]);
        let penalties: Vec<f64> = modules
            .iter()
            .map(|m| m.meta().violation_penalty())
            .collect();
        assert_eq!(penalties, vec![0.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_standard_constructors_are_fallible_not_panicking() {
        for built in [honesty(), rights(), reason(), utility()] {
            let module = built.unwrap();
            assert_eq!(module.meta().version(), 1);
        }
        assert_eq!(standard_modules().unwrap().len(), 4);
    }

    #[test]
    fn test_empty_action_is_neutral_everywhere() {
        let action = Action::new("nothing");
        for module in standard_modules().unwrap() {
            let r = module.evaluate(&action);
            assert!(!r.violation, "{}", module.meta().name());
            assert_eq!(r.score, NEUTRAL_SCORE);
            assert!(r.reason.is_none());
            assert!(r.cited_facts.is_empty());
        }
    }

    #[test]
    fn test_fingerprint_deterministic_across_instances() {
        let fp = |m: &FrameworkModule| Evaluator::fingerprint(m);
        assert_eq!(fp(&honesty().unwrap()), fp(&honesty().unwrap()));
        assert_ne!(fp(&honesty().unwrap()), fp(&rights().unwrap()));
    }

    #[test]
    fn test_rule_order_is_part_of_fingerprint() {
        let base = honesty().unwrap();
        let mut reversed: Vec<_> = base.rules().rules().to_vec();
        reversed.reverse();
        let shuffled = FrameworkModule::new(base.meta().clone(), RuleSet::new(reversed));
        assert_ne!(
            Evaluator::fingerprint(&base),
            Evaluator::fingerprint(&shuffled)
        );
    }

    #[test]
    fn test_evaluation_is_fresh_per_action() {
        let module = utility().unwrap();
        let good = Action::new("a").with_fact("net_welfare", 0.8);
        let bad = Action::new("b").with_fact("net_welfare", -0.5);
        assert_eq!(module.evaluate(&good).score, 0.9);
        assert_eq!(module.evaluate(&bad).score, 0.2);
        assert_eq!(module.evaluate(&good).score, 0.9);
    }
}
