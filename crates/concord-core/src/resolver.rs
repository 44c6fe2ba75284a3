// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Resolution Engine
// ─────────────────────────────────────────────────────────────────────
//! Combines per-module verdicts into one decision.
//!
//! 1. Dominance: modules are walked in strict priority order; the first
//!    violation fixes the final score at that module's penalty.
//! 2. Synthesis: otherwise `Σ score × weight`.
//! 3. Contested input: two result sets built from disjoint facts that
//!    lean opposite ways, each with conviction above the density
//!    threshold, produce no forced verdict at all.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use concord_types::{
    clamp_score, BreakdownEntry, ConcordConfig, ConcordError, ConcordResult, ContestedEvidence,
    EvaluationResult, EvidenceSide, ModuleMeta, PriorResolution, ResolutionMode,
    ResolutionRecord,
};

/// Module name → that module's verdict for one action.
pub type ModuleResults = BTreeMap<String, EvaluationResult>;

/// One evidence set of a contested resolution.
#[derive(Debug, Clone, Copy)]
pub struct Side<'a> {
    pub action_id: &'a str,
    pub results: &'a ModuleResults,
}

struct Judgment {
    final_score: f64,
    mode: ResolutionMode,
    breakdown: Vec<BreakdownEntry>,
}

pub struct ResolutionEngine {
    /// Highest priority first.
    modules: Vec<ModuleMeta>,
    neutral_score: f64,
    density_threshold: f64,
}

impl ResolutionEngine {
    /// Validates the startup invariants: at least one module, unique
    /// names, distinct priorities, weights summing to 1.0.
    pub fn new(mut modules: Vec<ModuleMeta>, config: &ConcordConfig) -> ConcordResult<Self> {
        config.validate()?;
        if modules.is_empty() {
            return Err(ConcordError::Validation(
                "at least one module is required".into(),
            ));
        }

        let mut names = BTreeSet::new();
        for m in &modules {
            if !names.insert(m.name()) {
                return Err(ConcordError::Validation(format!(
                    "duplicate module name '{}'",
                    m.name()
                )));
            }
        }

        modules.sort_by(|a, b| b.priority().total_cmp(&a.priority()));
        if let Some(pair) = modules
            .windows(2)
            .find(|w| w[0].priority() == w[1].priority())
        {
            return Err(ConcordError::Validation(format!(
                "modules '{}' and '{}' share priority {}",
                pair[0].name(),
                pair[1].name(),
                pair[0].priority()
            )));
        }

        let total: f64 = modules.iter().map(|m| m.weight()).sum();
        if (total - 1.0).abs() > config.weight_tolerance {
            return Err(ConcordError::Validation(format!(
                "module weights must sum to 1.0, got {total}"
            )));
        }

        Ok(Self {
            modules,
            neutral_score: config.neutral_score,
            density_threshold: config.effective_density_threshold(),
        })
    }

    /// Registered modules, highest priority first.
    pub fn modules(&self) -> &[ModuleMeta] {
        &self.modules
    }

    pub fn resolve(
        &self,
        action_id: &str,
        context: Option<&str>,
        results: &ModuleResults,
    ) -> ResolutionRecord {
        let judgment = self.judge(results);
        new_record(
            action_id,
            context,
            Some(judgment.final_score),
            judgment.mode,
            judgment.breakdown,
        )
    }

    /// Resolve two independent evidence sets for the same situation.
    ///
    /// Deadlocks (no final score) when the sides share no cited fact,
    /// lean to opposite sides of neutral, and both exceed the density
    /// threshold. Otherwise the sides are merged module by module
    /// (violations OR-ed, scores averaged) and resolved normally. Both
    /// sides' evidence is attached either way.
    pub fn resolve_contested(
        &self,
        action_id: &str,
        context: Option<&str>,
        side_a: Side<'_>,
        side_b: Side<'_>,
    ) -> ResolutionRecord {
        let a = self.summarize(side_a);
        let b = self.summarize(side_b);
        let shared: BTreeSet<String> = a.evidence.intersection(&b.evidence).cloned().collect();

        let opposed = (a.score - self.neutral_score) * (b.score - self.neutral_score) < 0.0;
        let convinced =
            a.conviction > self.density_threshold && b.conviction > self.density_threshold;
        let deadlocked = shared.is_empty() && opposed && convinced;

        let contested = ContestedEvidence {
            side_a: a,
            side_b: b,
            shared_facts: shared,
        };

        if deadlocked {
            log::info!(
                "action '{action_id}': disjoint evidence ({:.3} vs {:.3}), no forced verdict",
                contested.side_a.score,
                contested.side_b.score
            );
            let mut record = new_record(
                action_id,
                context,
                None,
                ResolutionMode::InsufficientSharedDensity,
                Vec::new(),
            );
            record.contested = Some(contested);
            return record;
        }

        let merged = merge(side_a.results, side_b.results);
        let mut record = self.resolve(action_id, context, &merged);
        record.contested = Some(contested);
        record
    }

    /// Record for a human override. No module was consulted.
    pub fn override_record(
        &self,
        action_id: &str,
        context: Option<&str>,
        forced_score: f64,
        prior: Option<PriorResolution>,
    ) -> ResolutionRecord {
        let mut record = new_record(
            action_id,
            context,
            Some(clamp_score(forced_score, 0.0, 1.0)),
            ResolutionMode::HumanOverride,
            Vec::new(),
        );
        record.override_applied = true;
        record.prior_automatic = prior;
        record
    }

    fn judge(&self, results: &ModuleResults) -> Judgment {
        for name in results.keys() {
            if !self.modules.iter().any(|m| m.name() == name) {
                log::warn!("ignoring result from unregistered module '{name}'");
            }
        }

        let breakdown: Vec<BreakdownEntry> = self
            .modules
            .iter()
            .map(|meta| {
                let result = results.get(meta.name()).cloned().unwrap_or_else(|| {
                    log::warn!("module '{}' reported no result", meta.name());
                    EvaluationResult::faulted(self.neutral_score, "missing")
                });
                BreakdownEntry {
                    module: meta.name().to_string(),
                    priority: meta.priority(),
                    raw_score: result.score,
                    weight: meta.weight(),
                    weighted_contribution: result.score * meta.weight(),
                    violation: result.violation,
                    reason: result.reason,
                    cited_facts: result.cited_facts,
                    fault: result.fault,
                }
            })
            .collect();

        let blocker = self
            .modules
            .iter()
            .zip(&breakdown)
            .find(|(_, entry)| entry.violation)
            .map(|(meta, _)| meta);

        match blocker {
            Some(meta) => Judgment {
                final_score: meta.violation_penalty(),
                mode: ResolutionMode::BlockedByPriority {
                    module: meta.name().to_string(),
                },
                breakdown,
            },
            None => {
                let total: f64 = breakdown.iter().map(|e| e.weighted_contribution).sum();
                Judgment {
                    final_score: clamp_score(total, 0.0, 1.0),
                    mode: ResolutionMode::WeightedSynthesis,
                    breakdown,
                }
            }
        }
    }

    fn summarize(&self, side: Side<'_>) -> EvidenceSide {
        let judgment = self.judge(side.results);
        let evidence = side
            .results
            .values()
            .flat_map(|r| r.cited_facts.iter().cloned())
            .collect();
        EvidenceSide {
            action_id: side.action_id.to_string(),
            score: judgment.final_score,
            conviction: self.conviction(judgment.final_score),
            evidence,
            breakdown: judgment.breakdown,
        }
    }

    /// Distance from neutral, scaled to [0, 1] on each side.
    fn conviction(&self, score: f64) -> f64 {
        let n = self.neutral_score;
        let c = if score >= n {
            if n < 1.0 {
                (score - n) / (1.0 - n)
            } else {
                0.0
            }
        } else if n > 0.0 {
            (n - score) / n
        } else {
            0.0
        };
        clamp_score(c, 0.0, 1.0)
    }
}

fn merge(a: &ModuleResults, b: &ModuleResults) -> ModuleResults {
    let mut merged = a.clone();
    for (name, y) in b {
        let combined = match a.get(name) {
            Some(x) => EvaluationResult {
                violation: x.violation || y.violation,
                score: (x.score + y.score) / 2.0,
                reason: if y.violation && !x.violation {
                    y.reason.clone()
                } else {
                    x.reason.clone().or_else(|| y.reason.clone())
                },
                cited_facts: x.cited_facts.union(&y.cited_facts).cloned().collect(),
                fault: x.fault.clone().or_else(|| y.fault.clone()),
            },
            None => y.clone(),
        };
        merged.insert(name.clone(), combined);
    }
    merged
}

fn new_record(
    action_id: &str,
    context: Option<&str>,
    final_score: Option<f64>,
    mode: ResolutionMode,
    breakdown: Vec<BreakdownEntry>,
) -> ResolutionRecord {
    ResolutionRecord {
        action_id: action_id.to_string(),
        context: context.map(str::to_string),
        final_score,
        mode,
        breakdown,
        contested: None,
        override_applied: false,
        prior_automatic: None,
        concepts: Vec::new(),
        sequence: 0,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, priority: f64, weight: f64, penalty: f64) -> ModuleMeta {
        ModuleMeta::new(name, 1, priority, weight, penalty).unwrap()
    }

    fn standard() -> ResolutionEngine {
        ResolutionEngine::new(
            vec![
                meta("utility", 0.6, 0.25, 0.3),
                meta("honesty", 1.0, 0.25, 0.0),
                meta("reason", 0.7, 0.20, 0.2),
                meta("rights", 0.9, 0.30, 0.1),
            ],
            &ConcordConfig::default(),
        )
        .unwrap()
    }

    fn cited(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn scored(score: f64, keys: &[&str]) -> EvaluationResult {
        EvaluationResult::scored(score, "r", cited(keys))
    }

    fn results(entries: Vec<(&str, EvaluationResult)>) -> ModuleResults {
        entries
            .into_iter()
            .map(|(n, r)| (n.to_string(), r))
            .collect()
    }

    #[test]
    fn test_modules_sorted_by_priority() {
        let names: Vec<_> = standard().modules().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["honesty", "rights", "reason", "utility"]);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let err = ResolutionEngine::new(
            vec![meta("a", 1.0, 0.5, 0.0), meta("b", 0.5, 0.4, 0.1)],
            &ConcordConfig::default(),
        );
        assert!(matches!(err, Err(ConcordError::Validation(_))));
    }

    #[test]
    fn test_rejects_shared_priority() {
        let err = ResolutionEngine::new(
            vec![meta("a", 0.8, 0.5, 0.0), meta("b", 0.8, 0.5, 0.1)],
            &ConcordConfig::default(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_duplicate_name_and_empty() {
        let cfg = ConcordConfig::default();
        assert!(ResolutionEngine::new(
            vec![meta("a", 1.0, 0.5, 0.0), meta("a", 0.5, 0.5, 0.1)],
            &cfg
        )
        .is_err());
        assert!(ResolutionEngine::new(Vec::new(), &cfg).is_err());
    }

    #[test]
    fn test_highest_violation_dominates() {
        let engine = standard();
        let r = results(vec![
            ("honesty", EvaluationResult::violation("deception", cited(&["lie"]))),
            ("rights", scored(0.9, &["protects_rights"])),
            ("reason", scored(0.85, &["informed"])),
            ("utility", scored(0.9, &["net_welfare"])),
        ]);
        let record = engine.resolve("a1", None, &r);
        assert_eq!(record.final_score, Some(0.0));
        assert_eq!(
            record.mode,
            ResolutionMode::BlockedByPriority {
                module: "honesty".into()
            }
        );
        assert_eq!(record.breakdown.len(), 4);
        assert!(record.is_blocked());
    }

    #[test]
    fn test_lower_tier_penalty() {
        let engine = standard();
        let r = results(vec![
            ("honesty", scored(0.9, &["universalizable"])),
            ("rights", scored(0.9, &["protects_rights"])),
            ("reason", EvaluationResult::violation("self_destruction", cited(&["x"]))),
            ("utility", EvaluationResult::violation("gratuitous_suffering", cited(&["y"]))),
        ]);
        let record = engine.resolve("a1", None, &r);
        assert_eq!(record.final_score, Some(0.2));
        assert_eq!(record.mode.to_string(), "blocked_by_priority(reason)");
    }

    #[test]
    fn test_weighted_synthesis_exact() {
        let engine = standard();
        let r = results(vec![
            ("honesty", scored(0.9, &[])),
            ("rights", scored(0.6, &[])),
            ("reason", scored(0.75, &[])),
            ("utility", scored(0.7, &[])),
        ]);
        let first = engine.resolve("a1", None, &r);
        let second = engine.resolve("a1", None, &r);
        let expected = 0.9 * 0.25 + 0.6 * 0.30 + 0.75 * 0.20 + 0.7 * 0.25;
        let score = first.final_score.unwrap();
        assert!((score - expected).abs() < 1e-12);
        assert_eq!(first.final_score, second.final_score);
        assert_eq!(first.mode, ResolutionMode::WeightedSynthesis);
        let contributions: f64 = first.breakdown.iter().map(|e| e.weighted_contribution).sum();
        assert!((contributions - score).abs() < 1e-12);
    }

    #[test]
    fn test_dominance_and_synthesis_hold_for_every_combination() {
        let engine = standard();
        let order = ["honesty", "rights", "reason", "utility"];
        let weights = [0.25, 0.30, 0.20, 0.25];
        let penalties = [0.0, 0.1, 0.2, 0.3];
        // None stands for a violation
        let outcomes = [None, Some(0.0), Some(0.25), Some(0.5), Some(0.75), Some(1.0)];

        let mut checked = 0;
        for a in outcomes {
            for b in outcomes {
                for c in outcomes {
                    for d in outcomes {
                        let picks = [a, b, c, d];
                        let r: ModuleResults = order
                            .iter()
                            .zip(picks)
                            .map(|(name, pick)| {
                                let result = match pick {
                                    Some(score) => scored(score, &[]),
                                    None => EvaluationResult::violation("breach", cited(&[])),
                                };
                                (name.to_string(), result)
                            })
                            .collect();
                        let record = engine.resolve("law", None, &r);

                        match picks.iter().position(Option::is_none) {
                            Some(top) => {
                                assert_eq!(record.final_score, Some(penalties[top]), "{picks:?}");
                                assert_eq!(
                                    record.mode,
                                    ResolutionMode::BlockedByPriority {
                                        module: order[top].into()
                                    }
                                );
                            }
                            None => {
                                let expected: f64 = picks
                                    .iter()
                                    .zip(weights)
                                    .map(|(pick, w)| pick.unwrap_or(0.0) * w)
                                    .sum();
                                let score = record.final_score.unwrap();
                                assert!((score - expected).abs() < 1e-12, "{picks:?}");
                                assert_eq!(record.mode, ResolutionMode::WeightedSynthesis);
                            }
                        }
                        checked += 1;
                    }
                }
            }
        }
        assert_eq!(checked, 6 * 6 * 6 * 6);
    }

    #[test]
    fn test_missing_result_is_faulted_neutral() {
        let engine = standard();
        let r = results(vec![("honesty", scored(1.0, &[]))]);
        let record = engine.resolve("a1", None, &r);
        assert_eq!(record.warnings().count(), 3);
        let expected = 0.25 + 0.5 * 0.75;
        assert!((record.final_score.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_opposed_evidence_deadlocks() {
        let engine = standard();
        let a = results(vec![
            ("honesty", scored(0.9, &["universalizable"])),
            ("utility", scored(0.9, &["net_welfare"])),
        ]);
        let b = results(vec![
            ("honesty", scored(0.2, &["promise_kept"])),
            ("reason", scored(0.35, &["certainty"])),
        ]);
        let record = engine.resolve_contested(
            "dilemma",
            Some("triage"),
            Side { action_id: "dilemma#a", results: &a },
            Side { action_id: "dilemma#b", results: &b },
        );
        assert!(record.is_deadlocked());
        assert_eq!(record.final_score, None);
        let contested = record.contested.unwrap();
        assert_eq!(contested.side_a.breakdown.len(), 4);
        assert_eq!(contested.side_b.breakdown.len(), 4);
        assert!(contested.side_a.score > 0.5);
        assert!(contested.side_b.score < 0.5);
        assert!(contested.shared_facts.is_empty());
    }

    #[test]
    fn test_shared_evidence_merges() {
        let engine = standard();
        let a = results(vec![("utility", scored(0.9, &["net_welfare"]))]);
        let b = results(vec![("utility", scored(0.2, &["net_welfare"]))]);
        let record = engine.resolve_contested(
            "x",
            None,
            Side { action_id: "x", results: &a },
            Side { action_id: "x", results: &b },
        );
        assert_eq!(record.mode, ResolutionMode::WeightedSynthesis);
        let utility = record.breakdown.iter().find(|e| e.module == "utility").unwrap();
        assert!((utility.raw_score - 0.55).abs() < 1e-12);
        assert_eq!(
            record.contested.unwrap().shared_facts,
            cited(&["net_welfare"])
        );
    }

    #[test]
    fn test_merged_violation_still_dominates() {
        let engine = standard();
        let a = results(vec![("utility", scored(0.9, &["net_welfare"]))]);
        let b = results(vec![(
            "rights",
            EvaluationResult::violation("harm_to_life", cited(&["harm_life", "net_welfare"])),
        )]);
        let record = engine.resolve_contested(
            "x",
            None,
            Side { action_id: "x", results: &a },
            Side { action_id: "x", results: &b },
        );
        assert_eq!(record.final_score, Some(0.1));
    }

    #[test]
    fn test_density_threshold_gates_deadlock() {
        let config = ConcordConfig {
            density_threshold: Some(0.9),
            ..ConcordConfig::default()
        };
        let engine = ResolutionEngine::new(standard().modules().to_vec(), &config).unwrap();
        let a = results(vec![("utility", scored(0.9, &["net_welfare"]))]);
        let b = results(vec![("honesty", scored(0.2, &["promise_kept"]))]);
        let record = engine.resolve_contested(
            "x",
            None,
            Side { action_id: "x", results: &a },
            Side { action_id: "x", results: &b },
        );
        assert!(!record.is_deadlocked());
        assert!(record.final_score.is_some());
    }

    #[test]
    fn test_neutral_side_never_deadlocks() {
        let engine = standard();
        let a = results(vec![("utility", scored(0.9, &["net_welfare"]))]);
        let b = ModuleResults::new();
        let record = engine.resolve_contested(
            "x",
            None,
            Side { action_id: "x", results: &a },
            Side { action_id: "x", results: &b },
        );
        assert!(!record.is_deadlocked());
    }

    #[test]
    fn test_override_record() {
        let engine = standard();
        let prior = engine.resolve("x", None, &ModuleResults::new());
        let record = engine.override_record(
            "x",
            Some("ctx"),
            0.95,
            Some(PriorResolution {
                sequence: prior.sequence,
                final_score: prior.final_score.unwrap(),
                mode: prior.mode.clone(),
                timestamp: prior.timestamp,
            }),
        );
        assert_eq!(record.mode, ResolutionMode::HumanOverride);
        assert_eq!(record.final_score, Some(0.95));
        assert!(record.override_applied);
        assert!(record.breakdown.is_empty());
        assert_eq!(
            record.prior_automatic.unwrap().mode,
            ResolutionMode::WeightedSynthesis
        );
    }
}
