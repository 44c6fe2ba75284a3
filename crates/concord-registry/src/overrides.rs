// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Human Override Registry
// ─────────────────────────────────────────────────────────────────────
//! Overrides map an (action, context) pattern pair to a forced score.
//!
//! Pattern syntax: `*` matches anything (including an absent context),
//! `prefix*` matches by prefix, anything else matches exactly. When
//! several overrides match, the most specific action pattern wins, then
//! the most specific context pattern. Longer prefixes are more specific.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use concord_types::{ConcordError, ConcordResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub action_pattern: String,
    pub context_pattern: String,
    pub forced_score: f64,
}

impl Override {
    pub fn matches(&self, action_id: &str, context: Option<&str>) -> bool {
        pattern_matches(&self.action_pattern, Some(action_id))
            && pattern_matches(&self.context_pattern, context)
    }

    fn specificity(&self) -> (Specificity, Specificity) {
        (
            Specificity::of(&self.action_pattern),
            Specificity::of(&self.context_pattern),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Specificity {
    Any,
    Prefix(usize),
    Exact,
}

impl Specificity {
    fn of(pattern: &str) -> Self {
        if pattern == "*" {
            Specificity::Any
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            Specificity::Prefix(prefix.len())
        } else {
            Specificity::Exact
        }
    }
}

fn pattern_matches(pattern: &str, value: Option<&str>) -> bool {
    if pattern == "*" {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => value == pattern,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideEventKind {
    Registered,
    Updated { prior_score: f64 },
}

/// Reconciliation trail entry. Only changes are recorded; re-registering
/// an identical override leaves no trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideEvent {
    #[serde(flatten)]
    pub entry: Override,
    #[serde(flatten)]
    pub kind: OverrideEventKind,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
pub struct OverrideRegistry {
    entries: RwLock<Vec<Override>>,
    events: Mutex<Vec<OverrideEvent>>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update an override. Keyed by the pattern pair, so
    /// re-registering never creates a duplicate entry.
    pub fn register(
        &self,
        action_pattern: &str,
        context_pattern: &str,
        forced_score: f64,
    ) -> ConcordResult<()> {
        if action_pattern.is_empty() || context_pattern.is_empty() {
            return Err(ConcordError::Validation(
                "override patterns must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&forced_score) {
            return Err(ConcordError::Validation(format!(
                "forced_score must be in [0, 1], got {forced_score}"
            )));
        }

        let mut entries = self.entries.write();
        let existing = entries
            .iter_mut()
            .find(|o| o.action_pattern == action_pattern && o.context_pattern == context_pattern);
        let kind = match existing {
            Some(o) if o.forced_score == forced_score => return Ok(()),
            Some(o) => {
                let prior_score = o.forced_score;
                o.forced_score = forced_score;
                log::info!(
                    "override ({action_pattern}, {context_pattern}) updated: {prior_score} -> {forced_score}"
                );
                OverrideEventKind::Updated { prior_score }
            }
            None => {
                entries.push(Override {
                    action_pattern: action_pattern.to_string(),
                    context_pattern: context_pattern.to_string(),
                    forced_score,
                });
                log::info!(
                    "override ({action_pattern}, {context_pattern}) registered: {forced_score}"
                );
                OverrideEventKind::Registered
            }
        };
        self.events.lock().push(OverrideEvent {
            entry: Override {
                action_pattern: action_pattern.to_string(),
                context_pattern: context_pattern.to_string(),
                forced_score,
            },
            kind,
            at: Utc::now(),
        });
        Ok(())
    }

    /// The override that applies to this action and context, if any.
    pub fn find(&self, action_id: &str, context: Option<&str>) -> Option<Override> {
        let entries = self.entries.read();
        let mut best: Option<&Override> = None;
        for o in entries.iter().filter(|o| o.matches(action_id, context)) {
            if best.map_or(true, |b| o.specificity() > b.specificity()) {
                best = Some(o);
            }
        }
        best.cloned()
    }

    pub fn lookup(&self, action_id: &str, context: Option<&str>) -> Option<f64> {
        self.find(action_id, context).map(|o| o.forced_score)
    }

    /// Active overrides in registration order.
    pub fn list_overrides(&self) -> Vec<Override> {
        self.entries.read().clone()
    }

    pub fn events(&self) -> Vec<OverrideEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        let reg = OverrideRegistry::new();
        reg.register("evacuate", "fire", 0.95).unwrap();
        assert_eq!(reg.lookup("evacuate", Some("fire")), Some(0.95));
        assert_eq!(reg.lookup("evacuate", Some("flood")), None);
        assert_eq!(reg.lookup("evacuate", None), None);
        assert_eq!(reg.lookup("stay", Some("fire")), None);
    }

    #[test]
    fn test_identical_reregistration_idempotent() {
        let reg = OverrideRegistry::new();
        reg.register("evacuate", "*", 0.9).unwrap();
        reg.register("evacuate", "*", 0.9).unwrap();
        reg.register("evacuate", "*", 0.9).unwrap();
        assert_eq!(reg.list_overrides().len(), 1);
        assert_eq!(reg.events().len(), 1);
        assert_eq!(reg.lookup("evacuate", None), Some(0.9));
    }

    #[test]
    fn test_reregistration_updates_score() {
        let reg = OverrideRegistry::new();
        reg.register("evacuate", "*", 0.9).unwrap();
        reg.register("evacuate", "*", 0.4).unwrap();
        assert_eq!(reg.list_overrides().len(), 1);
        assert_eq!(reg.lookup("evacuate", Some("any")), Some(0.4));
        let events = reg.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, OverrideEventKind::Updated { prior_score: 0.9 });
    }

    #[test]
    fn test_most_specific_wins() {
        let reg = OverrideRegistry::new();
        reg.register("*", "*", 0.1).unwrap();
        reg.register("med*", "*", 0.2).unwrap();
        reg.register("medical_triage", "*", 0.3).unwrap();
        reg.register("medical_triage", "er", 0.4).unwrap();
        reg.register("medical*", "*", 0.25).unwrap();
        assert_eq!(reg.lookup("medical_triage", Some("er")), Some(0.4));
        assert_eq!(reg.lookup("medical_triage", Some("ward")), Some(0.3));
        assert_eq!(reg.lookup("medical_other", None), Some(0.25));
        assert_eq!(reg.lookup("media", None), Some(0.2));
        assert_eq!(reg.lookup("anything", None), Some(0.1));
    }

    #[test]
    fn test_action_specificity_beats_context() {
        let reg = OverrideRegistry::new();
        reg.register("*", "night_shift", 0.6).unwrap();
        reg.register("ac*", "*", 0.5).unwrap();
        reg.register("ac*", "night*", 0.55).unwrap();
        assert_eq!(reg.lookup("acx", Some("night_shift")), Some(0.55));
        assert_eq!(reg.lookup("acx", Some("day")), Some(0.5));
        assert_eq!(reg.lookup("bx", Some("night_shift")), Some(0.6));
        assert_eq!(reg.lookup("bx", None), None);
    }

    #[test]
    fn test_rejects_bad_scores() {
        let reg = OverrideRegistry::new();
        assert!(reg.register("a", "*", 1.5).is_err());
        assert!(reg.register("a", "*", f64::NAN).is_err());
        assert!(reg.register("", "*", 0.5).is_err());
        assert!(reg.list_overrides().is_empty());
        assert!(reg.events().is_empty());
    }

    #[test]
    fn test_event_wire_format() {
        let reg = OverrideRegistry::new();
        reg.register("a", "*", 0.5).unwrap();
        reg.register("a", "*", 0.6).unwrap();
        let json = serde_json::to_value(reg.events()).unwrap();
        assert_eq!(json[0]["kind"], "registered");
        assert_eq!(json[1]["kind"], "updated");
        assert_eq!(json[1]["prior_score"], 0.5);
        assert_eq!(json[1]["action_pattern"], "a");
    }
}
