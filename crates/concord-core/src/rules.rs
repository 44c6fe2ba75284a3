// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Guarded Rule Substrate
// ─────────────────────────────────────────────────────────────────────
//! Ordered guard/outcome pairs evaluated top to bottom with early
//! return. The first rule whose guard is definitely true wins; rule
//! order is part of a module's versioned contract.
//!
//! Guards are three-valued. A missing fact, or a fact of the wrong
//! type, is *unknown*; unknown never matches and never raises.

use std::collections::BTreeSet;

use serde::Serialize;

use concord_types::{FactContext, FactValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    IsTrue(String),
    IsFalse(String),
    /// Equality against a value of the same kind.
    Is(String, FactValue),
    AtLeast(String, f64),
    Below(String, f64),
    /// Presence is always known, whatever the value.
    Present(String),
    All(Vec<Guard>),
    Any(Vec<Guard>),
    Not(Box<Guard>),
}

impl Guard {
    pub fn is_true(key: impl Into<String>) -> Self {
        Guard::IsTrue(key.into())
    }

    pub fn is_false(key: impl Into<String>) -> Self {
        Guard::IsFalse(key.into())
    }

    pub fn is(key: impl Into<String>, value: impl Into<FactValue>) -> Self {
        Guard::Is(key.into(), value.into())
    }

    pub fn at_least(key: impl Into<String>, threshold: f64) -> Self {
        Guard::AtLeast(key.into(), threshold)
    }

    pub fn below(key: impl Into<String>, threshold: f64) -> Self {
        Guard::Below(key.into(), threshold)
    }

    pub fn present(key: impl Into<String>) -> Self {
        Guard::Present(key.into())
    }

    pub fn all(guards: impl IntoIterator<Item = Guard>) -> Self {
        Guard::All(guards.into_iter().collect())
    }

    pub fn any(guards: impl IntoIterator<Item = Guard>) -> Self {
        Guard::Any(guards.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(guard: Guard) -> Self {
        Guard::Not(Box::new(guard))
    }

    /// `Some(true)` / `Some(false)` when decidable, `None` when unknown.
    pub fn check(&self, ctx: &FactContext<'_>) -> Option<bool> {
        match self {
            Guard::IsTrue(key) => ctx.as_bool(key),
            Guard::IsFalse(key) => ctx.as_bool(key).map(|b| !b),
            Guard::Is(key, expected) => match (ctx.get(key)?, expected) {
                (FactValue::Bool(a), FactValue::Bool(b)) => Some(a == b),
                (FactValue::Number(a), FactValue::Number(b)) if a.is_finite() => Some(a == b),
                (FactValue::Ident(a), FactValue::Ident(b)) => Some(a == b),
                _ => None,
            },
            Guard::AtLeast(key, threshold) => ctx.as_number(key).map(|n| n >= *threshold),
            Guard::Below(key, threshold) => ctx.as_number(key).map(|n| n < *threshold),
            Guard::Present(key) => Some(ctx.get(key).is_some()),
            Guard::All(guards) => {
                let mut unknown = false;
                for g in guards {
                    match g.check(ctx) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            Guard::Any(guards) => {
                let mut unknown = false;
                for g in guards {
                    match g.check(ctx) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
            Guard::Not(inner) => inner.check(ctx).map(|b| !b),
        }
    }

    pub fn matches(&self, ctx: &FactContext<'_>) -> bool {
        self.check(ctx) == Some(true)
    }

    /// Fact keys this guard consults.
    pub fn keys(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys(&self, out: &mut BTreeSet<String>) {
        match self {
            Guard::IsTrue(k)
            | Guard::IsFalse(k)
            | Guard::Is(k, _)
            | Guard::AtLeast(k, _)
            | Guard::Below(k, _)
            | Guard::Present(k) => {
                out.insert(k.clone());
            }
            Guard::All(gs) | Guard::Any(gs) => gs.iter().for_each(|g| g.collect_keys(out)),
            Guard::Not(g) => g.collect_keys(out),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Violation,
    Score(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub tag: String,
    pub guard: Guard,
    pub outcome: RuleOutcome,
}

impl Rule {
    pub fn violation(tag: impl Into<String>, guard: Guard) -> Self {
        Self {
            tag: tag.into(),
            guard,
            outcome: RuleOutcome::Violation,
        }
    }

    pub fn score(tag: impl Into<String>, guard: Guard, score: f64) -> Self {
        Self {
            tag: tag.into(),
            guard,
            outcome: RuleOutcome::Score(score),
        }
    }
}

/// Ordered rules. Order is significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn push(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn first_match(&self, ctx: &FactContext<'_>) -> Option<&Rule> {
        self.rules.iter().find(|r| r.guard.matches(ctx))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
