// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel Action Model
// ─────────────────────────────────────────────────────────────────────
//! The situation under judgment: an opaque identifier plus named facts.
//!
//! An `Action` is built once and then only read. Rule modules never see
//! the action directly; they receive a [`FactContext`] that borrows the
//! fact map for the duration of one evaluation, so there is no global
//! knowledge base to mutate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::concept::ConceptProposal;

/// A single fact value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Ident(String),
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Bool(b) => write!(f, "{b}"),
            FactValue::Number(n) => write!(f, "{n}"),
            FactValue::Ident(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FactValue {
    fn from(v: bool) -> Self {
        FactValue::Bool(v)
    }
}

impl From<f64> for FactValue {
    fn from(v: f64) -> Self {
        FactValue::Number(v)
    }
}

impl From<i64> for FactValue {
    fn from(v: i64) -> Self {
        FactValue::Number(v as f64)
    }
}

impl From<&str> for FactValue {
    fn from(v: &str) -> Self {
        FactValue::Ident(v.to_string())
    }
}

impl From<String> for FactValue {
    fn from(v: String) -> Self {
        FactValue::Ident(v)
    }
}

/// A proposed action plus the facts describing its situation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    id: String,
    #[serde(default)]
    facts: BTreeMap<String, FactValue>,
    /// Abstractions the caller's reasoning invoked for this action.
    #[serde(default)]
    concepts: Vec<ConceptProposal>,
}

impl Action {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            facts: BTreeMap::new(),
            concepts: Vec::new(),
        }
    }

    pub fn with_fact(mut self, key: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.facts.insert(key.into(), value.into());
        self
    }

    pub fn with_facts(mut self, facts: BTreeMap<String, FactValue>) -> Self {
        self.facts.extend(facts);
        self
    }

    pub fn with_concept(mut self, proposal: ConceptProposal) -> Self {
        self.concepts.push(proposal);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn facts(&self) -> &BTreeMap<String, FactValue> {
        &self.facts
    }

    pub fn concepts(&self) -> &[ConceptProposal] {
        &self.concepts
    }

    /// Borrow the facts as an evaluation context.
    pub fn context(&self) -> FactContext<'_> {
        FactContext { facts: &self.facts }
    }
}

/// Read-only view of one action's facts, scoped to a single evaluation.
///
/// Every accessor returns `None` for a missing fact *and* for a fact of
/// the wrong type: both mean "unknown".
#[derive(Debug, Clone, Copy)]
pub struct FactContext<'a> {
    facts: &'a BTreeMap<String, FactValue>,
}

impl<'a> FactContext<'a> {
    pub fn new(facts: &'a BTreeMap<String, FactValue>) -> Self {
        Self { facts }
    }

    pub fn get(&self, key: &str) -> Option<&'a FactValue> {
        self.facts.get(key)
    }

    pub fn as_bool(&self, key: &str) -> Option<bool> {
        match self.facts.get(key) {
            Some(FactValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self, key: &str) -> Option<f64> {
        match self.facts.get(key) {
            Some(FactValue::Number(n)) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_ident(&self, key: &str) -> Option<&'a str> {
        match self.facts.get(key) {
            Some(FactValue::Ident(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let action = Action::new("a1")
            .with_fact("lie", true)
            .with_fact("net_welfare", 0.7)
            .with_fact("time_pressure", "immediate");
        let ctx = action.context();
        assert_eq!(action.id(), "a1");
        assert_eq!(ctx.as_bool("lie"), Some(true));
        assert_eq!(ctx.as_number("net_welfare"), Some(0.7));
        assert_eq!(ctx.as_ident("time_pressure"), Some("immediate"));
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_wrong_type_is_unknown() {
        let action = Action::new("a").with_fact("lie", "yes");
        assert_eq!(action.context().as_bool("lie"), None);
        assert_eq!(action.context().as_number("missing"), None);
    }

    #[test]
    fn test_non_finite_number_is_unknown() {
        let action = Action::new("a").with_fact("certainty", f64::NAN);
        assert_eq!(action.context().as_number("certainty"), None);
    }

    #[test]
    fn test_untagged_json() {
        let action: Action = serde_json::from_str(
            r#"{"id":"x","facts":{"lie":true,"lives":3,"who":"friend"}}"#,
        )
        .unwrap();
        assert_eq!(action.facts()["lie"], FactValue::Bool(true));
        assert_eq!(action.facts()["lives"], FactValue::Number(3.0));
        assert_eq!(action.facts()["who"], FactValue::Ident("friend".into()));
        assert!(action.concepts().is_empty());
    }
}
