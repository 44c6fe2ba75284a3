// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concept Registry
// ─────────────────────────────────────────────────────────────────────
//! Invented concepts are data, never code: a name, the facts it
//! unifies, and a grounding tag.
//!
//! Admission path for a proposal:
//!
//! 1. Self-referential grounding ("exists because nothing simpler
//!    unifies the cluster") is quarantined outright, even for a name
//!    that already exists. So is a proposal that contradicts the facts
//!    an existing concept was accepted on.
//! 2. Every fact taking part in a contradiction is excised.
//! 3. Of the remaining facts, only the largest connected cluster
//!    (facts linked by a shared subject or predicate) is kept; the rest
//!    is noise.
//! 4. The concept is accepted if the cluster still holds at least
//!    `min_facts` facts, otherwise rejected with the reason that
//!    emptied it.
//!
//! Everything excised or rejected lands in the review log.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use concord_types::{
    ConceptDecision, ConceptOutcome, ConcordError, ConcordResult, FactLiteral, Grounding,
    InventedConcept, RejectionReason,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The whole proposal was refused.
    Rejected,
    /// The concept was accepted without these facts.
    Excised,
}

/// One entry of the human review log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptReview {
    pub name: String,
    pub outcome: ReviewOutcome,
    pub reason: RejectionReason,
    pub facts: Vec<FactLiteral>,
    pub reviewed_at: DateTime<Utc>,
}

struct ConceptEntry {
    name: String,
    supporting_facts: BTreeSet<FactLiteral>,
    grounding: Grounding,
    created_at: DateTime<Utc>,
    usage_count: AtomicU64,
}

impl ConceptEntry {
    fn snapshot(&self) -> InventedConcept {
        InventedConcept {
            name: self.name.clone(),
            supporting_facts: self.supporting_facts.clone(),
            grounding: self.grounding.clone(),
            usage_count: self.usage_count.load(Ordering::Acquire),
            created_at: self.created_at,
        }
    }
}

pub struct ConceptRegistry {
    min_facts: usize,
    concepts: RwLock<BTreeMap<String, Arc<ConceptEntry>>>,
    /// Serializes `propose` so two threads never accept conflicting concepts.
    admission: Mutex<()>,
    reviews: Mutex<Vec<ConceptReview>>,
}

impl ConceptRegistry {
    pub fn new(min_facts: usize) -> Self {
        Self {
            min_facts: min_facts.max(1),
            concepts: RwLock::new(BTreeMap::new()),
            admission: Mutex::new(()),
            reviews: Mutex::new(Vec::new()),
        }
    }

    /// Run a proposal through the admission path.
    ///
    /// Re-proposing a name that already exists returns the existing
    /// concept unchanged, unless the proposal is self-referential or
    /// contradicts the stored facts.
    pub fn propose(
        &self,
        name: &str,
        supporting_facts: &[FactLiteral],
        grounding: &Grounding,
    ) -> ConcordResult<ConceptDecision> {
        check_name(name)?;
        let _admission = self.admission.lock();
        let facts: BTreeSet<FactLiteral> = supporting_facts.iter().cloned().collect();

        if let Some(rejected) = self.screen(name, &facts, grounding) {
            return Ok(rejected);
        }
        if let Some(existing) = self.concepts.read().get(name) {
            return Ok(ConceptDecision::Accepted(existing.snapshot()));
        }
        Ok(self.admit(name, facts, grounding))
    }

    /// Invoke a concept from inside a resolution: reuse it (counting
    /// one use) if it exists, otherwise run the admission path.
    ///
    /// Screening happens first, so a self-referential or contradicting
    /// invocation of an existing name is rejected and not counted.
    pub fn invoke(
        &self,
        name: &str,
        supporting_facts: &[FactLiteral],
        grounding: &Grounding,
    ) -> ConcordResult<ConceptOutcome> {
        check_name(name)?;
        let _admission = self.admission.lock();
        let facts: BTreeSet<FactLiteral> = supporting_facts.iter().cloned().collect();

        if let Some(rejected) = self.screen(name, &facts, grounding) {
            return Ok(rejected.into());
        }
        if let Some(existing) = self.concepts.read().get(name) {
            let usage_count = existing.usage_count.fetch_add(1, Ordering::AcqRel) + 1;
            return Ok(ConceptOutcome::Reused {
                name: name.to_string(),
                usage_count,
            });
        }
        Ok(self.admit(name, facts, grounding).into())
    }

    /// Rejections that apply whether or not `name` already exists.
    fn screen(
        &self,
        name: &str,
        facts: &BTreeSet<FactLiteral>,
        grounding: &Grounding,
    ) -> Option<ConceptDecision> {
        if grounding.is_self_referential() {
            return Some(self.reject(name, RejectionReason::SelfReferentialParadox, facts.clone()));
        }
        let conflicting: BTreeSet<FactLiteral> = match self.concepts.read().get(name) {
            Some(existing) => facts
                .iter()
                .filter(|f| existing.supporting_facts.iter().any(|s| s.contradicts(f)))
                .cloned()
                .collect(),
            None => return None,
        };
        if conflicting.is_empty() {
            return None;
        }
        Some(self.reject(name, RejectionReason::Contradiction, conflicting))
    }

    /// Admission path for a new name. Caller holds `admission`.
    fn admit(
        &self,
        name: &str,
        facts: BTreeSet<FactLiteral>,
        grounding: &Grounding,
    ) -> ConceptDecision {
        let (coherent, contradictory) = excise_contradictions(facts);
        if !contradictory.is_empty() {
            self.review(
                name,
                ReviewOutcome::Excised,
                RejectionReason::Contradiction,
                contradictory.clone(),
            );
        }
        if coherent.len() < self.min_facts {
            return self.reject(name, RejectionReason::Contradiction, contradictory);
        }

        let Some((cluster, noise)) = largest_cluster(coherent) else {
            // two equally large clusters: nothing unambiguous to unify
            return self.reject(name, RejectionReason::Noise, BTreeSet::new());
        };
        if !noise.is_empty() {
            self.review(
                name,
                ReviewOutcome::Excised,
                RejectionReason::Noise,
                noise.clone(),
            );
        }
        if cluster.len() < self.min_facts {
            return self.reject(name, RejectionReason::Noise, noise);
        }

        let entry = Arc::new(ConceptEntry {
            name: name.to_string(),
            supporting_facts: cluster,
            grounding: grounding.clone(),
            created_at: Utc::now(),
            usage_count: AtomicU64::new(0),
        });
        let snapshot = entry.snapshot();
        self.concepts.write().insert(name.to_string(), entry);
        log::info!(
            "concept '{name}' accepted with {} supporting facts",
            snapshot.supporting_facts.len()
        );
        ConceptDecision::Accepted(snapshot)
    }

    /// Count one reuse of `name`. Returns the new count, or `None` if
    /// the concept does not exist.
    pub fn record_use(&self, name: &str) -> Option<u64> {
        let entry = self.concepts.read().get(name).cloned()?;
        Some(entry.usage_count.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn get(&self, name: &str) -> Option<InventedConcept> {
        self.concepts.read().get(name).map(|e| e.snapshot())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.concepts.read().contains_key(name)
    }

    /// All accepted concepts, ordered by name.
    pub fn list_invented_concepts(&self) -> Vec<InventedConcept> {
        self.concepts.read().values().map(|e| e.snapshot()).collect()
    }

    pub fn reviews(&self) -> Vec<ConceptReview> {
        self.reviews.lock().clone()
    }

    fn reject(
        &self,
        name: &str,
        reason: RejectionReason,
        facts: BTreeSet<FactLiteral>,
    ) -> ConceptDecision {
        log::warn!("concept '{name}' rejected: {reason}");
        self.review(name, ReviewOutcome::Rejected, reason, facts);
        ConceptDecision::Rejected {
            name: name.to_string(),
            reason,
        }
    }

    fn review(
        &self,
        name: &str,
        outcome: ReviewOutcome,
        reason: RejectionReason,
        facts: BTreeSet<FactLiteral>,
    ) {
        self.reviews.lock().push(ConceptReview {
            name: name.to_string(),
            outcome,
            reason,
            facts: facts.into_iter().collect(),
            reviewed_at: Utc::now(),
        });
    }
}

fn check_name(name: &str) -> ConcordResult<()> {
    if name.trim().is_empty() {
        return Err(ConcordError::Validation(
            "concept name must not be empty".into(),
        ));
    }
    Ok(())
}

/// Split facts into (coherent, contradictory). A fact is contradictory
/// if any other fact asserts a different value for its predicate and
/// subject.
fn excise_contradictions(
    facts: BTreeSet<FactLiteral>,
) -> (BTreeSet<FactLiteral>, BTreeSet<FactLiteral>) {
    let mut values: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
    for f in &facts {
        values
            .entry((f.predicate.as_str(), f.subject.as_str()))
            .or_default()
            .insert(f.value.as_str());
    }
    let conflicted: BTreeSet<(String, String)> = values
        .into_iter()
        .filter(|(_, v)| v.len() > 1)
        .map(|((p, s), _)| (p.to_string(), s.to_string()))
        .collect();
    facts
        .into_iter()
        .partition(|f| !conflicted.contains(&(f.predicate.clone(), f.subject.clone())))
}

/// Largest connected component under "shares a subject or a predicate",
/// plus the leftover facts. `None` when the largest size is tied.
fn largest_cluster(
    facts: BTreeSet<FactLiteral>,
) -> Option<(BTreeSet<FactLiteral>, BTreeSet<FactLiteral>)> {
    let facts: Vec<FactLiteral> = facts.into_iter().collect();
    let n = facts.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if facts[i].subject == facts[j].subject || facts[i].predicate == facts[j].predicate {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        components.entry(root).or_default().push(i);
    }
    let largest = components.values().map(Vec::len).max().unwrap_or(0);
    let mut winners = components.values().filter(|c| c.len() == largest);
    let winner: BTreeSet<usize> = winners.next()?.iter().copied().collect();
    if winners.next().is_some() {
        return None;
    }

    let (cluster, noise): (Vec<_>, Vec<_>) = facts
        .into_iter()
        .enumerate()
        .partition(|(i, _)| winner.contains(i));
    Some((
        cluster.into_iter().map(|(_, f)| f).collect(),
        noise.into_iter().map(|(_, f)| f).collect(),
    ))
}
