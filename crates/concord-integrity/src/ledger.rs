// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Consistency Ledger
// ─────────────────────────────────────────────────────────────────────
//! Append-only transaction log with fork detection.
//!
//! Appends are serialized behind a write lock and index the entry per
//! component as they go; readers never see a partially pushed entry.
//! There is no update or delete.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use concord_types::{ConcordError, ConcordResult};

use crate::fingerprint::fingerprint_of;
use crate::signer::Signer;

/// One hop of data between two components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub from_component: String,
    pub to_component: String,
    pub data_hash: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    pub signature: String,
}

impl Transaction {
    /// Build a transaction whose hash is computed from `payload`.
    pub fn new(
        from_component: impl Into<String>,
        to_component: impl Into<String>,
        payload: Value,
        signer: &dyn Signer,
    ) -> Self {
        let data_hash = fingerprint_of(&payload);
        Self::claimed(from_component, to_component, data_hash, payload, signer)
    }

    /// Build a transaction carrying a hash asserted by the sender.
    ///
    /// Foreign components report their own hashes; the ledger records
    /// what was claimed, which is what fork detection audits.
    pub fn claimed(
        from_component: impl Into<String>,
        to_component: impl Into<String>,
        data_hash: impl Into<String>,
        payload: Value,
        signer: &dyn Signer,
    ) -> Self {
        let data_hash = data_hash.into();
        let signature = signer.sign(&data_hash);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from_component: from_component.into(),
            to_component: to_component.into(),
            data_hash,
            payload,
            timestamp: Utc::now(),
            signature,
        }
    }

    /// True if `component` sent or received this transaction.
    pub fn involves(&self, component: &str) -> bool {
        self.from_component == component || self.to_component == component
    }

    /// Whether `data_hash` matches the canonical hash of `payload`.
    pub fn hash_matches_payload(&self) -> bool {
        fingerprint_of(&self.payload) == self.data_hash
    }

    /// Identity used to tell a re-recorded claim from a divergent one.
    /// Id, timestamp and signature are envelope, not structure.
    fn structure_digest(&self) -> String {
        fingerprint_of(&json!([
            self.from_component,
            self.to_component,
            self.data_hash,
            self.payload,
        ]))
    }
}

#[derive(Default)]
struct LedgerState {
    entries: Vec<Arc<Transaction>>,
    /// Positions in `entries`, per involved component.
    by_component: HashMap<String, Vec<usize>>,
    /// First structure seen per (component, data_hash).
    claims: HashMap<String, HashMap<String, String>>,
    /// Hashes under which a component holds divergent structures.
    forks: HashMap<String, BTreeSet<String>>,
}

impl LedgerState {
    fn index(&mut self, component: &str, position: usize, data_hash: &str, digest: &str) {
        self.by_component
            .entry(component.to_string())
            .or_default()
            .push(position);
        let claims = self.claims.entry(component.to_string()).or_default();
        match claims.get(data_hash) {
            None => {
                claims.insert(data_hash.to_string(), digest.to_string());
            }
            Some(first) if first == digest => {}
            Some(_) => {
                log::warn!("divergent claim: component '{component}' hash {data_hash}");
                self.forks
                    .entry(component.to_string())
                    .or_default()
                    .insert(data_hash.to_string());
            }
        }
    }
}

/// Fork state is maintained on append, so consistency checks cost the
/// same no matter how long the ledger grows.
#[derive(Default)]
pub struct ConsistencyLedger {
    state: RwLock<LedgerState>,
}

impl ConsistencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transaction. Returns its position in the ledger.
    pub fn record(&self, transaction: Transaction) -> usize {
        let digest = transaction.structure_digest();
        let mut state = self.state.write();
        let position = state.entries.len();
        state.index(
            &transaction.from_component,
            position,
            &transaction.data_hash,
            &digest,
        );
        if transaction.to_component != transaction.from_component {
            state.index(
                &transaction.to_component,
                position,
                &transaction.data_hash,
                &digest,
            );
        }
        state.entries.push(Arc::new(transaction));
        position
    }

    /// Transactions sent or received by `component`, in append order.
    pub fn get_transactions(&self, component: &str) -> Vec<Transaction> {
        let state = self.state.read();
        let Some(positions) = state.by_component.get(component) else {
            return Vec::new();
        };
        positions
            .iter()
            .map(|&i| Transaction::clone(&state.entries[i]))
            .collect()
    }

    /// False if `component` holds two structurally different
    /// transactions under one `data_hash`.
    pub fn check_consistency(&self, component: &str) -> bool {
        !self.state.read().forks.contains_key(component)
    }

    /// `check_consistency` as a hard failure.
    pub fn verify_component(&self, component: &str) -> ConcordResult<()> {
        match self.find_fork(component) {
            None => Ok(()),
            Some(data_hash) => {
                log::error!("fork detected: component '{component}' hash {data_hash}");
                Err(ConcordError::ForkDetected {
                    component: component.to_string(),
                    data_hash,
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Consistent point-in-time view of the whole ledger.
    pub fn snapshot(&self) -> Vec<Arc<Transaction>> {
        self.state.read().entries.clone()
    }

    /// First forked hash of `component`, in sorted order.
    fn find_fork(&self, component: &str) -> Option<String> {
        let state = self.state.read();
        let forked = state
            .forks
            .get(component)
            .and_then(|hashes| hashes.iter().next().cloned());
        forked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::DigestSigner;
    use serde_json::json;

    fn signer() -> DigestSigner {
        DigestSigner::default()
    }

    #[test]
    fn test_record_is_append_only_and_ordered() {
        let ledger = ConsistencyLedger::new();
        let s = signer();
        assert!(ledger.is_empty());
        assert_eq!(ledger.record(Transaction::new("a", "b", json!({"n": 1}), &s)), 0);
        assert_eq!(ledger.record(Transaction::new("b", "c", json!({"n": 2}), &s)), 1);
        let txs = ledger.get_transactions("b");
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].payload["n"], 1);
        assert_eq!(txs[1].payload["n"], 2);
        assert!(ledger.get_transactions("zzz").is_empty());
        assert_eq!(ledger.snapshot().len(), 2);
    }

    #[test]
    fn test_distinct_payloads_are_consistent() {
        let ledger = ConsistencyLedger::new();
        let s = signer();
        for i in 0..10 {
            ledger.record(Transaction::new("honesty", "engine", json!({"seq": i}), &s));
        }
        assert!(ledger.check_consistency("honesty"));
        assert!(ledger.check_consistency("engine"));
        assert!(ledger.verify_component("honesty").is_ok());
    }

    #[test]
    fn test_same_hash_different_payload_is_fork() {
        let ledger = ConsistencyLedger::new();
        let s = signer();
        let honest = Transaction::new("rights", "engine", json!({"score": 0.9}), &s);
        let hash = honest.data_hash.clone();
        ledger.record(honest);
        ledger.record(Transaction::claimed(
            "rights",
            "engine",
            hash.clone(),
            json!({"score": 0.1}),
            &s,
        ));
        assert!(!ledger.check_consistency("rights"));
        assert!(!ledger.check_consistency("engine"));
        match ledger.verify_component("rights") {
            Err(ConcordError::ForkDetected { component, data_hash }) => {
                assert_eq!(component, "rights");
                assert_eq!(data_hash, hash);
            }
            other => panic!("expected fork, got {other:?}"),
        }
        // uninvolved components stay clean
        ledger.record(Transaction::new("x", "y", json!({}), &s));
        assert!(ledger.check_consistency("x"));
    }

    #[test]
    fn test_re_recorded_identical_claim_is_not_fork() {
        let ledger = ConsistencyLedger::new();
        let s = signer();
        let tx = Transaction::new("utility", "engine", json!({"score": 0.7}), &s);
        ledger.record(tx.clone());
        ledger.record(tx);
        assert_eq!(ledger.len(), 2);
        assert!(ledger.check_consistency("utility"));
    }

    #[test]
    fn test_hash_matches_payload() {
        let s = signer();
        let tx = Transaction::new("a", "b", json!({"k": "v"}), &s);
        assert!(tx.hash_matches_payload());
        assert!(s.verify(&tx.data_hash, &tx.signature));
        let forged = Transaction::claimed("a", "b", tx.data_hash.clone(), json!({"k": "w"}), &s);
        assert!(!forged.hash_matches_payload());
    }

    #[test]
    fn test_fork_flagged_at_append_among_long_history() {
        let ledger = ConsistencyLedger::new();
        let s = signer();
        for i in 0..5_000 {
            ledger.record(Transaction::new("reason", "engine", json!({"hop": i}), &s));
        }
        assert!(ledger.verify_component("engine").is_ok());

        let honest = ledger.get_transactions("reason").remove(1234);
        ledger.record(Transaction::claimed(
            "reason",
            "engine",
            honest.data_hash.clone(),
            json!({"hop": "rewritten"}),
            &s,
        ));
        assert!(!ledger.check_consistency("reason"));
        match ledger.verify_component("engine") {
            Err(ConcordError::ForkDetected { data_hash, .. }) => {
                assert_eq!(data_hash, honest.data_hash)
            }
            other => panic!("expected fork, got {other:?}"),
        }
        assert_eq!(ledger.get_transactions("reason").len(), 5_001);
    }

    #[test]
    fn test_self_addressed_transaction_indexed_once() {
        let ledger = ConsistencyLedger::new();
        let s = signer();
        ledger.record(Transaction::new("audit", "audit", json!({"seq": 0}), &s));
        assert_eq!(ledger.get_transactions("audit").len(), 1);
        assert!(ledger.check_consistency("audit"));
    }

    #[test]
    fn test_concurrent_appends() {
        let ledger = Arc::new(ConsistencyLedger::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    let s = DigestSigner::default();
                    for i in 0..50 {
                        ledger.record(Transaction::new(
                            format!("c{t}"),
                            "engine",
                            json!({"t": t, "i": i}),
                            &s,
                        ));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.len(), 200);
        assert!(ledger.check_consistency("engine"));
        assert_eq!(ledger.get_transactions("c2").len(), 50);
    }
}
