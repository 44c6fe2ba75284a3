// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Deliberation Kernel
// ─────────────────────────────────────────────────────────────────────
//! Orchestrates one resolution end to end:
//!
//! override lookup → integrity checks → parallel module evaluation →
//! dominance/synthesis → ledger transactions → concept bookkeeping →
//! sealed audit log.
//!
//! Integrity failures (fork, drift, untrusted component) come back as
//! `Err`; every other outcome, including a deadlock, is a record.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use serde_json::json;

use concord_integrity::{
    ComponentFingerprint, ConsistencyLedger, DigestSigner, DriftMonitor, MerkleProof, Signer,
    Transaction,
};
use concord_registry::{
    ConceptRegistry, ConceptReview, Override, OverrideEvent, OverrideRegistry,
};
use concord_types::{
    Action, ConceptDecision, ConceptOutcome, ConcordConfig, ConcordError, ConcordResult,
    EvaluationResult, FactLiteral, Grounding, InventedConcept, ResolutionRecord,
};

use crate::audit::{JsonlSink, ResolutionLog};
use crate::modules::{standard_modules, Evaluator};
use crate::resolver::{ModuleResults, ResolutionEngine, Side};

/// Ledger identity of the resolution engine.
pub const ENGINE_COMPONENT: &str = "resolution-engine";
/// Ledger identity of the audit log.
pub const AUDIT_COMPONENT: &str = "audit";

pub struct DeliberationKernel {
    config: ConcordConfig,
    /// Highest priority first, matching the engine's order.
    modules: Vec<Arc<dyn Evaluator>>,
    engine: ResolutionEngine,
    ledger: ConsistencyLedger,
    drift: DriftMonitor,
    concepts: ConceptRegistry,
    overrides: OverrideRegistry,
    log: ResolutionLog,
    signer: Box<dyn Signer>,
    hops: AtomicU64,
}

impl DeliberationKernel {
    /// Validate the configuration and module set, register each
    /// module's fingerprint, and open the audit sink if configured.
    pub fn new(config: ConcordConfig, modules: Vec<Arc<dyn Evaluator>>) -> ConcordResult<Self> {
        config.validate()?;
        let engine = ResolutionEngine::new(
            modules.iter().map(|m| m.meta().clone()).collect(),
            &config,
        )?;

        let mut modules = modules;
        modules.sort_by(|a, b| b.meta().priority().total_cmp(&a.meta().priority()));

        let drift = DriftMonitor::new();
        for module in &modules {
            drift.register_expected(module.meta().name(), &module.fingerprint())?;
        }

        let log = match &config.audit_log_path {
            Some(path) => ResolutionLog::with_sink(JsonlSink::open(path)?),
            None => ResolutionLog::new(),
        };

        log::info!(
            "deliberation kernel ready: {} modules, timeout {} ms",
            modules.len(),
            config.module_timeout_ms
        );

        Ok(Self {
            concepts: ConceptRegistry::new(config.min_concept_facts),
            config,
            modules,
            engine,
            ledger: ConsistencyLedger::new(),
            drift,
            overrides: OverrideRegistry::new(),
            log,
            signer: Box::new(DigestSigner::default()),
            hops: AtomicU64::new(0),
        })
    }

    /// Kernel over honesty, rights, reason and utility.
    pub fn with_standard_modules(config: ConcordConfig) -> ConcordResult<Self> {
        let neutral = config.neutral_score;
        let modules = standard_modules()?
            .into_iter()
            .map(|m| Arc::new(m.with_neutral_score(neutral)) as Arc<dyn Evaluator>)
            .collect();
        Self::new(config, modules)
    }

    /// Replace the transaction signer.
    pub fn with_signer(mut self, signer: Box<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    pub fn config(&self) -> &ConcordConfig {
        &self.config
    }

    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    // ── Resolution API ──────────────────────────────────────────────

    pub fn resolve(
        &self,
        action: &Action,
        context: Option<&str>,
    ) -> ConcordResult<ResolutionRecord> {
        validate_concepts(action)?;
        if let Some(record) = self.try_override(action.id(), context) {
            return self.commit(record);
        }

        self.check_integrity()?;
        let results = self.evaluate_all(action);
        self.record_module_hops(action.id(), &results);

        let mut record = self.engine.resolve(action.id(), context, &results);
        record.concepts = self.apply_concepts(action)?;
        self.commit(record)
    }

    /// Resolve two evidence sets describing the same situation. The
    /// record is filed under `side_a`'s action id.
    pub fn resolve_contested(
        &self,
        side_a: &Action,
        side_b: &Action,
        context: Option<&str>,
    ) -> ConcordResult<ResolutionRecord> {
        validate_concepts(side_a)?;
        validate_concepts(side_b)?;
        if let Some(record) = self.try_override(side_a.id(), context) {
            return self.commit(record);
        }

        self.check_integrity()?;
        let results_a = self.evaluate_all(side_a);
        let results_b = self.evaluate_all(side_b);
        self.record_module_hops(side_a.id(), &results_a);
        self.record_module_hops(side_b.id(), &results_b);

        let mut record = self.engine.resolve_contested(
            side_a.id(),
            context,
            Side {
                action_id: side_a.id(),
                results: &results_a,
            },
            Side {
                action_id: side_b.id(),
                results: &results_b,
            },
        );
        let mut outcomes = self.apply_concepts(side_a)?;
        outcomes.extend(self.apply_concepts(side_b)?);
        record.concepts = outcomes;
        self.commit(record)
    }

    /// Full audit trail in sequence order.
    pub fn audit_log(&self) -> Vec<ResolutionRecord> {
        self.log.records()
    }

    pub fn last_resolution(&self, action_id: &str) -> Option<ResolutionRecord> {
        self.log.last_for(action_id)
    }

    /// Merkle root the audit log currently commits to.
    pub fn audit_root(&self) -> String {
        self.log.root()
    }

    pub fn audit_proof(&self, sequence: u64) -> Option<MerkleProof> {
        self.log.proof(sequence)
    }

    /// Re-seal the whole audit log; returns the root if nothing changed.
    pub fn verify_audit_chain(&self) -> ConcordResult<String> {
        self.log.verify_chain()
    }

    // ── Override API ────────────────────────────────────────────────

    pub fn register_override(
        &self,
        action_pattern: &str,
        context_pattern: &str,
        forced_score: f64,
    ) -> ConcordResult<()> {
        self.overrides
            .register(action_pattern, context_pattern, forced_score)
    }

    pub fn list_overrides(&self) -> Vec<Override> {
        self.overrides.list_overrides()
    }

    pub fn override_events(&self) -> Vec<OverrideEvent> {
        self.overrides.events()
    }

    // ── Concept review API ──────────────────────────────────────────

    pub fn propose_concept(
        &self,
        name: &str,
        supporting_facts: &[FactLiteral],
        grounding: &Grounding,
    ) -> ConcordResult<ConceptDecision> {
        self.concepts.propose(name, supporting_facts, grounding)
    }

    pub fn list_invented_concepts(&self) -> Vec<InventedConcept> {
        self.concepts.list_invented_concepts()
    }

    pub fn concept_reviews(&self) -> Vec<ConceptReview> {
        self.concepts.reviews()
    }

    // ── Audit query API ─────────────────────────────────────────────

    pub fn get_transactions(&self, component: &str) -> Vec<Transaction> {
        self.ledger.get_transactions(component)
    }

    pub fn check_consistency(&self, component: &str) -> bool {
        self.ledger.check_consistency(component)
    }

    /// Append a transaction reported by an external component.
    pub fn record_transaction(&self, transaction: Transaction) -> usize {
        self.ledger.record(transaction)
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    // ── Drift API ───────────────────────────────────────────────────

    pub fn register_expected(&self, component: &str, hash: &str) -> ConcordResult<()> {
        self.drift.register_expected(component, hash)
    }

    pub fn get_expected(&self, component: &str) -> Option<String> {
        self.drift.get_expected(component)
    }

    pub fn verify(&self, component: &str, current_hash: &str) -> bool {
        self.drift.verify(component, current_hash)
    }

    /// Explicitly sanction a new expected fingerprint.
    pub fn update_expected(&self, component: &str, hash: &str) -> Option<String> {
        self.drift.update(component, hash)
    }

    /// Manual re-verification after drift.
    pub fn reverify(&self, component: &str, current_hash: &str) -> ConcordResult<()> {
        self.drift.reverify(component, current_hash)
    }

    pub fn untrusted_components(&self) -> Vec<String> {
        self.drift.untrusted()
    }

    pub fn fingerprints(&self) -> Vec<ComponentFingerprint> {
        self.drift.fingerprints()
    }

    // ── Internals ───────────────────────────────────────────────────

    fn try_override(&self, action_id: &str, context: Option<&str>) -> Option<ResolutionRecord> {
        let found = self.overrides.find(action_id, context)?;
        let prior = self.log.last_automatic(action_id);
        log::info!(
            "override ({}, {}) applied to '{action_id}': {}",
            found.action_pattern,
            found.context_pattern,
            found.forced_score
        );
        Some(
            self.engine
                .override_record(action_id, context, found.forced_score, prior),
        )
    }

    /// Every module this resolution depends on must be untampered and
    /// fork-free, and so must the engine.
    fn check_integrity(&self) -> ConcordResult<()> {
        for module in &self.modules {
            let name = module.meta().name();
            self.drift.require_trusted(name, &module.fingerprint())?;
            self.ledger.verify_component(name)?;
        }
        self.ledger.verify_component(ENGINE_COMPONENT)
    }

    /// Run every module on its own thread and wait, up to the
    /// configured deadline, for all of them.
    fn evaluate_all(&self, action: &Action) -> ModuleResults {
        let action = Arc::new(action.clone());
        let (tx, rx) = bounded(self.modules.len());

        for (idx, module) in self.modules.iter().enumerate() {
            let module = Arc::clone(module);
            let action = Arc::clone(&action);
            let tx = tx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("concord-{}", module.meta().name()))
                .spawn(move || {
                    let outcome = catch_unwind(AssertUnwindSafe(|| module.evaluate(&action)));
                    // receiver may be gone after a timeout
                    let _ = tx.send((idx, outcome.ok()));
                });
            if let Err(e) = spawned {
                log::error!("cannot spawn evaluator thread: {e}");
            }
        }
        drop(tx);

        let neutral = self.config.neutral_score;
        let deadline = Instant::now() + Duration::from_millis(self.config.module_timeout_ms);
        let mut slots: Vec<Option<EvaluationResult>> = vec![None; self.modules.len()];
        let mut pending = self.modules.len();
        while pending > 0 {
            match rx.recv_deadline(deadline) {
                Ok((idx, Some(result))) => {
                    slots[idx] = Some(self.sanitize(idx, result));
                    pending -= 1;
                }
                Ok((idx, None)) => {
                    log::warn!("module '{}' panicked", self.modules[idx].meta().name());
                    slots[idx] = Some(EvaluationResult::faulted(neutral, "panic"));
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.modules
            .iter()
            .zip(slots)
            .map(|(module, slot)| {
                let name = module.meta().name().to_string();
                let result = slot.unwrap_or_else(|| {
                    log::warn!(
                        "module '{name}' missed the {} ms deadline",
                        self.config.module_timeout_ms
                    );
                    EvaluationResult::faulted(neutral, "timeout")
                });
                (name, result)
            })
            .collect()
    }

    /// Clamp finite scores. A non-finite score is a fault; a violation
    /// flagged alongside it still stands.
    fn sanitize(&self, idx: usize, result: EvaluationResult) -> EvaluationResult {
        if result.score.is_finite() {
            return EvaluationResult {
                score: result.score.clamp(0.0, 1.0),
                ..result
            };
        }
        let name = self.modules[idx].meta().name();
        if result.violation {
            log::warn!("module '{name}' flagged a violation with a non-finite score");
            return EvaluationResult {
                score: 0.0,
                fault: Some("non-finite score".into()),
                ..result
            };
        }
        log::warn!("module '{name}' returned non-finite score");
        EvaluationResult::faulted(self.config.neutral_score, "non-finite score")
    }

    fn next_hop(&self) -> u64 {
        self.hops.fetch_add(1, Ordering::Relaxed)
    }

    fn record_module_hops(&self, action_id: &str, results: &ModuleResults) {
        for (module, result) in results {
            let payload = json!({
                "hop": self.next_hop(),
                "action_id": action_id,
                "module": module,
                "result": result,
            });
            self.ledger.record(Transaction::new(
                module.as_str(),
                ENGINE_COMPONENT,
                payload,
                self.signer.as_ref(),
            ));
        }
    }

    fn apply_concepts(&self, action: &Action) -> ConcordResult<Vec<ConceptOutcome>> {
        action
            .concepts()
            .iter()
            .map(|p| {
                self.concepts
                    .invoke(&p.name, &p.supporting_facts, &p.grounding)
            })
            .collect()
    }

    fn commit(&self, record: ResolutionRecord) -> ConcordResult<ResolutionRecord> {
        let record = self.log.append(record)?;
        let payload = json!({
            "hop": self.next_hop(),
            "sequence": record.sequence,
            "action_id": record.action_id,
            "mode": record.mode,
            "final_score": record.final_score,
            "override_applied": record.override_applied,
            "leaf": self.log.leaf(record.sequence),
        });
        self.ledger.record(Transaction::new(
            ENGINE_COMPONENT,
            AUDIT_COMPONENT,
            payload,
            self.signer.as_ref(),
        ));
        Ok(record)
    }
}

fn validate_concepts(action: &Action) -> ConcordResult<()> {
    match action.concepts().iter().find(|c| c.name.trim().is_empty()) {
        Some(_) => Err(ConcordError::Validation(format!(
            "action '{}' proposes a concept with an empty name",
            action.id()
        ))),
        None => Ok(()),
    }
}
