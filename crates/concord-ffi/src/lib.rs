// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied — PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the Concord deliberation kernel.
//!
//! # FFI Safety
//!
//! - The GIL is released (`allow_threads`) while modules evaluate.
//! - Integrity failures (fork, drift, untrusted component) raise
//!   `RuntimeError`; caller mistakes raise `ValueError`. Ordinary
//!   negative outcomes are returned, never raised.
//! - All config validated before storage (`ConcordConfig::validate()`).
//!
//! Usage from Python:
//! ```python
//! from concord_kernel import DeliberationKernel
//!
//! kernel = DeliberationKernel()
//! record = kernel.resolve("tell-lie", {"lie": True, "net_welfare": 0.8})
//! assert record.mode == "blocked_by_priority"
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use concord_core::DeliberationKernel;
use concord_types::{
    Action, BreakdownEntry, ConceptDecision, ConcordConfig, ConcordError, FactLiteral,
    FactValue, Grounding, InventedConcept, ResolutionMode, ResolutionRecord,
};

fn to_py_err(e: ConcordError) -> PyErr {
    if e.is_integrity_failure() {
        PyRuntimeError::new_err(e.to_string())
    } else {
        PyValueError::new_err(e.to_string())
    }
}

fn fact_value(value: &Bound<'_, PyAny>) -> PyResult<FactValue> {
    // bool before f64: Python bools are ints
    if let Ok(b) = value.extract::<bool>() {
        return Ok(FactValue::Bool(b));
    }
    if let Ok(n) = value.extract::<f64>() {
        return Ok(FactValue::Number(n));
    }
    if let Ok(s) = value.extract::<String>() {
        return Ok(FactValue::Ident(s));
    }
    Err(PyValueError::new_err(
        "fact values must be bool, int, float or str",
    ))
}

fn parse_grounding(grounding: &str) -> PyResult<Grounding> {
    if grounding == "no_simpler_unifier" {
        return Ok(Grounding::NoSimplerUnifier);
    }
    match grounding.split_once(':') {
        Some(("observed", tag)) => Ok(Grounding::Observed(tag.to_string())),
        Some(("derived", tag)) => Ok(Grounding::Derived(tag.to_string())),
        _ => Err(PyValueError::new_err(format!(
            "grounding must be 'observed:<tag>', 'derived:<tag>' or 'no_simpler_unifier', got '{grounding}'"
        ))),
    }
}

fn breakdown_dict<'py>(py: Python<'py>, entry: &BreakdownEntry) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("module", &entry.module)?;
    dict.set_item("priority", entry.priority)?;
    dict.set_item("raw_score", entry.raw_score)?;
    dict.set_item("weight", entry.weight)?;
    dict.set_item("weighted_contribution", entry.weighted_contribution)?;
    dict.set_item("violation", entry.violation)?;
    dict.set_item("reason", entry.reason.as_deref())?;
    dict.set_item(
        "cited_facts",
        entry.cited_facts.iter().cloned().collect::<Vec<_>>(),
    )?;
    dict.set_item("warning", entry.fault.as_deref())?;
    Ok(dict)
}

fn concept_dict<'py>(py: Python<'py>, concept: &InventedConcept) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("name", &concept.name)?;
    dict.set_item(
        "supporting_facts",
        concept
            .supporting_facts
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>(),
    )?;
    dict.set_item("usage_count", concept.usage_count)?;
    dict.set_item("created_at", concept.created_at.to_rfc3339())?;
    Ok(dict)
}

// ─── PyConcordConfig ────────────────────────────────────────────────

/// Python-visible configuration for the Concord Kernel.
#[pyclass(name = "ConcordConfig")]
#[derive(Clone)]
struct PyConcordConfig {
    inner: ConcordConfig,
}

#[pymethods]
impl PyConcordConfig {
    #[new]
    #[pyo3(signature = (
        module_timeout_ms = 50,
        neutral_score = 0.5,
        weight_tolerance = 1e-9,
        density_threshold = None,
        min_concept_facts = 2,
        audit_log_path = None,
    ))]
    fn new(
        module_timeout_ms: u64,
        neutral_score: f64,
        weight_tolerance: f64,
        density_threshold: Option<f64>,
        min_concept_facts: usize,
        audit_log_path: Option<String>,
    ) -> PyResult<Self> {
        let config = ConcordConfig {
            module_timeout_ms,
            neutral_score,
            weight_tolerance,
            density_threshold,
            min_concept_facts,
            audit_log_path: audit_log_path.map(Into::into),
        };
        config.validate().map_err(to_py_err)?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = ConcordConfig::from_json(json).map_err(to_py_err)?;
        config.validate().map_err(to_py_err)?;
        Ok(Self { inner: config })
    }

    fn __repr__(&self) -> String {
        format!(
            "ConcordConfig(timeout_ms={}, neutral={}, density_threshold={:?})",
            self.inner.module_timeout_ms, self.inner.neutral_score, self.inner.density_threshold
        )
    }
}

// ─── PyResolutionRecord ─────────────────────────────────────────────

/// Python-visible resolution record.
#[pyclass(name = "ResolutionRecord")]
#[derive(Clone)]
struct PyResolutionRecord {
    inner: ResolutionRecord,
}

#[pymethods]
impl PyResolutionRecord {
    #[getter]
    fn action_id(&self) -> &str {
        &self.inner.action_id
    }

    #[getter]
    fn context(&self) -> Option<&str> {
        self.inner.context.as_deref()
    }

    /// None when the evidence was insufficient for a forced verdict.
    #[getter]
    fn final_score(&self) -> Option<f64> {
        self.inner.final_score
    }

    #[getter]
    fn mode(&self) -> &'static str {
        self.inner.mode.as_str()
    }

    /// Module that blocked the action, if any.
    #[getter]
    fn blocked_by(&self) -> Option<&str> {
        match &self.inner.mode {
            ResolutionMode::BlockedByPriority { module } => Some(module.as_str()),
            _ => None,
        }
    }

    #[getter]
    fn override_applied(&self) -> bool {
        self.inner.override_applied
    }

    #[getter]
    fn sequence(&self) -> u64 {
        self.inner.sequence
    }

    #[getter]
    fn timestamp(&self) -> String {
        self.inner.timestamp.to_rfc3339()
    }

    fn breakdown<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let items = self
            .inner
            .breakdown
            .iter()
            .map(|e| breakdown_dict(py, e))
            .collect::<PyResult<Vec<_>>>()?;
        PyList::new(py, items)
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        dict.set_item("action_id", &self.inner.action_id)?;
        dict.set_item("context", self.inner.context.as_deref())?;
        dict.set_item("final_score", self.inner.final_score)?;
        dict.set_item("mode", self.inner.mode.to_string())?;
        dict.set_item("breakdown", self.breakdown(py)?)?;
        dict.set_item("override_applied", self.inner.override_applied)?;
        dict.set_item(
            "prior_score",
            self.inner.prior_automatic.as_ref().map(|p| p.final_score),
        )?;
        dict.set_item("sequence", self.inner.sequence)?;
        dict.set_item("timestamp", self.inner.timestamp.to_rfc3339())?;
        Ok(dict)
    }

    /// Full record, including contested evidence and concept outcomes.
    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "ResolutionRecord(action_id={:?}, mode={}, final_score={:?})",
            self.inner.action_id, self.inner.mode, self.inner.final_score
        )
    }
}

// ─── PyDeliberationKernel ───────────────────────────────────────────

/// The four-framework deliberation kernel exposed to Python.
#[pyclass(name = "DeliberationKernel")]
struct PyDeliberationKernel {
    inner: DeliberationKernel,
}

#[pymethods]
impl PyDeliberationKernel {
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<PyConcordConfig>) -> PyResult<Self> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = DeliberationKernel::with_standard_modules(cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Resolve one action.
    ///
    /// Args:
    ///     action_id: Opaque identifier.
    ///     facts: dict of str -> bool | int | float | str.
    ///     context: Optional context string used for override lookup.
    #[pyo3(signature = (action_id, facts, context = None))]
    fn resolve(
        &self,
        py: Python<'_>,
        action_id: &str,
        facts: &Bound<'_, PyDict>,
        context: Option<String>,
    ) -> PyResult<PyResolutionRecord> {
        let mut action = Action::new(action_id);
        for (key, value) in facts.iter() {
            action = action.with_fact(key.extract::<String>()?, fact_value(&value)?);
        }
        let record = py
            .allow_threads(|| self.inner.resolve(&action, context.as_deref()))
            .map_err(to_py_err)?;
        Ok(PyResolutionRecord { inner: record })
    }

    fn register_override(
        &self,
        action_pattern: &str,
        context_pattern: &str,
        forced_score: f64,
    ) -> PyResult<()> {
        self.inner
            .register_override(action_pattern, context_pattern, forced_score)
            .map_err(to_py_err)
    }

    /// List of (action_pattern, context_pattern, forced_score).
    fn list_overrides(&self) -> Vec<(String, String, f64)> {
        self.inner
            .list_overrides()
            .into_iter()
            .map(|o| (o.action_pattern, o.context_pattern, o.forced_score))
            .collect()
    }

    /// Propose a concept.
    ///
    /// Args:
    ///     name: Concept name.
    ///     supporting_facts: list of (predicate, subject, value) tuples.
    ///     grounding: 'observed:<tag>', 'derived:<tag>' or 'no_simpler_unifier'.
    ///
    /// Returns:
    ///     dict with 'accepted' and either the concept or a 'reason'.
    fn propose_concept<'py>(
        &self,
        py: Python<'py>,
        name: &str,
        supporting_facts: Vec<(String, String, String)>,
        grounding: &str,
    ) -> PyResult<Bound<'py, PyDict>> {
        let facts: Vec<FactLiteral> = supporting_facts
            .into_iter()
            .map(|(p, s, v)| FactLiteral::valued(p, s, v))
            .collect();
        let grounding = parse_grounding(grounding)?;
        let decision = self
            .inner
            .propose_concept(name, &facts, &grounding)
            .map_err(to_py_err)?;
        match decision {
            ConceptDecision::Accepted(concept) => {
                let dict = concept_dict(py, &concept)?;
                dict.set_item("accepted", true)?;
                Ok(dict)
            }
            ConceptDecision::Rejected { name, reason } => {
                let dict = PyDict::new(py);
                dict.set_item("accepted", false)?;
                dict.set_item("name", name)?;
                dict.set_item("reason", reason.as_str())?;
                Ok(dict)
            }
        }
    }

    fn list_invented_concepts<'py>(&self, py: Python<'py>) -> PyResult<Vec<Bound<'py, PyDict>>> {
        self.inner
            .list_invented_concepts()
            .iter()
            .map(|c| concept_dict(py, c))
            .collect()
    }

    fn check_consistency(&self, component: &str) -> bool {
        self.inner.check_consistency(component)
    }

    /// Transactions as JSON strings, in ledger order.
    fn get_transactions(&self, component: &str) -> PyResult<Vec<String>> {
        self.inner
            .get_transactions(component)
            .iter()
            .map(|tx| serde_json::to_string(tx).map_err(|e| PyValueError::new_err(e.to_string())))
            .collect()
    }

    fn register_expected(&self, component: &str, hash: &str) -> PyResult<()> {
        self.inner
            .register_expected(component, hash)
            .map_err(to_py_err)
    }

    fn verify(&self, component: &str, current_hash: &str) -> bool {
        self.inner.verify(component, current_hash)
    }

    fn reverify(&self, component: &str, current_hash: &str) -> PyResult<()> {
        self.inner.reverify(component, current_hash).map_err(to_py_err)
    }

    fn audit_log(&self) -> Vec<PyResolutionRecord> {
        self.inner
            .audit_log()
            .into_iter()
            .map(|inner| PyResolutionRecord { inner })
            .collect()
    }

    fn audit_root(&self) -> String {
        self.inner.audit_root()
    }

    /// Inclusion proof for one audit record, as JSON.
    fn audit_proof(&self, sequence: u64) -> PyResult<Option<String>> {
        self.inner
            .audit_proof(sequence)
            .map(|proof| serde_json::to_string(&proof))
            .transpose()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn verify_audit_chain(&self) -> PyResult<String> {
        self.inner.verify_audit_chain().map_err(to_py_err)
    }
}

// ─── Module Registration ────────────────────────────────────────────

#[pymodule]
fn concord_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyConcordConfig>()?;
    m.add_class::<PyResolutionRecord>()?;
    m.add_class::<PyDeliberationKernel>()?;
    Ok(())
}
