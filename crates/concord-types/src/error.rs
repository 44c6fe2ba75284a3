// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Kernel Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Concord Kernel failures.
///
/// Ordinary negative outcomes (a blocked action, a deadlocked pair of
/// evidence sets, a rejected concept) are *values*, never errors. The
/// variants here are either caller mistakes or integrity failures.
#[derive(Error, Debug)]
pub enum ConcordError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid input (module set, override score, fingerprint registration).
    #[error("validation error: {0}")]
    Validation(String),

    /// A component emitted two divergent claims under the same content hash.
    #[error("fork detected: component '{component}' holds divergent transactions for hash {data_hash}")]
    ForkDetected { component: String, data_hash: String },

    /// A component's state fingerprint changed without an explicit update.
    #[error("drift detected: component '{component}' expected {expected}, found {actual}")]
    DriftDetected {
        component: String,
        expected: String,
        actual: String,
    },

    /// A component previously failed drift verification and has not been re-verified.
    #[error("component '{component}' is untrusted until re-verified")]
    Untrusted { component: String },

    /// Lookup of a component that was never registered.
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// JSON encoding/decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Audit log could not be written or read.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// A persisted audit entry no longer matches its committed hash.
    #[error("audit log tampered: {0}")]
    Tampered(String),
}

impl ConcordError {
    /// True for failures that mean the kernel's integrity is compromised,
    /// as opposed to a caller error.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ConcordError::ForkDetected { .. }
                | ConcordError::DriftDetected { .. }
                | ConcordError::Untrusted { .. }
                | ConcordError::Tampered(_)
        )
    }
}

impl From<serde_json::Error> for ConcordError {
    fn from(e: serde_json::Error) -> Self {
        ConcordError::Serialization(e.to_string())
    }
}

pub type ConcordResult<T> = Result<T, ConcordError>;
