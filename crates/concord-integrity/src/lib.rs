// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Concord Integrity
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Provenance and self-consistency checks for the Concord Kernel.
//!
//! Two independent guards live here:
//!
//! - [`ConsistencyLedger`]: append-only log of inter-component
//!   transactions. A component that emits two structurally different
//!   transactions under one content hash has *forked*.
//! - [`DriftMonitor`]: remembers each component's expected state
//!   fingerprint and flags any change that was not made through an
//!   explicit `update`.
//!
//! Both failures are fatal to the resolution that depends on the
//! component; neither is retried.
//!
//! [`merkle`] supplies the inclusion proofs the audit log commits to.

pub mod drift;
pub mod fingerprint;
pub mod ledger;
pub mod merkle;
pub mod signer;

pub use drift::{ComponentFingerprint, DriftMonitor};
pub use fingerprint::{fingerprint_of, sha256_hex, StateFingerprint};
pub use ledger::{ConsistencyLedger, Transaction};
pub use merkle::{
    inclusion_proof, merkle_root, MerkleProof, ProofStep, SiblingSide, EMPTY_ROOT,
};
pub use signer::{DigestSigner, Signer};
