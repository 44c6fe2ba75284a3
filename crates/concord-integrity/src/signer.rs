// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Transaction Signer Seam
// ─────────────────────────────────────────────────────────────────────
//! Identity and signing are external collaborators. The ledger only
//! needs something that turns a content hash into a signature string.
//! [`DigestSigner`] is a keyed-digest stand-in for tests and for
//! deployments without a key service.

use crate::fingerprint::sha256_hex;

pub trait Signer: Send + Sync {
    /// Identifier of the signing key, recorded for audit.
    fn key_id(&self) -> &str;

    fn sign(&self, data_hash: &str) -> String;

    fn verify(&self, data_hash: &str, signature: &str) -> bool {
        self.sign(data_hash) == signature
    }
}

/// SHA-256 over `key || data_hash`. Not a real signature scheme.
pub struct DigestSigner {
    key_id: String,
    key: Vec<u8>,
}

impl DigestSigner {
    pub fn new(key_id: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: key_id.into(),
            key: key.into(),
        }
    }
}

impl Default for DigestSigner {
    fn default() -> Self {
        Self::new("concord-local", b"concord-local".to_vec())
    }
}

impl Signer for DigestSigner {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn sign(&self, data_hash: &str) -> String {
        let mut buf = Vec::with_capacity(self.key.len() + data_hash.len());
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(data_hash.as_bytes());
        sha256_hex(&buf)
    }
}
