// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Deterministic State Fingerprints
// ─────────────────────────────────────────────────────────────────────

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 of the canonical JSON encoding of `value`.
///
/// Object keys serialize in sorted order, so two values that compare
/// equal always produce the same fingerprint regardless of how they
/// were built.
pub fn fingerprint_of(value: &Value) -> String {
    sha256_hex(value.to_string().as_bytes())
}

/// A component whose stable configuration can be fingerprinted.
///
/// `state()` must exclude timestamps, counters and anything random:
/// two components built from the same configuration hash identically.
pub trait StateFingerprint {
    fn state(&self) -> Value;

    fn fingerprint(&self) -> String {
        fingerprint_of(&self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Model {
        trained: bool,
        features: Vec<&'static str>,
    }

    impl StateFingerprint for Model {
        fn state(&self) -> Value {
            let mut features = self.features.clone();
            features.sort_unstable();
            json!({ "trained": self.trained, "features": features })
        }
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_key_order_irrelevant() {
        let a = json!({ "a": 1, "b": [true, "x"] });
        let b = json!({ "b": [true, "x"], "a": 1 });
        assert_eq!(fingerprint_of(&a), fingerprint_of(&b));
    }

    #[test]
    fn test_independent_instances_hash_identically() {
        let m1 = Model {
            trained: true,
            features: vec!["b", "a"],
        };
        let m2 = Model {
            trained: true,
            features: vec!["a", "b"],
        };
        assert_eq!(m1.fingerprint(), m2.fingerprint());
    }

    #[test]
    fn test_state_change_changes_hash() {
        let m1 = Model {
            trained: false,
            features: vec!["a"],
        };
        let m2 = Model {
            trained: true,
            features: vec!["a"],
        };
        assert_ne!(m1.fingerprint(), m2.fingerprint());
    }
}
