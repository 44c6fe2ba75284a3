// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Merkle Inclusion Proofs
// ─────────────────────────────────────────────────────────────────────
//! Binary Merkle tree over hex leaf hashes.
//!
//! Interior nodes are `sha256(left_hex ‖ right_hex)`. A level with an odd
//! number of nodes pairs its last node with itself. The empty tree has
//! the all-zero root.

use serde::{Deserialize, Serialize};

use crate::fingerprint::sha256_hex;

/// Root of a tree with no leaves.
pub const EMPTY_ROOT: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: String,
    pub side: SiblingSide,
}

/// Self-contained inclusion proof. Verifiable offline, with no access
/// to the tree it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub index: usize,
    pub leaf_hash: String,
    pub path: Vec<ProofStep>,
    pub root: String,
}

impl MerkleProof {
    /// Recompute the root from the leaf and its siblings.
    pub fn verify(&self) -> bool {
        let computed = self.path.iter().fold(self.leaf_hash.clone(), |acc, step| {
            match step.side {
                SiblingSide::Right => node_hash(&acc, &step.sibling),
                SiblingSide::Left => node_hash(&step.sibling, &acc),
            }
        });
        computed == self.root
    }

    /// `verify`, plus the proof must commit to `expected_root`.
    pub fn verify_against(&self, expected_root: &str) -> bool {
        self.root == expected_root && self.verify()
    }
}

fn node_hash(left: &str, right: &str) -> String {
    let mut joined = String::with_capacity(left.len() + right.len());
    joined.push_str(left);
    joined.push_str(right);
    sha256_hex(joined.as_bytes())
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            node_hash(left, pair.get(1).unwrap_or(left))
        })
        .collect()
}

/// Root over `leaves`, in order.
pub fn merkle_root(leaves: &[String]) -> String {
    if leaves.is_empty() {
        return EMPTY_ROOT.to_string();
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.remove(0)
}

/// Inclusion proof for `leaves[index]`, or `None` if out of range.
pub fn inclusion_proof(leaves: &[String], index: usize) -> Option<MerkleProof> {
    let leaf_hash = leaves.get(index)?.clone();
    let mut path = Vec::new();
    let mut level = leaves.to_vec();
    let mut idx = index;
    while level.len() > 1 {
        let step = if idx % 2 == 0 {
            // odd tail pairs with itself
            let sibling = level.get(idx + 1).unwrap_or(&level[idx]).clone();
            ProofStep {
                sibling,
                side: SiblingSide::Right,
            }
        } else {
            ProofStep {
                sibling: level[idx - 1].clone(),
                side: SiblingSide::Left,
            }
        };
        path.push(step);
        level = next_level(&level);
        idx /= 2;
    }
    Some(MerkleProof {
        index,
        leaf_hash,
        path,
        root: level.remove(0),
    })
}
