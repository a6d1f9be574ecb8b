//! Checksum Engine Module
//!
//! Computes structural fingerprints of tree snapshots.

use sha2::{Digest, Sha256};

use crate::tree::TreeNode;

/// Length of the hex digest kept as the fingerprint.
const CHECKSUM_LENGTH: usize = 16;

// == Structural Checksum ==
/// Computes a structural fingerprint of a tree.
///
/// The fingerprint covers the set of node ids only: the flattened id list is
/// sorted before hashing, so the result is invariant to the order in which
/// children were fetched. Two trees with identical id sets produce the same
/// checksum even when labels or metadata differ; shape changes are what gate
/// consumer re-renders, and per-node content is re-read on demand.
///
/// A root with no children still hashes its own id, so an empty tree yields a
/// stable non-empty fingerprint.
pub fn checksum(tree: &TreeNode) -> String {
    let mut ids = tree.collect_ids();
    ids.sort_unstable();

    let digest = Sha256::digest(ids.join(",").as_bytes());
    let mut fingerprint = hex::encode(digest);
    fingerprint.truncate(CHECKSUM_LENGTH);
    fingerprint
}
