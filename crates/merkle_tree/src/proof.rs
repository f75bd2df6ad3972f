//! Uncle-hash proofs, as carried by BEP 52 `hashes` messages.

use tracing::trace;

use crate::{Id32, MerkleTree, hash::hash_pair, layers};

/// Verify `hash`, sitting at position `index` of its layer, against a proof
/// path up to `expected_root`.
///
/// `proof`: sibling hashes from the layer of `hash` up to (but not including)
/// the root.
pub fn verify_proof(hash: &Id32, index: usize, proof: &[Id32], expected_root: &Id32) -> bool {
    // Proof length defines the subtree depth. If index is out of range, fail.
    if proof.len() >= usize::BITS as usize || index >= (1usize << proof.len()) {
        return false;
    }

    let mut idx = index;
    let mut hash = *hash;
    for sibling in proof {
        if idx & 1 == 0 {
            hash = hash_pair(&hash, sibling);
        } else {
            hash = hash_pair(sibling, &hash);
        }
        idx >>= 1;
    }

    hash == *expected_root
}

impl MerkleTree {
    /// The uncle hashes needed to verify `node` against the root, bottom first.
    pub fn proof(&self, node: usize) -> Vec<Id32> {
        assert!(node < self.size(), "node {node} out of range");
        let mut ret = Vec::with_capacity(layers::layer_of(node) as usize);
        let mut node = node;
        while node > 0 {
            ret.push(self.nodes()[layers::sibling(node)]);
            node = layers::parent(node);
        }
        ret
    }

    /// Check a hash received for `node` together with its uncles against the
    /// root of this tree. If it checks out, the node, its uncles and all the
    /// ancestors computed on the way are stored in the tree.
    ///
    /// Nothing is written if the proof is wrong. Returns whether it was right.
    pub fn insert_proof(&mut self, node: usize, hash: Id32, proof: &[Id32]) -> bool {
        if self.is_empty() || node >= self.size() {
            trace!(node, size = self.size(), "ignoring proof: node out of range");
            return false;
        }
        let depth = layers::layer_of(node);
        if proof.len() != depth as usize {
            trace!(node, expected = depth, got = proof.len(), "ignoring proof: bad length");
            return false;
        }

        let mut path = Vec::with_capacity(proof.len() + 1);
        let mut idx = node;
        let mut current = hash;
        for uncle in proof {
            path.push((idx, current));
            current = if idx % 2 == 1 {
                hash_pair(&current, uncle)
            } else {
                hash_pair(uncle, &current)
            };
            idx = layers::parent(idx);
        }

        if current != self.root() {
            trace!(node, expected = ?self.root(), got = ?current, "ignoring proof: root mismatch");
            return false;
        }

        for ((idx, h), uncle) in path.into_iter().zip(proof) {
            self.set_node(idx, h);
            self.set_node(layers::sibling(idx), *uncle);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_block;

    fn leafs(n: usize) -> Vec<Id32> {
        (0..n).map(|i| hash_block(format!("b{i}").as_bytes())).collect()
    }

    #[test]
    fn test_verify_proof_valid() {
        let h = leafs(4);
        let root = hash_pair(&hash_pair(&h[0], &h[1]), &hash_pair(&h[2], &h[3]));
        let proof = [h[3], hash_pair(&h[0], &h[1])];
        assert!(verify_proof(&h[2], 2, &proof, &root));
    }

    #[test]
    fn test_verify_proof_rejects_wrong_index() {
        let h = leafs(4);
        let root = hash_pair(&hash_pair(&h[0], &h[1]), &hash_pair(&h[2], &h[3]));
        let proof = [h[3], hash_pair(&h[0], &h[1])];
        assert!(!verify_proof(&h[2], 1, &proof, &root));
        assert!(!verify_proof(&h[2], 4, &proof, &root));
    }

    #[test]
    fn test_tree_proof_verifies() {
        let t = MerkleTree::build(5, &leafs(5)).unwrap();
        for (i, leaf) in t.leafs().iter().enumerate() {
            let proof = t.proof(t.leafs_start() + i);
            assert_eq!(proof.len(), 3);
            assert!(verify_proof(leaf, i, &proof, &t.root()));
        }
        assert!(t.proof(0).is_empty());
    }

    #[test]
    fn test_insert_proof() {
        let full = MerkleTree::build(8, &leafs(8)).unwrap();
        let mut t = MerkleTree::new(8, full.root()).unwrap();

        let node = full.leafs_start() + 5;
        let proof = full.proof(node);
        assert!(t.insert_proof(node, full.nodes()[node], &proof));

        // The path from node 12 to the root, and its uncles.
        for i in [12, 11, 5, 6, 2, 1] {
            assert_eq!(t.nodes()[i], full.nodes()[i], "node {i}");
        }
        assert!(t.nodes()[7].is_zero());
    }

    #[test]
    fn test_insert_proof_rejects_bad_data() {
        let full = MerkleTree::build(8, &leafs(8)).unwrap();
        let mut t = MerkleTree::new(8, full.root()).unwrap();
        let before = t.export_nodes();

        let node = full.leafs_start() + 2;
        let proof = full.proof(node);
        assert!(!t.insert_proof(node, hash_block(b"evil"), &proof));
        assert!(!t.insert_proof(node + 1, full.nodes()[node], &proof));
        assert!(!t.insert_proof(node, full.nodes()[node], &proof[..2]));
        assert!(!t.insert_proof(100, full.nodes()[node], &proof));
        assert_eq!(t.export_nodes(), before);
    }

    #[test]
    fn test_insert_piece_layer_proof() {
        let full = MerkleTree::build(8, &leafs(8)).unwrap();
        let mut t = MerkleTree::new(8, full.root()).unwrap();
        // A piece of 2 blocks sits on the width 4 layer.
        let node = 3 + 1;
        assert!(t.insert_proof(node, full.nodes()[node], &full.proof(node)));
        assert_eq!(t.nodes()[3], full.nodes()[3]);
        assert_eq!(t.nodes()[4], full.nodes()[4]);
        assert_eq!(t.nodes()[2], full.nodes()[2]);
    }
}
