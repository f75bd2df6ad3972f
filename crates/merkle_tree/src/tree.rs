use tracing::{debug, trace};

use crate::{
    Error, Id32, Result,
    hash::{hash_pair, pad_hash},
    layers,
};

/// The merkle tree of a single file.
///
/// Each file has a root hash and a "piece layer", i.e. the layer in the tree
/// representing whole pieces. Those hashes are likely to be included in
/// .torrent files and known up-front. Everything else is filled in while
/// downloading, and can be dropped again with [`MerkleTree::clear`] once it's
/// no longer needed.
///
/// The nodes of the complete (padded) binary tree are stored breadth-first in
/// one array, so the shape never changes after construction. Unknown nodes
/// are zero.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    nodes: Vec<Id32>,
}

impl std::fmt::Debug for MerkleTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerkleTree")
            .field("nodes", &self.nodes.len())
            .field("root", &self.nodes.first())
            .finish()
    }
}

impl MerkleTree {
    /// A tree for a file of `num_blocks` blocks whose root is already trusted.
    pub fn new(num_blocks: usize, root: Id32) -> Result<Self> {
        if num_blocks == 0 {
            return Err(Error::InvalidBlockCount(num_blocks));
        }
        let leafs =
            layers::checked_leaf_count(num_blocks).ok_or(Error::TooManyBlocks(num_blocks))?;
        let mut nodes = vec![Id32::default(); layers::node_count(leafs)];
        nodes[0] = root;
        debug!(num_blocks, leafs, ?root, "created merkle tree");
        Ok(Self { nodes })
    }

    /// Restore a tree from a previously exported node array.
    ///
    /// The nodes are trusted as-is, so only pass data that was verified before.
    pub fn from_nodes(nodes: Vec<Id32>) -> Self {
        Self { nodes }
    }

    /// Build a tree over `num_blocks` blocks from the known leaf hashes and
    /// compute all interior nodes. Leaves past `leafs.len()` are padding.
    pub fn build(num_blocks: usize, leafs: &[Id32]) -> Result<Self> {
        let mut tree = Self::new(num_blocks, Id32::default())?;
        assert!(
            leafs.len() <= tree.num_leafs(),
            "{} leaf hashes don't fit into {} leaves",
            leafs.len(),
            tree.num_leafs()
        );
        if tree.nodes.len() == 1 {
            // The only leaf is the root.
            tree.nodes[0] = leafs.first().copied().unwrap_or_else(|| pad_hash(0));
            return Ok(tree);
        }
        tree.set_leafs(leafs);
        tree.fill_from(leafs.len(), tree.leafs_start());
        Ok(tree)
    }

    pub fn root(&self) -> Id32 {
        self.nodes[0]
    }

    /// Replace the whole tree with `t`, if `t` is the same shape and has the
    /// same root as this tree.
    ///
    /// Anything else (typically bad data from a peer) is ignored. Returns whether
    /// the tree was accepted.
    pub fn load_tree(&mut self, t: &[Id32]) -> bool {
        if t.is_empty() || self.nodes.is_empty() {
            trace!(candidate = t.len(), "ignoring merkle tree: empty");
            return false;
        }
        if self.nodes[0] != t[0] {
            trace!(expected = ?self.nodes[0], got = ?t[0], "ignoring merkle tree: root mismatch");
            return false;
        }
        if self.nodes.len() != t.len() {
            trace!(
                expected = self.nodes.len(),
                got = t.len(),
                "ignoring merkle tree: size mismatch"
            );
            return false;
        }
        self.nodes.copy_from_slice(t);
        true
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn num_leafs(&self) -> usize {
        layers::leaf_range(self.nodes.len()).1
    }

    /// Number of layers below the root.
    pub fn depth(&self) -> u32 {
        layers::tree_depth(self.num_leafs())
    }

    pub fn leafs_start(&self) -> usize {
        layers::leaf_range(self.nodes.len()).0
    }

    /// The bottom layer of the tree.
    pub fn leafs(&self) -> &[Id32] {
        // given the full size of the tree, the second half of the nodes are
        // leaves, rounded up.
        let (start, count) = layers::leaf_range(self.nodes.len());
        &self.nodes[start..start + count]
    }

    pub fn nodes(&self) -> &[Id32] {
        &self.nodes
    }

    /// The whole layer starting at node index `level_start`.
    pub fn layer(&self, level_start: usize) -> &[Id32] {
        self.assert_layer_start(level_start);
        let width = layers::layer_width(layers::layer_of(level_start));
        &self.nodes[level_start..level_start + width]
    }

    pub fn export_nodes(&self) -> Vec<Id32> {
        self.nodes.clone()
    }

    /// Write known hashes (e.g. the piece layer from the torrent file) to the
    /// beginning of the layer starting at `level_start`.
    ///
    /// The root can't be set this way.
    pub fn set_layer(&mut self, level_start: usize, hashes: &[Id32]) {
        self.assert_layer_start(level_start);
        assert!(level_start > 0, "the root can't be overwritten");
        let width = layers::layer_width(layers::layer_of(level_start));
        assert!(
            hashes.len() <= width,
            "{} hashes don't fit into a layer of {width}",
            hashes.len()
        );
        self.nodes[level_start..level_start + hashes.len()].copy_from_slice(hashes);
    }

    pub fn set_leafs(&mut self, hashes: &[Id32]) {
        self.set_layer(self.leafs_start(), hashes);
    }

    /// Compute all nodes above the piece layer, where the first
    /// `piece_layer_size` entries are known.
    ///
    /// The piece layer is the one that's `piece_layer_size` rounded up to a
    /// power of two wide (the leaf layer if `piece_layer_size` is 0).
    pub fn fill(&mut self, piece_layer_size: usize) {
        let level_start = layers::piece_layer_start(self.num_leafs(), piece_layer_size);
        self.fill_from(piece_layer_size, level_start);
    }

    /// Compute all nodes above the layer starting at `level_start`, up to and
    /// including the root.
    ///
    /// The first `num_valid` nodes of that layer must be populated. The rest of
    /// it is overwritten with padding hashes. This doesn't check the result
    /// against the previous root.
    pub fn fill_from(&mut self, num_valid: usize, level_start: usize) {
        self.assert_layer_start(level_start);
        let mut depth = layers::layer_of(level_start);
        let tree_depth = self.depth();
        let mut width = layers::layer_width(depth);
        assert!(
            num_valid <= width,
            "{num_valid} valid nodes in a layer of {width}"
        );

        let mut start = level_start;
        let mut valid = num_valid;
        self.nodes[start + valid..start + width].fill(pad_hash(tree_depth - depth));

        while depth > 0 {
            let parent_start = layers::parent(start);
            let parent_valid = valid.div_ceil(2);
            let pad = pad_hash(tree_depth - depth);
            for p in 0..parent_valid {
                let left = layers::first_child(parent_start + p);
                let right = if 2 * p + 1 < valid {
                    self.nodes[left + 1]
                } else {
                    pad
                };
                self.nodes[parent_start + p] = hash_pair(&self.nodes[left], &right);
            }
            self.nodes[parent_start + parent_valid..parent_start + width / 2]
                .fill(pad_hash(tree_depth - depth + 1));

            start = parent_start;
            valid = parent_valid;
            width /= 2;
            depth -= 1;
        }
    }

    /// Zero `num_leafs` nodes starting at `level_start`, and every node above
    /// them, except for the root.
    pub fn clear(&mut self, num_leafs: usize, level_start: usize) {
        self.assert_layer_start(level_start);
        assert!(
            num_leafs <= layers::layer_width(layers::layer_of(level_start)),
            "can't clear {num_leafs} nodes from layer starting at {level_start}"
        );
        let mut start = level_start;
        let mut size = num_leafs;
        while start > 0 && size > 0 {
            self.nodes[start..start + size].fill(Id32::default());
            start = layers::parent(start);
            size = size.div_ceil(2);
        }
    }

    /// Zero one whole layer (not the root).
    pub fn clear_layer(&mut self, level_start: usize) {
        self.assert_layer_start(level_start);
        assert!(level_start > 0, "the root can't be cleared");
        let width = layers::layer_width(layers::layer_of(level_start));
        self.nodes[level_start..level_start + width].fill(Id32::default());
    }

    fn assert_layer_start(&self, level_start: usize) {
        assert!(
            layers::is_layer_start(level_start) && level_start < self.nodes.len(),
            "{level_start} is not the start of a layer in a tree of {} nodes",
            self.nodes.len()
        );
    }

    pub(crate) fn set_node(&mut self, index: usize, hash: Id32) {
        self.nodes[index] = hash;
    }
}
