//! Index arithmetic for a complete binary tree stored as a flat array.
//!
//! The root is at index 0, and layers follow each other breadth-first, so layer
//! `d` occupies `[2^d - 1, 2^(d+1) - 1)`. The children of node `i` are at
//! `2i + 1` and `2i + 2`.

/// The largest padded leaf count a tree may have. Keeps `2 * leafs - 1` (and
/// every node index) inside `usize`.
pub const MAX_LEAFS: usize = 1 << (usize::BITS - 2);

/// Number of leaves in the padded tree: the smallest power of two `>= block_count`.
pub fn leaf_count(block_count: usize) -> usize {
    assert!(block_count > 0, "a merkle tree needs at least one block");
    block_count.next_power_of_two()
}

/// Same as [`leaf_count`], but `None` for 0 blocks or when the tree would be
/// too large to address.
pub fn checked_leaf_count(block_count: usize) -> Option<usize> {
    if block_count == 0 {
        return None;
    }
    block_count
        .checked_next_power_of_two()
        .filter(|leafs| *leafs <= MAX_LEAFS)
}

pub fn node_count(leafs: usize) -> usize {
    debug_assert!(leafs.is_power_of_two());
    2 * leafs - 1
}

/// `(start, count)` of the leaf layer given the total number of nodes.
///
/// The leaf layer is the second half of the array, rounded up. An empty array
/// has an empty leaf layer.
pub fn leaf_range(total_nodes: usize) -> (usize, usize) {
    let count = total_nodes.div_ceil(2);
    (total_nodes - count, count)
}

/// Number of layers below the root, i.e. `log2(leafs)`.
pub fn tree_depth(leafs: usize) -> u32 {
    assert!(leafs.is_power_of_two(), "leaf count {leafs} is not a power of two");
    leafs.trailing_zeros()
}

/// Index of the first node of the layer at `depth` (the root is depth 0).
pub const fn layer_start(depth: u32) -> usize {
    (1 << depth) - 1
}

pub const fn layer_width(depth: u32) -> usize {
    1 << depth
}

/// Depth of the layer containing `index`.
pub const fn layer_of(index: usize) -> u32 {
    usize::BITS - 1 - (index + 1).leading_zeros()
}

pub const fn is_layer_start(index: usize) -> bool {
    (index + 1).is_power_of_two()
}

pub fn parent(index: usize) -> usize {
    assert!(index > 0, "the root has no parent");
    (index - 1) / 2
}

pub const fn first_child(index: usize) -> usize {
    index * 2 + 1
}

pub fn sibling(index: usize) -> usize {
    assert!(index > 0, "the root has no sibling");
    if index % 2 == 1 { index + 1 } else { index - 1 }
}

/// Start of the layer holding `piece_layer_size` pieces in a tree with
/// `num_leafs` leaves.
///
/// That is the layer whose width is the piece count rounded up to a power of
/// two. With no pieces at all, or more pieces than leaves, the leaf layer is
/// used.
pub fn piece_layer_start(num_leafs: usize, piece_layer_size: usize) -> usize {
    let width = if piece_layer_size == 0 {
        num_leafs
    } else {
        piece_layer_size.next_power_of_two().min(num_leafs)
    };
    layer_start(tree_depth(width))
}
