//! Piece-level helpers on top of [`MerkleTree`].
//!
//! BEP 52 uses a binary merkle tree of SHA-256 hashes over 16 KiB blocks.
//! Piece hashes in `piece layers` are the roots of per-piece subtrees.
//! The file's `pieces_root` is the root of the full merkle tree over all pieces.

use crate::{Error, Id32, MERKLE_BLOCK_SIZE, MerkleTree, Result, hash::merkle_pad, layers};

/// Verify a piece's block hashes against the expected piece hash from `piece layers`.
///
/// `block_hashes`: SHA-256 hashes of each 16 KiB block in this piece.
/// `blocks_per_piece`: `piece_length / MERKLE_BLOCK_SIZE`, always a power of 2 per BEP 52.
///
/// Missing trailing blocks (the end of the file) are padding.
pub fn verify_piece(block_hashes: &[Id32], expected: &Id32, blocks_per_piece: u32) -> bool {
    let bpp = blocks_per_piece as usize;
    if !bpp.is_power_of_two() || block_hashes.len() > bpp {
        return false;
    }
    match MerkleTree::build(bpp, block_hashes) {
        Ok(tree) => tree.root() == *expected,
        Err(_) => false,
    }
}

/// Verify the only piece of a file that fits into one piece.
///
/// Such a file's tree is sized by its own block count, not by the piece
/// length, so the piece hash is the file root and the blocks are only padded
/// up to the next power of two.
pub fn verify_single_piece_file(block_hashes: &[Id32], expected: &Id32) -> bool {
    match MerkleTree::build(block_hashes.len(), block_hashes) {
        Ok(tree) => tree.root() == *expected,
        Err(_) => false,
    }
}

/// Result of computing a full merkle tree for a file.
#[derive(Debug)]
pub struct MerkleResult {
    /// The merkle root (= pieces_root for the file tree entry).
    pub root: Id32,
    /// Piece-layer hashes. Only includes hashes for pieces that cover at least
    /// one byte of actual file data.
    /// For single-piece files, this is a single element equal to `root`.
    pub piece_hashes: Vec<Id32>,
    /// The whole tree, with all blocks as leaves.
    pub tree: MerkleTree,
}

/// Compute the full merkle tree for a file from its block hashes.
///
/// `blocks_per_piece` must be a power of 2.
pub fn compute_merkle_root(block_hashes: &[Id32], blocks_per_piece: u32) -> Result<MerkleResult> {
    let bpp = blocks_per_piece as usize;
    if !bpp.is_power_of_two() {
        return Err(Error::InvalidPieceLength(
            blocks_per_piece.saturating_mul(MERKLE_BLOCK_SIZE),
        ));
    }
    let tree = MerkleTree::build(block_hashes.len(), block_hashes)?;
    let n_data_pieces = block_hashes.len().div_ceil(bpp);

    let piece_layer_start = layers::piece_layer_start(tree.num_leafs(), n_data_pieces);
    let piece_hashes = tree.layer(piece_layer_start)[..n_data_pieces].to_vec();

    Ok(MerkleResult {
        root: tree.root(),
        piece_hashes,
        tree,
    })
}

/// Rebuild the merkle root from piece-layer hashes for a file.
///
/// The piece layer contains `ceil(file_length / piece_length)` hashes.
/// Trailing nodes beyond the actual piece count are padded with the subtree
/// root of `blocks_per_piece` zero leaves.
pub fn root_from_piece_layer(
    piece_hashes: &[Id32],
    file_length: u64,
    piece_length: u32,
) -> Result<Id32> {
    if piece_length < MERKLE_BLOCK_SIZE || !piece_length.is_power_of_two() {
        return Err(Error::InvalidPieceLength(piece_length));
    }
    let num_pieces = file_length.div_ceil(piece_length as u64) as usize;
    if piece_hashes.len() != num_pieces {
        return Err(Error::PieceLayerCountMismatch {
            expected: num_pieces,
            actual: piece_hashes.len(),
        });
    }

    if num_pieces == 1 {
        // Single-piece file: the piece hash IS the root.
        return Ok(piece_hashes[0]);
    }

    // Only the layers from the pieces up are needed, so the pieces are the
    // leaves here and padded explicitly.
    let blocks_per_piece = (piece_length / MERKLE_BLOCK_SIZE) as usize;
    let mut tree = MerkleTree::new(num_pieces, Id32::default())?;
    let mut layer = piece_hashes.to_vec();
    layer.resize(tree.num_leafs(), merkle_pad(blocks_per_piece, 1));
    tree.set_leafs(&layer);
    tree.fill(layer.len());
    Ok(tree.root())
}
