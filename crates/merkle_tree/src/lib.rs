//! Per-file SHA-256 merkle trees for BitTorrent v2 (BEP 52).
//!
//! Every file of a v2 torrent has a trusted root hash (`pieces root`) in the
//! info dictionary. [`MerkleTree`] stores the complete padded binary tree for
//! one such file as a flat array, so that hashes received from untrusted peers
//! can be checked against that root piece by piece.

pub mod error;
pub mod hash;
pub mod hash_id;
pub mod layers;
pub mod piece;
pub mod proof;
pub mod tree;

pub use error::{Error, Result};
pub use hash::{MERKLE_BLOCK_SIZE, hash_block, hash_pair, merkle_pad, pad_hash, zero_hash};
pub use hash_id::Id32;
pub use piece::{
    MerkleResult, compute_merkle_root, root_from_piece_layer, verify_piece,
    verify_single_piece_file,
};
pub use proof::verify_proof;
pub use tree::MerkleTree;
