use std::sync::LazyLock;

use sha256w::ISha256;

use crate::{Id32, layers};

/// Fixed 16 KiB block size used for merkle leaf hashing in BEP 52.
pub const MERKLE_BLOCK_SIZE: u32 = 16384;

/// One padding hash per possible tree depth.
const PAD_LEVELS: usize = usize::BITS as usize;

/// BEP 52: padding leaf hashes beyond EOF are all-zero bytes (NOT SHA-256 of zeros).
pub const fn zero_hash() -> Id32 {
    Id32::new([0u8; 32])
}

/// SHA-256 hash of a single data block.
pub fn hash_block(data: &[u8]) -> Id32 {
    let mut h = sha256w::Sha256::new();
    h.update(data);
    Id32::new(h.finish())
}

/// SHA-256(left || right): internal merkle node hash.
pub fn hash_pair(left: &Id32, right: &Id32) -> Id32 {
    let mut h = sha256w::Sha256::new();
    h.update(&left.0);
    h.update(&right.0);
    Id32::new(h.finish())
}

static PAD_HASHES: LazyLock<[Id32; PAD_LEVELS]> = LazyLock::new(|| {
    let mut pads = [zero_hash(); PAD_LEVELS];
    for level in 1..PAD_LEVELS {
        pads[level] = hash_pair(&pads[level - 1], &pads[level - 1]);
    }
    pads
});

/// Root of a subtree of `2^level` padding leaves.
///
/// `pad_hash(0)` is the leaf padding, and each level up is the pair hash of two
/// copies of the level below.
///
/// `level` must be below `usize::BITS`, which covers every tree depth that can
/// be addressed.
pub fn pad_hash(level: u32) -> Id32 {
    assert!(
        (level as usize) < PAD_LEVELS,
        "no tree is {level} layers deep, padding goes up to {}",
        PAD_LEVELS - 1
    );
    PAD_HASHES[level as usize]
}

/// Padding hash at the layer where each node covers `blocks / pieces` leaves,
/// e.g. the hash of a piece lying entirely beyond the end of the file.
pub fn merkle_pad(blocks: usize, pieces: usize) -> Id32 {
    assert!(
        blocks >= pieces && pieces > 0,
        "can't pad {pieces} pieces out of {blocks} blocks"
    );
    pad_hash(layers::tree_depth(blocks / pieces))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_hash_is_all_zeros() {
        assert_eq!(zero_hash().0, [0u8; 32]);
        assert_eq!(pad_hash(0), zero_hash());
    }

    #[test]
    fn test_hash_block_known_value() {
        assert_eq!(
            hash_block(b"").as_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_pair_order_matters() {
        let a = hash_block(b"left");
        let b = hash_block(b"right");
        assert_eq!(hash_pair(&a, &b), hash_pair(&a, &b));
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));
    }

    #[test]
    fn test_pad_chain() {
        let z = zero_hash();
        let p1 = hash_pair(&z, &z);
        let p2 = hash_pair(&p1, &p1);
        assert_eq!(pad_hash(1), p1);
        assert_eq!(pad_hash(2), p2);
        assert_eq!(
            pad_hash(1).as_string(),
            "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
        );
        for level in 1..20 {
            assert_eq!(
                pad_hash(level),
                hash_pair(&pad_hash(level - 1), &pad_hash(level - 1))
            );
        }
    }

    #[test]
    fn test_pad_hash_deepest_level() {
        let top = usize::BITS - 1;
        assert_eq!(
            pad_hash(top),
            hash_pair(&pad_hash(top - 1), &pad_hash(top - 1))
        );
    }

    #[test]
    #[should_panic(expected = "layers deep")]
    fn test_pad_hash_past_max_depth_panics() {
        pad_hash(usize::BITS);
    }

    #[test]
    fn test_merkle_pad() {
        assert_eq!(merkle_pad(4, 4), zero_hash());
        assert_eq!(merkle_pad(8, 2), pad_hash(2));
        assert_eq!(merkle_pad(16, 1), pad_hash(4));
    }

    #[test]
    fn test_pad_hash_from_many_threads() {
        let expected = pad_hash(10);
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| pad_hash(10)))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }
}
