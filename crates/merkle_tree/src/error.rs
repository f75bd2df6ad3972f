#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("merkle tree needs at least one block, got {0}")]
    InvalidBlockCount(usize),
    #[error("too many blocks for a merkle tree: {0}")]
    TooManyBlocks(usize),
    #[error("invalid v2 piece length {0}: must be a power of two and at least 16 KiB")]
    InvalidPieceLength(u32),
    #[error("piece layer count mismatch: expected {expected}, got {actual}")]
    PieceLayerCountMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
