use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use librqbit_merkle_tree::{
    Id32, MERKLE_BLOCK_SIZE, MerkleTree, compute_merkle_root, hash_block, root_from_piece_layer,
    verify_piece, verify_single_piece_file,
};
use serde::Serialize;
use size_format::SizeFormatterBinary as SF;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Parser)]
#[command(version, author, about)]
struct Opts {
    /// The loglevel
    #[arg(value_enum, short = 'v')]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    subcommand: SubCommand,
}

#[derive(Parser)]
struct HashOpts {
    /// The file to hash.
    file: PathBuf,

    /// Piece length of the torrent, a power of two, at least 16KiB.
    #[arg(
        short = 'p',
        long,
        env = "RQBIT_MERKLE_PIECE_LENGTH",
        default_value_t = 65536
    )]
    piece_length: u32,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct VerifyOpts {
    /// The file to verify.
    file: PathBuf,

    /// The trusted pieces root of the file, hex-encoded.
    #[arg(short = 'r', long)]
    root: Id32,

    /// Piece length of the torrent, a power of two, at least 16KiB.
    #[arg(
        short = 'p',
        long,
        env = "RQBIT_MERKLE_PIECE_LENGTH",
        default_value_t = 65536
    )]
    piece_length: u32,

    /// The piece layer of the file, comma-separated hex hashes. If given, each
    /// piece is checked on its own so that the bad ones can be reported.
    #[arg(long = "piece-layer", value_delimiter = ',')]
    piece_layer: Vec<Id32>,
}

#[derive(Parser)]
enum SubCommand {
    /// Compute the pieces root and the piece layer of a file.
    Hash(HashOpts),
    /// Check a file against a trusted pieces root.
    Verify(VerifyOpts),
}

#[derive(Serialize)]
struct HashOutput {
    file_length: u64,
    piece_length: u32,
    root: String,
    piece_layer: Vec<String>,
}

fn init_logging(opts: &Opts) {
    let default_rust_log = match opts.log_level.as_ref() {
        Some(level) => match level {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        },
        None => "info",
    };
    let stderr_filter = match std::env::var("RUST_LOG").ok() {
        Some(rust_log) => EnvFilter::builder()
            .parse(&rust_log)
            .expect("can't parse RUST_LOG"),
        None => EnvFilter::builder()
            .parse(default_rust_log)
            .expect("can't parse default_rust_log"),
    };

    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(stderr_filter)
        .init();
}

fn blocks_per_piece(piece_length: u32) -> anyhow::Result<u32> {
    if piece_length < MERKLE_BLOCK_SIZE || !piece_length.is_power_of_two() {
        bail!(
            "piece length {piece_length} must be a power of two and at least {MERKLE_BLOCK_SIZE}"
        );
    }
    Ok(piece_length / MERKLE_BLOCK_SIZE)
}

/// Fill `buf` as far as possible. Returns how many bytes were read, which is
/// only less than `buf.len()` at the end of the file.
fn read_block(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Hash a file in 16 KiB blocks. Returns the file length and the block hashes.
fn hash_file_blocks(path: &Path) -> anyhow::Result<(u64, Vec<Id32>)> {
    let mut file = File::open(path).with_context(|| format!("error opening {path:?}"))?;
    let mut buf = vec![0u8; MERKLE_BLOCK_SIZE as usize];
    let mut blocks = Vec::new();
    let mut length = 0u64;
    loop {
        let n = read_block(&mut file, &mut buf)
            .with_context(|| format!("error reading {path:?} at offset {length}"))?;
        if n == 0 {
            break;
        }
        blocks.push(hash_block(&buf[..n]));
        length += n as u64;
    }
    if blocks.is_empty() {
        bail!("{path:?} is empty, empty files don't have a merkle tree");
    }
    debug!(?path, length, blocks = blocks.len(), "hashed file");
    Ok((length, blocks))
}

fn hash(opts: &HashOpts) -> anyhow::Result<HashOutput> {
    let bpp = blocks_per_piece(opts.piece_length)?;
    let (file_length, blocks) = hash_file_blocks(&opts.file)?;
    let result = compute_merkle_root(&blocks, bpp)?;

    // The piece layer alone must lead to the same root.
    let root = root_from_piece_layer(&result.piece_hashes, file_length, opts.piece_length)?;
    if root != result.root {
        bail!(
            "bug: root from piece layer {:?} differs from the root from blocks {:?}",
            root,
            result.root
        );
    }

    Ok(HashOutput {
        file_length,
        piece_length: opts.piece_length,
        root: result.root.as_string(),
        piece_layer: result.piece_hashes.iter().map(|h| h.as_string()).collect(),
    })
}

/// Returns the indices of the pieces that failed to verify.
fn verify(opts: &VerifyOpts) -> anyhow::Result<Vec<usize>> {
    let bpp = blocks_per_piece(opts.piece_length)?;
    let (file_length, blocks) = hash_file_blocks(&opts.file)?;

    if !opts.piece_layer.is_empty() {
        let root = root_from_piece_layer(&opts.piece_layer, file_length, opts.piece_length)
            .context("invalid piece layer")?;
        if root != opts.root {
            bail!("piece layer doesn't match the root: expected {:?}, got {root:?}", opts.root);
        }
        if let [expected] = opts.piece_layer.as_slice() {
            if verify_single_piece_file(&blocks, expected) {
                return Ok(Vec::new());
            }
            warn!(piece = 0, "piece hash mismatch");
            return Ok(vec![0]);
        }
        let bad = blocks
            .chunks(bpp as usize)
            .zip(opts.piece_layer.iter())
            .enumerate()
            .filter(|(_, (piece_blocks, expected))| !verify_piece(piece_blocks, expected, bpp))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        for idx in &bad {
            warn!(piece = idx, "piece hash mismatch");
        }
        return Ok(bad);
    }

    let computed = compute_merkle_root(&blocks, bpp)?;
    let mut tree = MerkleTree::new(blocks.len(), opts.root)?;
    if !tree.load_tree(computed.tree.nodes()) {
        warn!(expected = ?opts.root, got = ?computed.root, "root mismatch");
        return Ok((0..computed.piece_hashes.len()).collect());
    }
    Ok(Vec::new())
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    init_logging(&opts);

    match &opts.subcommand {
        SubCommand::Hash(hash_opts) => {
            let out = hash(hash_opts)?;
            info!(
                file = ?hash_opts.file,
                size = %SF::new(out.file_length),
                pieces = out.piece_layer.len(),
                "computed merkle tree"
            );
            if hash_opts.json {
                serde_json::to_writer_pretty(std::io::stdout(), &out)?;
                println!();
            } else {
                println!("root: {}", out.root);
                for (idx, piece) in out.piece_layer.iter().enumerate() {
                    println!("piece {idx}: {piece}");
                }
            }
        }
        SubCommand::Verify(verify_opts) => {
            let bad = verify(verify_opts)?;
            if !bad.is_empty() {
                bail!("{:?}: {} bad piece(s): {:?}", verify_opts.file, bad.len(), bad);
            }
            info!(file = ?verify_opts.file, "file matches the merkle root");
        }
    }
    Ok(())
}
