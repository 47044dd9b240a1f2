//! Infrastructure Layer
//!
//! On-disk representation of frontiers: the block codec and the
//! worker-indexed file pairs it is written to.

pub mod frontier_codec;
pub mod frontier_file;

pub use frontier_codec::{decode_block, encode_block, BlockHeader, BLOCK_HEADER_LEN, BLOCK_MAGIC};
pub use frontier_file::{BlockReader, BlockWriter, FrontierFiles};

use std::io;

/// Frontier storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying file operation failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A block on disk does not match the expected layout
    #[error("corrupt frontier block: {detail}")]
    CorruptBlock {
        /// Which check failed
        detail: &'static str,
    },

    /// A position could not be encoded or decoded
    #[error("position codec: {0}")]
    Codec(String),
}
