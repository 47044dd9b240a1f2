//! Per-worker frontier files.
//!
//! Every worker owns a pair of files in the spill directory: `frontier-N.in`
//! is read during the current iteration and `frontier-N.out` collects the
//! entries deferred for the next one. [`FrontierFiles::rotate`] promotes
//! outputs to inputs between iterations.

use super::frontier_codec::{BlockHeader, BLOCK_HEADER_LEN};
use super::StorageError;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Spill directory layout for a fixed worker count
#[derive(Debug, Clone)]
pub struct FrontierFiles {
    directory: PathBuf,
    workers: usize,
}

impl FrontierFiles {
    /// Create the directory and clear files left by an earlier run
    pub fn create(directory: impl Into<PathBuf>, workers: usize) -> Result<Self, StorageError> {
        let files = Self {
            directory: directory.into(),
            workers,
        };
        fs::create_dir_all(&files.directory)?;
        files.clear()?;
        Ok(files)
    }

    /// Number of file pairs
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// File read by `worker` in the current iteration
    pub fn input_path(&self, worker: usize) -> PathBuf {
        self.directory.join(format!("frontier-{worker}.in"))
    }

    /// File written for `worker` during the current iteration
    pub fn output_path(&self, worker: usize) -> PathBuf {
        self.directory.join(format!("frontier-{worker}.out"))
    }

    /// Open the input file of `worker`; `None` if it has nothing queued
    pub fn open_input(&self, worker: usize) -> Result<Option<BlockReader<BufReader<File>>>, StorageError> {
        match File::open(self.input_path(worker)) {
            Ok(file) => Ok(Some(BlockReader::new(BufReader::new(file)))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Truncate and open every output file
    pub fn create_outputs(&self) -> Result<Vec<BlockWriter<BufWriter<File>>>, StorageError> {
        (0..self.workers)
            .map(|worker| {
                let file = File::create(self.output_path(worker))?;
                Ok(BlockWriter::new(BufWriter::new(file)))
            })
            .collect()
    }

    /// Promote outputs to inputs for the next iteration
    pub fn rotate(&self) -> Result<(), StorageError> {
        for worker in 0..self.workers {
            let output = self.output_path(worker);
            let input = self.input_path(worker);
            if output.exists() {
                fs::rename(&output, &input)?;
                trace!(worker, path = %input.display(), "Rotated frontier file");
            } else {
                remove_if_present(&input)?;
            }
        }
        Ok(())
    }

    /// Remove every frontier file
    pub fn clear(&self) -> Result<(), StorageError> {
        for worker in 0..self.workers {
            remove_if_present(&self.input_path(worker))?;
            remove_if_present(&self.output_path(worker))?;
        }
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Appends encoded blocks to a stream
pub struct BlockWriter<W: Write> {
    writer: W,
    blocks: u64,
    entries: u64,
}

impl<W: Write> BlockWriter<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            blocks: 0,
            entries: 0,
        }
    }

    /// Write one framed block from `encode_block`
    pub fn write_block(&mut self, block: &[u8]) -> Result<(), StorageError> {
        if block.len() < BLOCK_HEADER_LEN {
            return Err(StorageError::CorruptBlock { detail: "block shorter than header" });
        }
        let mut head = [0u8; BLOCK_HEADER_LEN];
        head.copy_from_slice(&block[..BLOCK_HEADER_LEN]);
        let header = BlockHeader::decode(&head)?;

        self.writer.write_all(block)?;
        self.blocks += 1;
        self.entries += u64::from(header.entry_count);
        Ok(())
    }

    /// Blocks written so far
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Entries written so far
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Flush and return the inner writer with the entry count
    pub fn finish(mut self) -> Result<(W, u64), StorageError> {
        self.writer.flush()?;
        Ok((self.writer, self.entries))
    }
}

/// Reads framed blocks back from a stream
pub struct BlockReader<R: Read> {
    reader: R,
}

impl<R: Read> BlockReader<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Next block header and body; `None` at a clean end of stream
    ///
    /// A stream ending inside a header or body is reported as corrupt.
    pub fn next_block(&mut self) -> Result<Option<(BlockHeader, Vec<u8>)>, StorageError> {
        let mut head = [0u8; BLOCK_HEADER_LEN];
        let mut filled = 0;
        while filled < BLOCK_HEADER_LEN {
            match self.reader.read(&mut head[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(StorageError::CorruptBlock { detail: "truncated block header" }),
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        let header = BlockHeader::decode(&head)?;

        let mut body = vec![0u8; header.body_len as usize];
        self.reader.read_exact(&mut body).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                StorageError::CorruptBlock { detail: "truncated block body" }
            } else {
                StorageError::Io(err)
            }
        })?;
        Ok(Some((header, body)))
    }
}
