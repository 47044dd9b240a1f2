//! Frontier block codec.
//!
//! A block is a length-delimited group of frontier entries. All integers are
//! big-endian.
//!
//! ```text
//! header (12 bytes)
//!   u32 magic        "KCFB"
//!   u32 entry_count
//!   u32 body_len     bytes following the header
//! body, per entry
//!   u64 fingerprint
//!   u8  flags        bit 0 = magic bit, bit 1 = seed present
//!   u32 depth, u32 delay, u32 choice_cost
//!   u64 ordinal
//!   u32 owner_worker
//!   u64 seed         only when flag bit 1 is set
//!   u32 position_len
//!   ..  position     encoded by the model's PositionCodec
//! ```

use super::StorageError;
use crate::domain::frontier::FrontierEntry;
use crate::domain::model::PositionCodec;
use crate::domain::state::{Bounds, Fingerprint};

/// Block magic, ASCII "KCFB"
pub const BLOCK_MAGIC: u32 = 0x4B43_4642;

/// Encoded header size
pub const BLOCK_HEADER_LEN: usize = 12;

/// Upper bound on a block body, guarding against corrupt length fields
pub const MAX_BLOCK_BODY: u32 = 1 << 30;

const FLAG_MAGIC: u8 = 0b01;
const FLAG_SEED: u8 = 0b10;

/// Decoded block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Entries in the body
    pub entry_count: u32,
    /// Body length in bytes
    pub body_len: u32,
}

impl BlockHeader {
    /// Encode to the fixed 12-byte layout
    pub fn encode(&self) -> [u8; BLOCK_HEADER_LEN] {
        let mut out = [0u8; BLOCK_HEADER_LEN];
        out[0..4].copy_from_slice(&BLOCK_MAGIC.to_be_bytes());
        out[4..8].copy_from_slice(&self.entry_count.to_be_bytes());
        out[8..12].copy_from_slice(&self.body_len.to_be_bytes());
        out
    }

    /// Decode and validate a header
    pub fn decode(bytes: &[u8; BLOCK_HEADER_LEN]) -> Result<Self, StorageError> {
        let word = |at: usize| u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        if word(0) != BLOCK_MAGIC {
            return Err(StorageError::CorruptBlock { detail: "bad block magic" });
        }
        let header = Self {
            entry_count: word(4),
            body_len: word(8),
        };
        if header.body_len > MAX_BLOCK_BODY {
            return Err(StorageError::CorruptBlock { detail: "block body too large" });
        }
        Ok(header)
    }
}

/// Encode `entries` as one framed block (header followed by body)
pub fn encode_block<P, C>(entries: &[FrontierEntry<P>], codec: &C) -> Result<Vec<u8>, StorageError>
where
    C: PositionCodec<P> + ?Sized,
{
    let entry_count = u32::try_from(entries.len())
        .map_err(|_| StorageError::Codec("too many entries for one block".to_string()))?;

    let mut out = vec![0u8; BLOCK_HEADER_LEN];
    let mut position = Vec::new();
    for entry in entries {
        let mut flags = 0;
        if entry.magic_bit {
            flags |= FLAG_MAGIC;
        }
        if entry.seed.is_some() {
            flags |= FLAG_SEED;
        }
        let owner = u32::try_from(entry.owner_worker)
            .map_err(|_| StorageError::Codec("owner worker out of range".to_string()))?;

        out.extend_from_slice(&entry.fingerprint.as_u64().to_be_bytes());
        out.push(flags);
        out.extend_from_slice(&entry.bounds.depth.to_be_bytes());
        out.extend_from_slice(&entry.bounds.delay.to_be_bytes());
        out.extend_from_slice(&entry.bounds.choice_cost.to_be_bytes());
        out.extend_from_slice(&entry.ordinal.to_be_bytes());
        out.extend_from_slice(&owner.to_be_bytes());
        if let Some(seed) = entry.seed {
            out.extend_from_slice(&seed.as_u64().to_be_bytes());
        }

        position.clear();
        codec.encode(&entry.position, &mut position);
        let len = u32::try_from(position.len())
            .map_err(|_| StorageError::Codec("encoded position too large".to_string()))?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&position);
    }

    let body_len = u32::try_from(out.len() - BLOCK_HEADER_LEN)
        .ok()
        .filter(|len| *len <= MAX_BLOCK_BODY)
        .ok_or_else(|| StorageError::Codec("block body too large".to_string()))?;
    let header = BlockHeader { entry_count, body_len };
    out[..BLOCK_HEADER_LEN].copy_from_slice(&header.encode());
    Ok(out)
}

/// Decode a block body announced by `header`
pub fn decode_block<P, C>(header: BlockHeader, body: &[u8], codec: &C) -> Result<Vec<FrontierEntry<P>>, StorageError>
where
    C: PositionCodec<P> + ?Sized,
{
    if body.len() != header.body_len as usize {
        return Err(StorageError::CorruptBlock { detail: "body length mismatch" });
    }
    let mut cursor = ByteCursor::new(body);
    let mut entries = Vec::with_capacity(header.entry_count as usize);
    for _ in 0..header.entry_count {
        let fingerprint = Fingerprint::new(cursor.u64()?);
        let flags = cursor.u8()?;
        if flags & !(FLAG_MAGIC | FLAG_SEED) != 0 {
            return Err(StorageError::CorruptBlock { detail: "unknown entry flags" });
        }
        let bounds = Bounds::new(cursor.u32()?, cursor.u32()?, cursor.u32()?);
        let ordinal = cursor.u64()?;
        let owner_worker = cursor.u32()? as usize;
        let seed = if flags & FLAG_SEED != 0 {
            Some(Fingerprint::new(cursor.u64()?))
        } else {
            None
        };
        let len = cursor.u32()? as usize;
        let position = codec.decode(cursor.take(len)?).map_err(StorageError::Codec)?;

        entries.push(FrontierEntry {
            fingerprint,
            magic_bit: flags & FLAG_MAGIC != 0,
            bounds,
            position,
            ordinal,
            owner_worker,
            seed,
        });
    }
    if !cursor.is_empty() {
        return Err(StorageError::CorruptBlock { detail: "trailing bytes after last entry" });
    }
    Ok(entries)
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StorageError> {
        let end = self
            .at
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(StorageError::CorruptBlock { detail: "entry runs past block end" })?;
        let slice = &self.bytes[self.at..end];
        self.at = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, StorageError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, StorageError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, StorageError> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }

    fn is_empty(&self) -> bool {
        self.at == self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Positions are plain u64 values encoded big-endian.
    struct U64Codec;

    impl PositionCodec<u64> for U64Codec {
        fn encode(&self, position: &u64, out: &mut Vec<u8>) {
            out.extend_from_slice(&position.to_be_bytes());
        }

        fn decode(&self, bytes: &[u8]) -> Result<u64, String> {
            let raw: [u8; 8] = bytes.try_into().map_err(|_| format!("expected 8 bytes, got {}", bytes.len()))?;
            Ok(u64::from_be_bytes(raw))
        }
    }

    fn entry(raw: u64, seed: Option<u64>) -> FrontierEntry<u64> {
        FrontierEntry {
            fingerprint: Fingerprint::new(raw),
            magic_bit: seed.is_some(),
            bounds: Bounds::new(3, 1, 2),
            position: raw * 10,
            ordinal: raw + 100,
            owner_worker: 5,
            seed: seed.map(Fingerprint::new),
        }
    }

    fn split(block: &[u8]) -> (BlockHeader, &[u8]) {
        let mut head = [0u8; BLOCK_HEADER_LEN];
        head.copy_from_slice(&block[..BLOCK_HEADER_LEN]);
        (BlockHeader::decode(&head).unwrap(), &block[BLOCK_HEADER_LEN..])
    }

    #[test]
    fn test_block_preserves_seed_and_magic() {
        let block = encode_block(&[entry(1, None), entry(2, Some(9))], &U64Codec).unwrap();
        let (header, body) = split(&block);
        assert_eq!(header.entry_count, 2);

        let decoded = decode_block(header, body, &U64Codec).unwrap();
        assert_eq!(decoded[0].seed, None);
        assert!(!decoded[0].magic_bit);
        assert_eq!(decoded[1].seed, Some(Fingerprint::new(9)));
        assert!(decoded[1].magic_bit);
        assert_eq!(decoded[1].position, 20);
        assert_eq!(decoded[1].bounds, Bounds::new(3, 1, 2));
        assert_eq!(decoded[1].owner_worker, 5);
    }

    #[test]
    fn test_empty_block() {
        let block = encode_block::<u64, _>(&[], &U64Codec).unwrap();
        assert_eq!(block.len(), BLOCK_HEADER_LEN);
        let (header, body) = split(&block);
        assert!(decode_block(header, body, &U64Codec).unwrap().is_empty());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut block = encode_block(&[entry(1, None)], &U64Codec).unwrap();
        block[0] ^= 0xff;
        let mut head = [0u8; BLOCK_HEADER_LEN];
        head.copy_from_slice(&block[..BLOCK_HEADER_LEN]);
        assert!(matches!(
            BlockHeader::decode(&head),
            Err(StorageError::CorruptBlock { detail: "bad block magic" })
        ));
    }

    #[test]
    fn test_truncated_body_rejected() {
        let block = encode_block(&[entry(1, None)], &U64Codec).unwrap();
        let (mut header, body) = split(&block);
        let short = &body[..body.len() - 3];
        header.body_len = short.len() as u32;
        assert!(matches!(
            decode_block(header, short, &U64Codec),
            Err(StorageError::CorruptBlock { .. })
        ));
    }

    #[test]
    fn test_position_decode_failure_surfaces() {
        struct Refuse;
        impl PositionCodec<u64> for Refuse {
            fn encode(&self, position: &u64, out: &mut Vec<u8>) {
                out.extend_from_slice(&position.to_be_bytes());
            }
            fn decode(&self, _bytes: &[u8]) -> Result<u64, String> {
                Err("nope".to_string())
            }
        }
        let block = encode_block(&[entry(1, None)], &Refuse).unwrap();
        let (header, body) = split(&block);
        assert!(matches!(decode_block(header, body, &Refuse), Err(StorageError::Codec(_))));
    }
}
