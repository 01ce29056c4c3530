//! Binary checkpoint format for decided memo entries.
//!
//! Format:
//! - Header (32 bytes):
//!   - Magic: "STN1" (4 bytes)
//!   - Version: u32 LE (4 bytes)
//!   - Entry count: u64 LE (8 bytes)
//!   - Checksum: u64 LE xxhash of data section (8 bytes)
//!   - Reserved: 8 bytes (zeros)
//! - Data section (entry_count × 17 bytes):
//!   - Position key: u128 LE (16 bytes)
//!   - Label: i8 (1 byte, 1 = Player One wins, -1 = Player Two wins)
//!
//! Entries are sorted by key. Only proven labels are written: undecided
//! entries depend on the session's budgets and best-first estimates are
//! guesses.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use santorini_core::{Position, PositionKey};
use xxhash_rust::xxh64::xxh64;

use crate::error::CheckpointError;
use crate::solver::{Label, NodeState};

const MAGIC: &[u8; 4] = b"STN1";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 32;
const ENTRY_SIZE: usize = 17;

/// Decoded checkpoint contents.
pub struct Checkpoint {
    pub entries: Vec<(PositionKey, Label)>,
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn read_u128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&bytes[..16]);
    u128::from_le_bytes(buf)
}

impl Checkpoint {
    /// Save the proven, decided entries of a memo table.
    pub fn save(
        path: &Path,
        memo: &HashMap<PositionKey, NodeState>,
    ) -> Result<usize, CheckpointError> {
        let mut entries: Vec<(u128, i8)> = memo
            .iter()
            .filter_map(|(key, state)| match state {
                NodeState::Resolved(label) if label.is_decided() => Some((key.0, label.as_i8())),
                _ => None,
            })
            .collect();
        entries.sort_unstable_by_key(|&(key, _)| key);

        let count = entries.len();

        let mut data = Vec::with_capacity(count * ENTRY_SIZE);
        for (key, label) in &entries {
            data.extend_from_slice(&key.to_le_bytes());
            data.push(*label as u8);
        }

        let checksum = xxh64(&data, 0);

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(count as u64).to_le_bytes())?;
        writer.write_all(&checksum.to_le_bytes())?;
        writer.write_all(&[0u8; 8])?; // Reserved

        writer.write_all(&data)?;
        writer.flush()?;

        Ok(count)
    }

    /// Load and validate a checkpoint file.
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&header[0..4]);
            return Err(CheckpointError::BadMagic { found });
        }

        let version = read_u32(&header[4..8]);
        if version != VERSION {
            return Err(CheckpointError::UnsupportedVersion(version));
        }

        let count = read_u64(&header[8..16]) as usize;
        let stored = read_u64(&header[16..24]);

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let computed = xxh64(&data, 0);
        if count.checked_mul(ENTRY_SIZE) != Some(data.len()) || computed != stored {
            return Err(CheckpointError::ChecksumMismatch { stored, computed });
        }

        let mut entries = Vec::with_capacity(count);
        for chunk in data.chunks_exact(ENTRY_SIZE) {
            let key = read_u128(&chunk[..16]);
            let raw = chunk[16] as i8;
            let label = Label::from_i8(raw)
                .filter(|label| label.is_decided())
                .ok_or(CheckpointError::InvalidLabel { key, label: raw })?;
            Position::from_key(PositionKey(key))
                .map_err(|source| CheckpointError::InvalidKey { key, source })?;
            entries.push((PositionKey(key), label));
        }

        Ok(Checkpoint { entries })
    }

    /// Get file size estimate for a given number of entries.
    pub fn estimate_size(count: usize) -> usize {
        HEADER_SIZE + count * ENTRY_SIZE
    }
}
