//! Sparse Key Index
//!
//! Reads and writes `records.idx`: a header followed by fixed-size
//! `[key][offset]` entries for the first record and every interval-th
//! record after it.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Result, VtError};

use super::{INDEX_ENTRY_SIZE, INDEX_HEADER_SIZE, INDEX_MAGIC, VERSION};

/// One sparse index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexEntry {
    pub key: u64,
    pub offset: u64,
}

impl IndexEntry {
    pub fn encode(&self) -> [u8; INDEX_ENTRY_SIZE as usize] {
        let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
        buf[0..8].copy_from_slice(&self.key.to_le_bytes());
        buf[8..16].copy_from_slice(&self.offset.to_le_bytes());
        buf
    }
}

/// Parsed contents of an index file
#[derive(Debug)]
pub(crate) struct LoadedIndex {
    pub interval: u32,
    pub entries: Vec<IndexEntry>,
}

/// Write the index header into a fresh file
pub(crate) fn write_header<W: Write>(writer: &mut W, interval: u32) -> Result<()> {
    writer.write_all(INDEX_MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&interval.to_le_bytes())?;
    Ok(())
}

/// Load an index file; `Ok(None)` when the file does not exist
///
/// A trailing partial entry is ignored (the writer truncates it on open).
pub(crate) fn load(path: &Path) -> Result<Option<LoadedIndex>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;

    if data.is_empty() {
        return Ok(None);
    }
    if data.len() < INDEX_HEADER_SIZE as usize {
        return Err(VtError::Corruption(format!(
            "Index header truncated: {} bytes",
            data.len()
        )));
    }
    if &data[0..4] != INDEX_MAGIC {
        return Err(VtError::Corruption(format!(
            "Invalid index magic: expected VTIX, got {:?}",
            &data[0..4]
        )));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != VERSION {
        return Err(VtError::Storage(format!(
            "Unsupported index version: {}",
            version
        )));
    }

    let interval = u32::from_le_bytes([data[6], data[7], data[8], data[9]]);
    if interval == 0 {
        return Err(VtError::Corruption("Index interval is zero".to_string()));
    }

    let entries = data[INDEX_HEADER_SIZE as usize..]
        .chunks_exact(INDEX_ENTRY_SIZE as usize)
        .map(|chunk| {
            let mut key = [0u8; 8];
            let mut offset = [0u8; 8];
            key.copy_from_slice(&chunk[0..8]);
            offset.copy_from_slice(&chunk[8..16]);
            IndexEntry {
                key: u64::from_le_bytes(key),
                offset: u64::from_le_bytes(offset),
            }
        })
        .collect();

    Ok(Some(LoadedIndex { interval, entries }))
}
