//! Tag index: maps each tag to its slice of the position table.
//!
//! The position table is one flat file of big-endian `u32` values. Every tag
//! owns a contiguous run of slots `[start, end)`; slot `i` lives at byte
//! `4 * i`, and each value is the byte offset of a corpus line containing
//! the tag.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;
use std::time::Duration;

use roaring::RoaringBitmap;
use serde::Deserialize;
use tracing::{debug, info};

use crate::data::{DataError, read_file};
use crate::source::{FetchError, RangeSource, read_with_timeout};

use super::SearchError;

/// Width of one position-table slot in bytes.
pub const SLOT_BYTES: u64 = 4;

/// Corpus offsets of every prompt containing one tag.
pub type PositionSet = RoaringBitmap;

/// The slot range owned by one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagIndexEntry {
    pub tag: String,
    pub start: u32,
    pub end: u32,
}

impl TagIndexEntry {
    /// Number of positions stored for this tag.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Byte range of this entry inside the position table.
    pub fn byte_range(&self) -> Range<u64> {
        u64::from(self.start) * SLOT_BYTES..u64::from(self.end) * SLOT_BYTES
    }
}

#[derive(Deserialize)]
struct RawRange {
    start: u32,
    end: u32,
}

/// Immutable tag → slot range lookup, loaded once at startup.
#[derive(Debug, Default)]
pub struct TagIndex {
    entries: HashMap<String, TagIndexEntry>,
}

impl TagIndex {
    /// Build an index from entries; a later duplicate tag replaces an earlier one.
    pub fn from_entries(entries: impl IntoIterator<Item = TagIndexEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.tag.clone(), e)).collect(),
        }
    }

    /// Parse a JSON object of the form `{"tag": {"start": 0, "end": 12}, ...}`.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let raw: HashMap<String, RawRange> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (tag, range) in raw {
            if range.end < range.start {
                return Err(DataError::InvalidRange {
                    tag,
                    start: range.start,
                    end: range.end,
                });
            }
            let entry = TagIndexEntry {
                tag: tag.clone(),
                start: range.start,
                end: range.end,
            };
            entries.insert(tag, entry);
        }
        Ok(Self { entries })
    }

    /// Load the index from a JSON file.
    pub async fn load(path: &Path) -> Result<Self, DataError> {
        let index = Self::from_json(&read_file(path).await?)?;
        info!(path = %path.display(), tags = index.len(), "Loaded tag index");
        Ok(index)
    }

    pub fn get(&self, tag: &str) -> Option<&TagIndexEntry> {
        self.entries.get(tag)
    }

    /// Look up a tag, failing with [`SearchError::TagNotFound`].
    pub fn lookup(&self, tag: &str) -> Result<&TagIndexEntry, SearchError> {
        self.get(tag)
            .ok_or_else(|| SearchError::TagNotFound(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetch the position set of one tag with a single range read.
pub async fn fetch_positions(
    source: &dyn RangeSource,
    entry: &TagIndexEntry,
    timeout: Duration,
) -> Result<PositionSet, FetchError> {
    if entry.is_empty() {
        return Ok(PositionSet::new());
    }

    let range = entry.byte_range();
    let expected = (range.end - range.start) as usize;
    let bytes = read_with_timeout(source, range, timeout).await?;
    if bytes.len() != expected {
        return Err(FetchError::Malformed(format!(
            "position table returned {} bytes for tag {:?}, expected {expected}",
            bytes.len(),
            entry.tag
        )));
    }

    let positions = decode_positions(&bytes);
    debug!(tag = %entry.tag, count = positions.len(), "Fetched positions");
    Ok(positions)
}

/// Decode consecutive big-endian `u32` values.
pub fn decode_positions(bytes: &[u8]) -> PositionSet {
    bytes
        .chunks_exact(SLOT_BYTES as usize)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let index =
            TagIndex::from_json(r#"{"1girl": {"start": 0, "end": 3}, "rain": {"start": 3, "end": 3}}"#)
                .unwrap();
        assert_eq!(index.len(), 2);
        let entry = index.lookup("1girl").unwrap();
        assert_eq!(entry.len(), 3);
        assert_eq!(entry.byte_range(), 0..12);
        assert!(index.lookup("rain").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_missing_tag() {
        let index = TagIndex::default();
        let err = index.lookup("doesnotexist").unwrap_err();
        assert!(matches!(err, SearchError::TagNotFound(tag) if tag == "doesnotexist"));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = TagIndex::from_json(r#"{"bad": {"start": 5, "end": 2}}"#).unwrap_err();
        assert!(matches!(err, DataError::InvalidRange { .. }));
    }

    #[test]
    fn test_decode_big_endian() {
        let bytes = [0, 0, 0, 7, 0, 0, 1, 0, 0x01, 0, 0, 0];
        let positions = decode_positions(&bytes);
        assert_eq!(
            positions.iter().collect::<Vec<_>>(),
            vec![7, 256, 16_777_216]
        );
    }
}
