//! Prompt-corpus fixtures.
//!
//! [`CorpusFixture::build`] lays out a list of prompts exactly like the
//! published data files: a newline-delimited corpus, a position table of
//! big-endian line offsets grouped by tag, and the tag → slot-range index.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use promptsmith_core::search::{TagIndex, TagIndexEntry};

use crate::source::MemorySource;

/// A small corpus with its position table and tag index.
pub struct CorpusFixture {
    pub prompts: Vec<String>,
    /// Byte offset of each prompt's line.
    pub offsets: Vec<u32>,
    pub corpus: Vec<u8>,
    pub positions: Vec<u8>,
    pub entries: Vec<TagIndexEntry>,
}

impl CorpusFixture {
    /// Build the fixture; each prompt's tags are its comma-separated parts.
    pub fn build(prompts: &[&str]) -> Self {
        let mut corpus = Vec::new();
        let mut offsets = Vec::with_capacity(prompts.len());
        let mut by_tag: BTreeMap<String, Vec<u32>> = BTreeMap::new();

        for prompt in prompts {
            let offset = corpus.len() as u32;
            offsets.push(offset);
            corpus.extend_from_slice(prompt.as_bytes());
            corpus.push(b'\n');

            for tag in prompt.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let list = by_tag.entry(tag.to_string()).or_default();
                if !list.contains(&offset) {
                    list.push(offset);
                }
            }
        }

        let mut positions = Vec::new();
        let mut entries = Vec::with_capacity(by_tag.len());
        for (tag, list) in by_tag {
            let start = (positions.len() / 4) as u32;
            for offset in &list {
                positions.extend_from_slice(&offset.to_be_bytes());
            }
            let end = (positions.len() / 4) as u32;
            entries.push(TagIndexEntry { tag, start, end });
        }

        Self {
            prompts: prompts.iter().map(|p| p.to_string()).collect(),
            offsets,
            corpus,
            positions,
            entries,
        }
    }

    pub fn index(&self) -> TagIndex {
        TagIndex::from_entries(self.entries.clone())
    }

    /// Offsets of every prompt containing `tag`, ascending.
    pub fn offsets_with(&self, tag: &str) -> Vec<u32> {
        self.prompts
            .iter()
            .zip(&self.offsets)
            .filter(|(prompt, _)| prompt.split(',').map(str::trim).any(|t| t == tag))
            .map(|(_, offset)| *offset)
            .collect()
    }

    /// In-memory sources for the position table and the corpus.
    pub fn sources(&self) -> (Arc<MemorySource>, Arc<MemorySource>) {
        (
            Arc::new(MemorySource::new(self.positions.clone())),
            Arc::new(MemorySource::new(self.corpus.clone())),
        )
    }

    /// The tag index in its JSON file format.
    pub fn index_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|e| {
                (
                    e.tag.clone(),
                    serde_json::json!({ "start": e.start, "end": e.end }),
                )
            })
            .collect();
        serde_json::Value::Object(map).to_string()
    }

    /// Write `pos.dat`, `tags.dat` and `tag_index.json` into `dir`.
    pub async fn write_to(&self, dir: &Path) -> FixturePaths {
        let paths = FixturePaths {
            positions: dir.join("pos.dat"),
            corpus: dir.join("tags.dat"),
            index: dir.join("tag_index.json"),
        };
        tokio::fs::write(&paths.positions, &self.positions)
            .await
            .expect("failed to write position table");
        tokio::fs::write(&paths.corpus, &self.corpus)
            .await
            .expect("failed to write corpus");
        tokio::fs::write(&paths.index, self.index_json())
            .await
            .expect("failed to write tag index");
        paths
    }
}

/// Files written by [`CorpusFixture::write_to`].
pub struct FixturePaths {
    pub positions: PathBuf,
    pub corpus: PathBuf,
    pub index: PathBuf,
}
