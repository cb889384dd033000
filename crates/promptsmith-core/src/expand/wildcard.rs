//! Wildcard expansion: `__name__` becomes a random line of the list stored
//! under that exact key.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use rand::Rng;
use rand::seq::IndexedRandom;
use regex::Regex;
use tracing::{debug, warn};

use crate::data::{DataError, read_file};

static WILDCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__.*?__").expect("wildcard pattern is valid"));

/// Named candidate lists, keyed by the full placeholder (`__name__`).
#[derive(Debug, Clone, Default)]
pub struct WildcardStore {
    lists: HashMap<String, Vec<String>>,
}

impl WildcardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the non-blank lines of `text` under `key`.
    pub fn insert(&mut self, key: impl Into<String>, text: &str) {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        self.lists.insert(key.into(), lines);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.lists.get(key).map(Vec::as_slice)
    }

    /// A uniformly random entry of the list under `key`.
    pub fn choose<R: Rng + ?Sized>(&self, key: &str, rng: &mut R) -> Option<&str> {
        self.lists
            .get(key)?
            .choose(rng)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Load every `NAME.txt` in `dir` as the list `__NAME__`.
    ///
    /// A missing directory yields an empty store.
    pub async fn load_dir(dir: &Path) -> Result<Self, DataError> {
        let io_err = |source: std::io::Error| DataError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut store = Self::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Wildcard directory not found");
                return Ok(store);
            }
            Err(e) => return Err(io_err(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = read_file(&path).await?;
            store.insert(format!("__{name}__"), &text);
        }

        debug!(dir = %dir.display(), lists = store.len(), "Loaded wildcards");
        Ok(store)
    }
}

/// Replace each `__name__` placeholder found in `text` with a random line
/// from its list.
///
/// Placeholders are located once in the input text and replaced from the
/// last to the first, so replacement lengths never shift the positions of
/// placeholders still to be processed and inserted lines are not rescanned.
/// Unknown or blank-only lists leave the placeholder in place.
pub fn expand_wildcards<R: Rng + ?Sized>(text: &str, store: &WildcardStore, rng: &mut R) -> String {
    let matches: Vec<_> = WILDCARD.find_iter(text).collect();
    let mut out = text.to_string();

    for m in matches.iter().rev() {
        match store.choose(m.as_str(), rng) {
            Some(line) => out.replace_range(m.range(), line),
            None if store.get(m.as_str()).is_some() => {
                warn!(wildcard = m.as_str(), "Wildcard list has no entries");
            }
            None => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::TempDir;

    fn store() -> WildcardStore {
        let mut store = WildcardStore::new();
        store.insert("__color__", "red\n\n  \nblue\r\n");
        store.insert("__long__", "a very long replacement line");
        store.insert("__empty__", "\n \n");
        store
    }

    #[test]
    fn test_insert_filters_blank_lines() {
        assert_eq!(store().get("__color__").unwrap(), ["red", "blue"]);
    }

    #[test]
    fn test_single_wildcard() {
        for seed in 0..16 {
            let out = expand_wildcards("__color__ hair", &store(), &mut StdRng::seed_from_u64(seed));
            assert!(out == "red hair" || out == "blue hair");
        }
    }

    #[test]
    fn test_several_wildcards_with_length_drift() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = expand_wildcards("__long__, __color__, __long__", &store(), &mut rng);
        let parts: Vec<&str> = out.split(", ").collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "a very long replacement line");
        assert!(parts[1] == "red" || parts[1] == "blue");
        assert_eq!(parts[2], "a very long replacement line");
    }

    #[test]
    fn test_unknown_and_empty_lists_left_alone() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            expand_wildcards("__missing__, __empty__", &store(), &mut rng),
            "__missing__, __empty__"
        );
    }

    #[test]
    fn test_inserted_text_is_not_rescanned() {
        let mut store = WildcardStore::new();
        store.insert("__loop__", "__loop__ again");
        let out = expand_wildcards("__loop__", &store, &mut StdRng::seed_from_u64(0));
        assert_eq!(out, "__loop__ again");
    }

    #[tokio::test]
    async fn test_load_dir() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("FAVORITE.txt"), "1girl\nsolo\n")
            .await
            .unwrap();
        tokio::fs::write(tmp.path().join("notes.md"), "ignored")
            .await
            .unwrap();

        let store = WildcardStore::load_dir(tmp.path()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("__FAVORITE__").unwrap(), ["1girl", "solo"]);
    }

    #[tokio::test]
    async fn test_load_missing_dir() {
        let store = WildcardStore::load_dir(Path::new("/nonexistent/wildcards"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }
}
