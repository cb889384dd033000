//! Static data files loaded once at startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from loading the tag index, category lists, or wildcard files.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid tag index entry {tag:?}: end {end} is before start {start}")]
    InvalidRange { tag: String, start: u32, end: u32 },
}

/// Read a whole file, attaching the path to any error.
pub(crate) async fn read_file(path: &Path) -> Result<String, DataError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// Named tag lists used for filtering and ordering prompts.
///
/// List order matters: [`TokenSequence::extract`](crate::codec::TokenSequence::extract)
/// gathers matches in list order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagCategories {
    pub count: Vec<String>,
    pub character: Vec<String>,
    pub copyright: Vec<String>,
    pub artist: Vec<String>,
    pub quality: Vec<String>,
    pub censor: Vec<String>,
    pub bad: Vec<String>,
    /// When non-empty, searched prompts keep only these tags.
    pub whitelist: Vec<String>,
    pub characteristic: Vec<String>,
    pub clothes: Vec<String>,
    pub ornament: Vec<String>,
    pub emotions: Vec<String>,
}

impl TagCategories {
    /// Parse category lists from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load category lists from a JSON file.
    pub async fn load(path: &Path) -> Result<Self, DataError> {
        let categories = Self::from_json(&read_file(path).await?)?;
        debug!(
            path = %path.display(),
            artists = categories.artist.len(),
            characters = categories.character.len(),
            "Loaded tag categories"
        );
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_categories() {
        let categories =
            TagCategories::from_json(r#"{"artist": ["b", "a"], "quality": ["masterpiece"]}"#)
                .unwrap();
        assert_eq!(categories.artist, vec!["b", "a"]);
        assert_eq!(categories.quality, vec!["masterpiece"]);
        assert!(categories.whitelist.is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            TagCategories::from_json("[1, 2"),
            Err(DataError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("categories.json");
        tokio::fs::write(&path, r#"{"count": ["1girl"]}"#)
            .await
            .unwrap();

        let categories = TagCategories::load(&path).await.unwrap();
        assert_eq!(categories.count, vec!["1girl"]);
    }

    #[tokio::test]
    async fn test_load_missing_file_names_path() {
        let err = TagCategories::load(Path::new("/nonexistent/categories.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/categories.json"));
    }
}
