#![deny(unsafe_code)]

//! Configuration loading and validation for promptsmith.
//!
//! Loads TOML configuration files and validates them against expected schemas.
//! Provides the [`AppConfig`] type as the central configuration structure.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote position table and corpus locations.
    #[serde(default)]
    pub source: SourceConfig,

    /// Local data files (tag index, category lists, wildcards).
    #[serde(default)]
    pub data: DataConfig,

    /// Prompt pipeline switches.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the position table and the prompt corpus are read from.
///
/// A location starting with `http://` or `https://` is fetched with HTTP
/// range requests; anything else is treated as a local file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Flat table of big-endian `u32` corpus offsets.
    #[serde(default = "default_positions_url")]
    pub positions_url: String,

    /// Newline-delimited prompt corpus.
    #[serde(default = "default_corpus_url")]
    pub corpus_url: String,

    /// Timeout applied to every remote read, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of bytes read from the corpus when fetching one prompt.
    #[serde(default = "default_prompt_window_bytes")]
    pub prompt_window_bytes: u64,
}

impl SourceConfig {
    /// The read timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            positions_url: default_positions_url(),
            corpus_url: default_corpus_url(),
            timeout_secs: default_timeout_secs(),
            prompt_window_bytes: default_prompt_window_bytes(),
        }
    }
}

fn default_positions_url() -> String {
    "https://huggingface.co/Jio7/NAI-Prompt-Randomizer/resolve/main/pos.dat".to_string()
}

fn default_corpus_url() -> String {
    "https://huggingface.co/Jio7/NAI-Prompt-Randomizer/resolve/main/tags.dat".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_prompt_window_bytes() -> u64 {
    10_001
}

/// Paths to the static data files loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON object mapping each tag to its `{start, end}` slot range.
    #[serde(default = "default_tag_index_path")]
    pub tag_index_path: String,

    /// JSON object of named tag lists. Missing file means no categories.
    #[serde(default)]
    pub categories_path: Option<String>,

    /// Directory of `NAME.txt` wildcard lists, addressed as `__NAME__`.
    #[serde(default)]
    pub wildcard_dir: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            tag_index_path: default_tag_index_path(),
            categories_path: None,
            wildcard_dir: None,
        }
    }
}

fn default_tag_index_path() -> String {
    "data/tag_index.json".to_string()
}

/// Switches controlling prompt assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Skip the corpus search entirely.
    #[serde(default)]
    pub search_disabled: bool,

    /// Restrict the search to general-rated prompts.
    #[serde(default)]
    pub remove_nsfw: bool,

    #[serde(default)]
    pub remove_artist: bool,

    #[serde(default)]
    pub remove_character: bool,

    #[serde(default)]
    pub remove_characteristic: bool,

    #[serde(default)]
    pub remove_attire: bool,

    #[serde(default)]
    pub remove_copyright: bool,

    #[serde(default)]
    pub remove_ornament: bool,

    #[serde(default)]
    pub remove_emotion: bool,

    /// Reorder the final prompt into category order.
    #[serde(default = "default_true")]
    pub reorder: bool,

    /// Rewrite tags into the image service's standard vocabulary.
    #[serde(default)]
    pub nai_standard: bool,

    /// Drop text after the last comma when parsing, like older releases did.
    #[serde(default)]
    pub legacy_trailing_drop: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_disabled: false,
            remove_nsfw: false,
            remove_artist: false,
            remove_character: false,
            remove_characteristic: false,
            remove_attire: false,
            remove_copyright: false,
            remove_ornament: false,
            remove_emotion: false,
            reorder: true,
            nai_standard: false,
            legacy_trailing_drop: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Loading configuration");
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.positions_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source.positions_url must not be empty".to_string(),
            ));
        }
        if self.source.corpus_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source.corpus_url must not be empty".to_string(),
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "source.timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.source.prompt_window_bytes == 0 {
            return Err(ConfigError::Validation(
                "source.prompt_window_bytes must be non-zero".to_string(),
            ));
        }
        if self.data.tag_index_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "data.tag_index_path must not be empty".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
