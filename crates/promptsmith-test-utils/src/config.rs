//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use promptsmith_config::AppConfig;

use crate::corpus::FixturePaths;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .fixture(&paths)
///     .reorder(false)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Point the sources and tag index at files written by a corpus fixture.
    pub fn fixture(mut self, paths: &FixturePaths) -> Self {
        self.config.source.positions_url = paths.positions.display().to_string();
        self.config.source.corpus_url = paths.corpus.display().to_string();
        self.config.data.tag_index_path = paths.index.display().to_string();
        self
    }

    pub fn categories_path(mut self, path: &str) -> Self {
        self.config.data.categories_path = Some(path.to_string());
        self
    }

    pub fn wildcard_dir(mut self, dir: &str) -> Self {
        self.config.data.wildcard_dir = Some(dir.to_string());
        self
    }

    pub fn prompt_window_bytes(mut self, bytes: u64) -> Self {
        self.config.source.prompt_window_bytes = bytes;
        self
    }

    pub fn search_disabled(mut self, disabled: bool) -> Self {
        self.config.pipeline.search_disabled = disabled;
        self
    }

    pub fn reorder(mut self, reorder: bool) -> Self {
        self.config.pipeline.reorder = reorder;
        self
    }

    pub fn remove_artist(mut self, remove: bool) -> Self {
        self.config.pipeline.remove_artist = remove;
        self
    }

    pub fn nai_standard(mut self, enabled: bool) -> Self {
        self.config.pipeline.nai_standard = enabled;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
