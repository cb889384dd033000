#![deny(unsafe_code)]

//! Shared test utilities for the promptsmith workspace.
//!
//! Provides an in-memory range source, a prompt-corpus fixture builder,
//! config builders, and tracing helpers so that individual crate tests stay
//! concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! promptsmith-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod corpus;
pub mod source;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use corpus::{CorpusFixture, FixturePaths};
pub use source::MemorySource;
pub use tracing_setup::init_test_tracing;
