#![deny(unsafe_code)]

//! promptsmith core: prompt assembly for tag-based image generation.
//!
//! Combines user fragments, a weight-bracket tag grammar, and a remotely hosted
//! corpus of real prompts filtered by tag co-occurrence into one final prompt.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future. The return type for trait
/// methods that must stay object-safe (`dyn RangeSource`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Weight-bracket codec for tag lists.
pub mod codec;
/// Tag index, category, and wildcard data loading.
pub mod data;
/// Dynamic-choice and wildcard expansion.
pub mod expand;
/// End-to-end prompt assembly.
pub mod pipeline;
/// Tag-indexed corpus search.
pub mod search;
/// Byte-range transports (HTTP and local file).
pub mod source;

pub use codec::{Token, TokenSequence, TrailingText};
pub use data::{DataError, TagCategories};
pub use expand::WildcardStore;
pub use pipeline::{GeneratedPrompt, Pipeline, PipelineError, PromptRequest};
pub use search::{CorpusReader, Query, QueryResolver, SearchError, TagIndex};
pub use source::{FetchError, RangeSource};
