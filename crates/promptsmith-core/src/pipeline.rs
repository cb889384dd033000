//! Prompt pipeline: expands, searches, filters, and assembles the final prompt.
//!
//! ```text
//! fragments ─▶ dynamic ─▶ wildcard ─▶ dynamic ─▶ parse
//!                                                  │ search fragment only
//!                                                  ▼
//!                         QueryResolver ─▶ CorpusReader ─▶ filter
//!                                                  │
//!              beginning + random + end ◀──────────┘
//!                        │ dedup / reorder / standardise
//!                        ▼
//!                    serialize
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use promptsmith_config::{AppConfig, PipelineConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::codec::{TokenSequence, TrailingText};
use crate::data::{DataError, TagCategories};
use crate::expand::{WildcardStore, expand_all, expand_dynamic};
use crate::search::query::EXCLUDE_MARKER;
use crate::search::{CorpusReader, ProgressFn, Query, QueryResolver, SearchError, TagIndex};
use crate::source::{FetchError, open_source};

/// Long rating tags and the short forms the corpus index uses.
const RATING_ALIASES: [(&str, &str); 4] = [
    ("rating:general", "rating:g"),
    ("rating:questionable", "rating:q"),
    ("rating:explicit", "rating:e"),
    ("rating:sensitive", "rating:s"),
];

/// Tag that switches on removal of the `censor` category.
const UNCENSORED_TAG: &str = "uncensored";

/// Errors from a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// User-supplied prompt fragments.
#[derive(Debug, Clone, Default)]
pub struct PromptRequest {
    /// Placed before the searched prompt.
    pub beginning: String,
    /// Tags used to pick a random corpus prompt (`~tag` excludes).
    pub search: String,
    /// Placed after the searched prompt.
    pub end: String,
    pub negative: String,
    /// Per-character prompts, processed independently of the search.
    pub characters: Vec<String>,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPrompt {
    pub prompt: String,
    pub negative: String,
    pub characters: Vec<String>,
}

/// Sequences the expanders, the codec, and the corpus search.
///
/// The resolver's query cache lives inside the pipeline, so runs sharing one
/// `Pipeline` reuse each other's last search result.
pub struct Pipeline {
    resolver: QueryResolver,
    corpus: CorpusReader,
    wildcards: WildcardStore,
    categories: TagCategories,
    options: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        resolver: QueryResolver,
        corpus: CorpusReader,
        wildcards: WildcardStore,
        categories: TagCategories,
        options: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            corpus,
            wildcards,
            categories,
            options,
        }
    }

    /// Open the configured sources and load the tag index, categories, and
    /// wildcard lists.
    pub async fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let timeout = config.source.timeout();
        let positions = open_source(&config.source.positions_url, timeout)?;
        let corpus = open_source(&config.source.corpus_url, timeout)?;

        let index = TagIndex::load(Path::new(&config.data.tag_index_path)).await?;
        let categories = match &config.data.categories_path {
            Some(path) => TagCategories::load(Path::new(path)).await?,
            None => TagCategories::default(),
        };
        let wildcards = match &config.data.wildcard_dir {
            Some(dir) => WildcardStore::load_dir(Path::new(dir)).await?,
            None => WildcardStore::new(),
        };

        Ok(Self::new(
            QueryResolver::new(Arc::new(index), positions, timeout),
            CorpusReader::new(corpus, config.source.prompt_window_bytes, timeout),
            wildcards,
            categories,
            config.pipeline.clone(),
        ))
    }

    pub fn resolver(&self) -> &QueryResolver {
        &self.resolver
    }

    pub fn wildcards(&self) -> &WildcardStore {
        &self.wildcards
    }

    /// Run only the text expanders over `text`.
    pub fn expand<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        expand_all(text, &self.wildcards, rng)
    }

    /// Generate a prompt with a freshly seeded RNG.
    pub async fn generate(
        &self,
        request: &PromptRequest,
        progress: Option<&ProgressFn>,
    ) -> Result<GeneratedPrompt, PipelineError> {
        let mut rng = StdRng::from_os_rng();
        self.generate_with_rng(request, progress, &mut rng).await
    }

    /// Generate a prompt drawing every random choice from `rng`.
    ///
    /// Dropping the returned future cancels any in-flight corpus reads.
    pub async fn generate_with_rng<R: Rng + Send>(
        &self,
        request: &PromptRequest,
        progress: Option<&ProgressFn>,
        rng: &mut R,
    ) -> Result<GeneratedPrompt, PipelineError> {
        let mut search = request.search.clone();
        if self.options.remove_nsfw && !search.trim().is_empty() {
            search.push_str(", rating:g");
        }

        let beginning = self.parse(&self.expand(&request.beginning, rng));
        let end = self.parse(&self.expand(&request.end, rng));
        let negative = self.parse(&expand_dynamic(&request.negative, rng));
        let mut search = self.parse(&self.expand(&search, rng));
        shorten_ratings(&mut search);

        let mut random = if self.options.search_disabled {
            TokenSequence::new()
        } else {
            self.random_prompt(&search, progress, rng).await?
        };
        self.filter_random(&mut random, &beginning, &end, &negative);

        if beginning.contains(UNCENSORED_TAG) || end.contains(UNCENSORED_TAG) {
            random.remove(&self.categories.censor);
        }

        let mut prompt = TokenSequence::new();
        prompt.append(beginning);
        prompt.append(random);
        prompt.append(end);
        self.finish(&mut prompt);

        let characters = request
            .characters
            .iter()
            .map(|character| {
                let mut seq = self.parse(&self.expand(character, rng));
                self.finish(&mut seq);
                seq.to_prompt_string()
            })
            .collect();

        let generated = GeneratedPrompt {
            prompt: prompt.to_prompt_string(),
            negative: negative.to_prompt_string(),
            characters,
        };
        info!(tags = prompt.len(), "Generated prompt");
        Ok(generated)
    }

    fn parse(&self, text: &str) -> TokenSequence {
        let trailing = if self.options.legacy_trailing_drop {
            TrailingText::Drop
        } else {
            TrailingText::Keep
        };
        TokenSequence::parse_with(text, trailing)
    }

    /// Resolve the search tokens and read one matching corpus prompt.
    async fn random_prompt<R: Rng + Send>(
        &self,
        search: &TokenSequence,
        progress: Option<&ProgressFn>,
        rng: &mut R,
    ) -> Result<TokenSequence, PipelineError> {
        let query = Query::from_tokens(search);
        let candidates = self.resolver.resolve(&query, progress).await?;
        let Some(offset) = CorpusReader::pick(&candidates, rng) else {
            return Ok(TokenSequence::new());
        };

        let text = self.corpus.prompt_at(offset).await?;
        debug!(offset, prompt = %text, "Picked corpus prompt");

        let mut random = self.parse(&text);
        lengthen_ratings(&mut random);
        Ok(random)
    }

    /// Drop tags the user did not ask for, or already supplied, from the
    /// searched prompt.
    fn filter_random(
        &self,
        random: &mut TokenSequence,
        beginning: &TokenSequence,
        end: &TokenSequence,
        negative: &TokenSequence,
    ) {
        let categories = &self.categories;
        let options = &self.options;

        if !categories.whitelist.is_empty() {
            let whitelist: HashSet<&str> = categories.whitelist.iter().map(String::as_str).collect();
            random.retain(|t| whitelist.contains(t.text.as_str()));
        }

        let removals = [
            (options.remove_artist, &categories.artist),
            (options.remove_character, &categories.character),
            (options.remove_characteristic, &categories.characteristic),
            (options.remove_attire, &categories.clothes),
            (options.remove_copyright, &categories.copyright),
            (options.remove_ornament, &categories.ornament),
            (options.remove_emotion, &categories.emotions),
        ];
        for (enabled, list) in removals {
            if enabled {
                random.remove(list);
            }
        }

        random.remove(RATING_ALIASES.iter().map(|(long, _)| *long));
        random.remove(&categories.bad);

        random.remove(beginning.texts());
        random.remove(end.texts());
        random.remove(negative.texts());
    }

    fn finish(&self, seq: &mut TokenSequence) {
        seq.remove_duplicates();
        if self.options.reorder {
            seq.reorder(&self.categories);
        }
        if self.options.nai_standard {
            seq.nai_standard(&self.categories);
        }
    }
}

/// Rewrite long rating tags (`rating:general`, `rating: general`) to the
/// short forms used by the index. An exclude marker is kept.
fn shorten_ratings(seq: &mut TokenSequence) {
    for token in seq.iter_mut() {
        let (marker, tag) = match token.text.strip_prefix(EXCLUDE_MARKER) {
            Some(tag) => (Some(EXCLUDE_MARKER), tag),
            None => (None, token.text.as_str()),
        };
        let compact = tag.trim_start().replacen("rating: ", "rating:", 1);
        if let Some((_, short)) = RATING_ALIASES.iter().find(|(long, _)| *long == compact) {
            token.text = marker.into_iter().chain(short.chars()).collect();
        }
    }
}

/// Rewrite short rating tags from the corpus to their long forms.
fn lengthen_ratings(seq: &mut TokenSequence) {
    for token in seq.iter_mut() {
        if let Some((long, _)) = RATING_ALIASES.iter().find(|(_, short)| *short == token.text) {
            token.text = long.to_string();
        }
    }
}
