#![deny(unsafe_code)]

//! promptsmith CLI: generate prompts from the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use promptsmith_config::AppConfig;
use promptsmith_core::expand::expand_all;
use promptsmith_core::search::ProgressFn;
use promptsmith_core::search::index::fetch_positions;
use promptsmith_core::source::open_source;
use promptsmith_core::{Pipeline, PromptRequest, TagIndex, WildcardStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// promptsmith: assemble image-generation prompts from a tagged corpus.
#[derive(Parser)]
#[command(name = "promptsmith", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "promptsmith.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a prompt.
    Generate(GenerateArgs),

    /// Run the dynamic-choice and wildcard expanders over some text.
    Expand {
        text: String,

        /// Seed for reproducible choices.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the tag index entry for a tag.
    Lookup {
        tag: String,

        /// Also fetch the tag's position set.
        #[arg(long)]
        fetch: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
    /// Tags placed before the searched prompt.
    #[arg(long, default_value = "")]
    beg: String,

    /// Search tags; prefix a tag with `~` to exclude it.
    #[arg(long, default_value = "")]
    search: String,

    /// Tags placed after the searched prompt.
    #[arg(long, default_value = "")]
    end: String,

    /// Negative prompt.
    #[arg(long, default_value = "")]
    negative: String,

    /// Character prompt (repeatable).
    #[arg(long = "character")]
    characters: Vec<String>,

    /// Seed for reproducible choices.
    #[arg(long)]
    seed: Option<u64>,
}

impl From<GenerateArgs> for PromptRequest {
    fn from(args: GenerateArgs) -> Self {
        Self {
            beginning: args.beg,
            search: args.search,
            end: args.end,
            negative: args.negative,
            characters: args.characters,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config).await?;
    let level = loaded.as_ref().map_or("info", |c| c.logging.level.as_str());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(filter_directive(cli.verbose, level))),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = loaded.unwrap_or_else(|| {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
        AppConfig::default()
    });

    match cli.command {
        Commands::Generate(args) => cmd_generate(&config, args).await?,
        Commands::Expand { text, seed } => cmd_expand(&config, &text, seed).await?,
        Commands::Lookup { tag, fetch } => cmd_lookup(&config, &tag, fetch).await?,
        Commands::Config { show } => cmd_config(&config, &cli.config, show)?,
    }

    Ok(())
}

async fn cmd_generate(config: &AppConfig, args: GenerateArgs) -> Result<()> {
    let mut rng = seeded_rng(args.seed);
    let request = PromptRequest::from(args);
    let pipeline = Pipeline::from_config(config).await?;

    let progress: &ProgressFn = &|status: &str| eprintln!("{status}");
    let generated = tokio::select! {
        result = pipeline.generate_with_rng(&request, Some(progress), &mut rng) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling search");
            anyhow::bail!("interrupted");
        }
    };

    println!("{}", generated.prompt);
    if !generated.negative.is_empty() {
        println!("negative: {}", generated.negative);
    }
    for (i, character) in generated.characters.iter().enumerate() {
        println!("character {}: {character}", i + 1);
    }
    Ok(())
}

async fn cmd_expand(config: &AppConfig, text: &str, seed: Option<u64>) -> Result<()> {
    let wildcards = match &config.data.wildcard_dir {
        Some(dir) => WildcardStore::load_dir(Path::new(dir)).await?,
        None => WildcardStore::new(),
    };
    let mut rng = seeded_rng(seed);
    println!("{}", expand_all(text, &wildcards, &mut rng));
    Ok(())
}

async fn cmd_lookup(config: &AppConfig, tag: &str, fetch: bool) -> Result<()> {
    let index = TagIndex::load(Path::new(&config.data.tag_index_path)).await?;
    let entry = index.lookup(tag)?;
    println!(
        "{}: slots {}..{} ({} prompts)",
        entry.tag,
        entry.start,
        entry.end,
        entry.len()
    );

    if fetch {
        let timeout = config.source.timeout();
        let source = open_source(&config.source.positions_url, timeout)?;
        let positions = fetch_positions(source.as_ref(), entry, timeout).await?;
        match (positions.min(), positions.max()) {
            (Some(first), Some(last)) => {
                println!("fetched {} offsets, {first}..={last}", positions.len())
            }
            _ => println!("fetched 0 offsets"),
        }
    }
    Ok(())
}

fn cmd_config(config: &AppConfig, config_path: &Path, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("serializing configuration")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Load the config file, or `None` when it does not exist.
async fn load_config(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let config = AppConfig::load(path)
        .await
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(Some(config))
}

/// `-v` flags override the configured level.
fn filter_directive(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
