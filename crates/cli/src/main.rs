use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use quill_core::{
    Pipeline, Progress, QuillConfig, RunMode, Services, Stage, Tag, default_feed_list_path, load_feed_list,
};
use tracing_subscriber::EnvFilter;

mod echo;

use echo::{print_banner, print_error, print_info, print_step, print_success, print_summary};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Turn trending engineering headlines into an illustrated Hashnode post
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author = "Quill Contributors")]
#[command(version)]
#[command(about = "Turn trending engineering headlines into an illustrated Hashnode post", long_about = None)]
struct Args {
    /// Feed URL to scan; repeat to scan several (replaces the feed list)
    #[arg(long = "feed", value_name = "URL")]
    feeds: Vec<String>,

    /// File listing feed URLs, one per line ('#' starts a comment)
    #[arg(long, value_name = "FILE")]
    feeds_file: Option<PathBuf>,

    /// Tag to attach to the post; repeat for several (replaces the default tag)
    #[arg(long = "tag", value_name = "NAME")]
    tags: Vec<String>,

    /// API key for the generation service (GOOGLE_API_KEY is also read)
    #[arg(long, env = "QUILL_GENERATION_API_KEY", hide_env_values = true, value_name = "KEY")]
    generation_key: Option<String>,

    /// Hashnode personal access token
    #[arg(long, env = "HASHNODE_API_KEY", hide_env_values = true, value_name = "KEY")]
    hashnode_key: Option<String>,

    /// Model used for every generation call
    #[arg(long, env = "QUILL_MODEL", value_name = "MODEL")]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible chat completions API
    #[arg(long, env = "QUILL_GENERATION_URL", value_name = "URL")]
    generation_url: Option<String>,

    /// Language the article is written in
    #[arg(long, default_value = "English", value_name = "LANG")]
    language: String,

    /// Number of image placeholders requested in the draft (at least 2)
    #[arg(long, default_value_t = 2, value_name = "N")]
    placeholders: usize,

    /// Skip the cleanup pass over the draft
    #[arg(long)]
    no_normalize: bool,

    /// Use the plain cover prompt instead of asking for art direction
    #[arg(long)]
    no_art_direction: bool,

    /// Skip the review of the synthesized cover
    #[arg(long)]
    no_cover_review: bool,

    /// Feed and page fetch timeout in seconds
    #[arg(long, default_value_t = 10, value_name = "SECS")]
    timeout: u64,

    /// Run every stage except publishing and print the document
    #[arg(long)]
    dry_run: bool,

    /// Write the dry-run document to a file instead of stdout
    #[arg(short, long, value_name = "FILE", requires = "dry_run")]
    output: Option<PathBuf>,

    /// Only check that the generation service accepts the credentials
    #[arg(long, conflicts_with = "dry_run")]
    check: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,quill_core=debug,quill=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Picks the feed list: `--feed`, then `--feeds-file`, then the user's feed
/// file, then the built-in list (signalled by an empty vector).
fn resolve_feeds(args: &Args) -> anyhow::Result<Vec<String>> {
    if !args.feeds.is_empty() {
        return Ok(args.feeds.clone());
    }

    if let Some(path) = &args.feeds_file {
        return load_feed_list(path).with_context(|| format!("Failed to read feed list: {}", path.display()));
    }

    if let Some(path) = default_feed_list_path()
        && path.is_file()
    {
        tracing::debug!(path = %path.display(), "using feed list from config directory");
        return load_feed_list(&path).with_context(|| format!("Failed to read feed list: {}", path.display()));
    }

    Ok(Vec::new())
}

fn build_config(args: &Args) -> anyhow::Result<QuillConfig> {
    let generation_key = args
        .generation_key
        .clone()
        .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
        .unwrap_or_default();

    let mut builder = QuillConfig::builder()
        .generation_api_key(generation_key)
        .publish_api_key(args.hashnode_key.clone().unwrap_or_default())
        .feeds(resolve_feeds(args)?)
        .tags(args.tags.iter().map(|t| Tag::new(t.as_str())).collect())
        .language(args.language.as_str())
        .placeholder_count(args.placeholders)
        .normalize(!args.no_normalize)
        .art_direction(!args.no_art_direction)
        .cover_review(!args.no_cover_review)
        .fetch_timeout(args.timeout);

    if let Some(model) = &args.model {
        builder = builder.model(model.as_str());
    }
    if let Some(url) = &args.generation_url {
        builder = builder.generation_base_url(url.as_str());
    }

    Ok(builder.build())
}

fn narrate(progress: Progress) {
    match progress {
        Progress::Started(stage) => print_step(stage.number(), Stage::ALL.len(), stage.label()),
        Progress::Finished(_, detail) => eprintln!("  {} {}", "→".dimmed(), detail.bright_white()),
    }
}

async fn check(config: &QuillConfig) -> anyhow::Result<()> {
    config.validate_dry_run().context("Invalid configuration")?;
    let services = Services::from_config(config).context("Failed to initialize HTTP clients")?;

    print_step(1, 1, &format!("Probing {} at {}", config.generation.model, config.generation.base_url));
    services.generator.probe().await.context("Generation service check failed")?;
    print_success("Generation service accepted the credentials");
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let config = build_config(&args)?;

    if args.check {
        return check(&config).await;
    }

    let mode = if args.dry_run { RunMode::DryRun } else { RunMode::Publish };
    match mode {
        RunMode::Publish => config.validate(),
        RunMode::DryRun => config.validate_dry_run(),
    }
    .context("Invalid configuration")?;

    let services = Services::from_config(&config).context("Failed to initialize HTTP clients")?;
    let pipeline = Pipeline::new(services, config);

    let started = Instant::now();
    let mut on_progress = narrate;
    let report = pipeline.run(mode, &mut on_progress).await.context("Pipeline run failed")?;

    if mode == RunMode::DryRun {
        let rendered = report.document.render();
        match &args.output {
            Some(path) => {
                fs::write(path, rendered).with_context(|| format!("Failed to write to file: {}", path.display()))?;
                print_success(&format!("Document written to {}", path.display().bright_white()));
            }
            None => print!("{}", rendered),
        }
    }

    print_summary(&report, started.elapsed());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
