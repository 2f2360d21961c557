//! CodeSync CLI
//!
//! Replays recorded site traffic through the interceptor and sync pipeline,
//! and inspects handler patterns and settings files.

mod config;
mod dry_run;
mod github;
mod replay;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cs_core::bridge::BridgeConfig;
use cs_core::{ContentUploader, PatternRegistry, UrlPattern};
use cs_providers::{bind_page_handlers, LogEvents, Site, SyncConfig};

use config::GithubArgs;
use dry_run::DryRunUploader;
use github::GithubUploader;
use replay::{ReplayFile, ReplayOptions};

#[derive(Parser)]
#[command(name = "cs-cli")]
#[command(about = "CodeSync interceptor and sync tools")]
struct Cli {
    /// Log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded exchanges and sync what they submit
    Replay {
        /// Recorded exchanges (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Settings snapshot (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Log uploads instead of committing them
        #[arg(long)]
        dry_run: bool,

        /// Only sync submissions younger than this many seconds
        #[arg(long, default_value_t = 120)]
        freshness_secs: u64,

        /// Seconds to wait for a worker reply
        #[arg(long, default_value_t = 10)]
        reply_timeout_secs: u64,

        #[command(flatten)]
        github: GithubArgs,
    },

    /// Show which handlers a URL would trigger
    Match {
        /// URL to test
        #[arg(short, long)]
        url: String,

        /// Test this pattern instead of the bound handlers
        #[arg(short, long)]
        pattern: Option<String>,

        /// Treat --pattern as a regular expression
        #[arg(long, requires = "pattern")]
        regex: bool,
    },

    /// Validate a settings snapshot and show how it resolves
    Settings {
        /// Settings snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Replay {
            input,
            settings,
            dry_run,
            freshness_secs,
            reply_timeout_secs,
            github,
        } => cmd_replay(&input, settings, dry_run, freshness_secs, reply_timeout_secs, github),
        Commands::Match { url, pattern, regex } => cmd_match(&url, pattern, regex),
        Commands::Settings { input } => cmd_settings(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Captures `log` records from the library crates as well.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn cmd_replay(
    input: &std::path::Path,
    settings: Option<PathBuf>,
    dry_run: bool,
    freshness_secs: u64,
    reply_timeout_secs: u64,
    github: GithubArgs,
) -> Result<(), String> {
    let exchanges = config::read_json::<ReplayFile>(input)
        .map_err(|e| e.to_string())?
        .into_exchanges();
    let settings = config::load_settings(settings.as_deref()).map_err(|e| e.to_string())?;

    let dry_run_uploader = Arc::new(DryRunUploader::default());
    let uploader: Arc<dyn ContentUploader> = if dry_run {
        dry_run_uploader.clone()
    } else {
        let github = GithubUploader::new(github);
        if !github.is_configured() {
            log::warn!("GitHub is not configured; uploads will be reported as not configured");
        }
        Arc::new(github)
    };

    let options = ReplayOptions {
        settings,
        sync: SyncConfig {
            freshness_window: Duration::from_secs(freshness_secs),
            ..SyncConfig::default()
        },
        bridge: BridgeConfig {
            reply_timeout: Duration::from_secs(reply_timeout_secs),
            ..BridgeConfig::default()
        },
    };

    let count = exchanges.len();
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start tokio runtime: {}", e))?;
    let report = runtime.block_on(replay::run(exchanges, uploader, options))?;
    let stats = report.stats;

    println!("Replayed {} exchange(s)", count);
    println!("  Passed through:   {}", stats.passed_through);
    println!("  Skipped (status): {}", stats.skipped_status);
    println!("  Contexts built:   {}", stats.contexts_built);
    println!("  Handlers matched: {}", stats.handlers_matched);
    println!("  Problems solved:  {}", report.solved.problems_solved.len());
    for (slug, entry) in &report.solved.problems_solved {
        println!("    {} ({}, {})", slug, entry.site, entry.question.difficulty);
    }
    if dry_run {
        let written = dry_run_uploader.written();
        println!("  Files (dry run):  {}", written.len());
        for file in written {
            println!("    {}", file);
        }
    }
    Ok(())
}

fn cmd_match(url: &str, pattern: Option<String>, regex: bool) -> Result<(), String> {
    if let Some(pattern) = pattern {
        let pattern = UrlPattern::new(pattern, regex);
        if pattern.is_regex() && !pattern.is_valid() {
            return Err(format!("Pattern {} does not compile", pattern));
        }
        println!("{} {} {}", pattern, if pattern.matches(url) { "matches" } else { "does not match" }, url);
        return Ok(());
    }

    let registry = PatternRegistry::new();
    bind_page_handlers(&registry, Arc::new(LogEvents));

    let hits: Vec<_> = registry
        .bound_handlers()
        .into_iter()
        .filter(|(_, pattern, _)| pattern.matches(url))
        .collect();
    if hits.is_empty() {
        println!("No handler matches {}", url);
        return Ok(());
    }
    for (id, pattern, mode) in hits {
        println!("{:<45} {:<8} {}", id.to_string(), format!("{:?}", mode), pattern);
    }
    Ok(())
}

fn cmd_settings(input: &std::path::Path) -> Result<(), String> {
    let settings = config::load_settings(Some(input)).map_err(|e| e.to_string())?;

    println!("Settings: {}", input.display());
    println!("  Overwrite existing: {}", settings.overwrite_existing);
    for site in [Site::LeetCode, Site::HackerRank] {
        println!(
            "  {:<11} enabled={:<5} subdirectory={}",
            site.display_name(),
            settings.is_enabled(site.name()),
            settings.subdirectory_for(site.name())
        );
    }
    for name in settings.sites.keys() {
        if ![Site::LeetCode, Site::HackerRank].iter().any(|s| s.name() == name) {
            log::warn!("Unknown site '{}' in settings", name);
        }
    }
    Ok(())
}
