use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dbscout::{format_size, ConfigOverrides, SearchConfig, SearchEngine, SearchOutput};
use std::io::IsTerminal;
use std::{fs, num::NonZeroUsize, path::Path, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every database file for a substring
    Search(SearchArgs),
    /// Show how many database files are indexed and their total size
    Stats {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Directory holding the database files
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    /// Text to search for, matched literally
    query: String,

    #[command(flatten)]
    source: SourceArgs,

    /// Search files concurrently
    #[arg(short, long)]
    parallel: bool,

    /// Worker threads for a parallel search
    #[arg(short = 'j', long)]
    workers: Option<NonZeroUsize>,

    /// Maximum number of matches to return
    #[arg(short = 'm', long)]
    max_results: Option<NonZeroUsize>,

    /// Distinguish upper and lower case
    #[arg(short = 's', long)]
    case_sensitive: bool,

    /// Memory-map text and SQL files larger than this many bytes
    #[arg(long)]
    mmap_threshold: Option<u64>,

    /// Only print the summary
    #[arg(long)]
    stats: bool,

    /// Print matches and summary as JSON
    #[arg(long, conflicts_with = "stats")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Search(args) => {
            let overrides = ConfigOverrides {
                root_directory: args.source.root.clone(),
                max_results: args.max_results,
                case_sensitive: args.case_sensitive,
                parallel_workers: args.workers,
                mmap_threshold_bytes: args.mmap_threshold,
                log_level: args.source.log_level.clone(),
            };
            let engine = start_engine(&args.source, overrides)?;

            let output = if args.parallel {
                engine.search_parallel(&args.query)?
            } else {
                engine.search(&args.query)?
            };

            if args.json {
                print_json(&output)?;
            } else {
                print_search_results(&output, engine.config(), args.stats);
            }
            Ok(())
        }
        Commands::Stats { source } => {
            let overrides = ConfigOverrides {
                root_directory: source.root.clone(),
                log_level: source.log_level.clone(),
                ..ConfigOverrides::default()
            };
            let engine = start_engine(&source, overrides)?;

            let (count, total_size) = engine.file_stats()?;
            println!(
                "{} {}",
                "Database directory:".bold(),
                engine.config().root_directory.display()
            );
            println!("{} {}", "Indexed files:".bold(), count);
            println!("{} {}", "Total size:".bold(), format_size(total_size));
            Ok(())
        }
    }
}

/// Loads configuration, installs logging and prepares the database directory
fn start_engine(source: &SourceArgs, overrides: ConfigOverrides) -> Result<SearchEngine> {
    let config = SearchConfig::load_from(source.config.as_deref())?.merge_with_cli(overrides);
    config.validate()?;

    init_logging(&config.log_level);
    ensure_directory(&config.root_directory)?;

    Ok(SearchEngine::new(config))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn ensure_directory(root: &Path) -> Result<()> {
    if !root.exists() {
        fs::create_dir_all(root)
            .with_context(|| format!("Failed to create directory {}", root.display()))?;
        info!("Created database directory {}", root.display());
    }
    Ok(())
}

fn print_json(output: &SearchOutput) -> Result<()> {
    let json = serde_json::json!({
        "matches": &*output.matches,
        "stats": output.stats,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_search_results(output: &SearchOutput, config: &SearchConfig, stats_only: bool) {
    if !stats_only {
        for m in output.iter() {
            println!(
                "{}:{}: {}",
                m.file_name.blue(),
                m.record_number.to_string().green(),
                m.content
            );
        }
        if !output.is_empty() {
            println!();
        }
    }

    println!(
        "Found {} matches in {} files searched ({:.3}s)",
        output.stats.total_matches, output.stats.files_searched, output.stats.duration_seconds
    );
    if output.len() >= config.max_results.get() {
        println!(
            "{}",
            format!(
                "Result limit of {} reached; refine the query to see more",
                config.max_results
            )
            .yellow()
        );
    }
}
