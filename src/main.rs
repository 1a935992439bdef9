//! Review-Harvester main entry point
//!
//! This is the command-line interface for the incremental review harvester.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use review_harvester::batch::{dedup_targets, read_target_file, BatchOrchestrator};
use review_harvester::collector::{dump_state, Harvester};
use review_harvester::config::{load_or_default, validate, Config};
use review_harvester::output::{load_statistics, print_batch_summary, print_statistics};
use review_harvester::source::{run_then_close, SnapshotSource, SourceAdapter};
use review_harvester::storage::{load_store, Checkpointer, EntityId, RecordStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Review-Harvester: an incremental collector for scroll-revealed reviews
///
/// Drives a progressively revealed review listing, extracts every review
/// exactly once, and checkpoints the collection to a JSON store so that
/// interrupted batches resume where they left off.
#[derive(Parser, Debug)]
#[command(name = "review-harvester")]
#[command(version = "1.0.0")]
#[command(about = "An incremental collector for scroll-revealed reviews", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest a single target
    Collect {
        /// Target identifier
        #[arg(long)]
        target: EntityId,

        /// Maximum records to collect (unbounded when omitted)
        #[arg(long)]
        limit: Option<usize>,

        /// Record store path
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Harvest a list of targets, skipping those already in the store
    Batch {
        /// Target identifiers (comma separated or repeated)
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        targets: Vec<EntityId>,

        /// File with one target identifier per line
        #[arg(long, value_name = "PATH")]
        target_file: Option<PathBuf>,

        /// Maximum records per target (defaults to batch.default-limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Record store path
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Minimum pause between targets in milliseconds
        #[arg(long)]
        delay_min_ms: Option<u64>,

        /// Maximum pause between targets in milliseconds
        #[arg(long)]
        delay_max_ms: Option<u64>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Write a target page's embedded state document as JSON
    DumpState {
        /// Target identifier
        #[arg(long)]
        target: EntityId,

        /// Destination file
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show statistics of the record store and exit
    Stats {
        /// Record store path
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

/// Where page content comes from
#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Replay a saved HTML page, or a directory of `<id>.html` pages
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Default configuration is invalid".to_string(),
    })?;
    if let Some(path) = &cli.config {
        tracing::info!("Configuration loaded from {}", path.display());
    }

    match cli.command {
        Command::Collect {
            target,
            limit,
            output,
            source,
        } => {
            apply_overrides(&mut config, output, &source);
            handle_collect(&config, &source, &target, limit).await
        }
        Command::Batch {
            targets,
            target_file,
            limit,
            output,
            delay_min_ms,
            delay_max_ms,
            source,
        } => {
            apply_overrides(&mut config, output, &source);
            if let Some(min) = delay_min_ms {
                config.batch.delay_min_ms = min;
            }
            if let Some(max) = delay_max_ms {
                config.batch.delay_max_ms = max;
            }
            validate(&config).context("Invalid command line overrides")?;
            handle_batch(&config, &source, targets, target_file.as_deref(), limit).await
        }
        Command::DumpState {
            target,
            output,
            source,
        } => {
            apply_overrides(&mut config, None, &source);
            handle_dump_state(&config, &source, &target, &output).await
        }
        Command::Stats { output } => {
            if let Some(path) = output {
                config.output.store_path = path;
            }
            handle_stats(&config)
        }
        Command::CheckConfig => {
            handle_check_config(&config);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvester=info,warn"),
            1 => EnvFilter::new("review_harvester=debug,info"),
            2 => EnvFilter::new("review_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, output: Option<PathBuf>, source: &SourceArgs) {
    if let Some(path) = output {
        config.output.store_path = path;
    }
    if source.headful {
        config.browser.headless = false;
    }
}

/// The content source selected on the command line
enum AnySource {
    Snapshot(SnapshotSource),
    #[cfg(feature = "chromium")]
    Chromium(review_harvester::source::ChromiumSource),
}

async fn build_source(args: &SourceArgs, config: &Config) -> anyhow::Result<AnySource> {
    let page_size = config.source.snapshot_page_size;

    if let Some(path) = &args.snapshot {
        let source = if path.is_dir() {
            SnapshotSource::from_dir(path, page_size)
        } else {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            SnapshotSource::from_html(html, page_size)
        };
        tracing::info!("Replaying snapshot {}", path.display());
        return Ok(AnySource::Snapshot(source));
    }

    #[cfg(feature = "chromium")]
    {
        let source = review_harvester::source::ChromiumSource::launch(&config.browser)
            .await
            .context("Failed to launch browser")?;
        Ok(AnySource::Chromium(source))
    }

    #[cfg(not(feature = "chromium"))]
    {
        bail!("No live browser support in this build; pass --snapshot or rebuild with --features chromium")
    }
}

/// Runs `$body` with `$source` bound to the selected adapter and closes the
/// adapter afterwards. `$body` evaluates to a `Result`; apply `?` to the
/// macro's value so the adapter is closed on the error path too.
macro_rules! with_source {
    ($args:expr, $config:expr, |$source:ident| $body:expr) => {
        match build_source($args, $config).await? {
            AnySource::Snapshot($source) => run_then_close(&$source, async { $body }).await,
            #[cfg(feature = "chromium")]
            AnySource::Chromium($source) => run_then_close(&$source, async { $body }).await,
        }
    };
}

/// Handles `collect`: harvests one target and checkpoints it
async fn handle_collect(
    config: &Config,
    source_args: &SourceArgs,
    target: &EntityId,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let mut store = Checkpointer::load(&config.output.store_path)?;
    let harvester = Harvester::new(config);

    with_source!(source_args, config, |source| {
        collect_one(&harvester, &source, &mut store, target, limit).await
    })
}

async fn collect_one<S: SourceAdapter>(
    harvester: &Harvester,
    source: &S,
    store: &mut Checkpointer,
    target: &EntityId,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let report = harvester
        .harvest(source, target, limit)
        .await
        .with_context(|| format!("Failed to harvest {}", target))?;

    let collected = report.records.len();
    let added = store.absorb(report.records);
    store.flush()?;

    println!(
        "Collected {} records for {} ({} new, {}), store now holds {}",
        collected,
        target,
        added,
        report.end,
        store.records().len()
    );
    Ok(())
}

/// Handles `batch`: harvests every listed target with isolation and pacing
async fn handle_batch(
    config: &Config,
    source_args: &SourceArgs,
    mut targets: Vec<EntityId>,
    target_file: Option<&Path>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    if let Some(path) = target_file {
        let listed = read_target_file(path)
            .with_context(|| format!("Failed to read target file {}", path.display()))?;
        targets.extend(listed);
    }
    let targets = dedup_targets(targets);
    if targets.is_empty() {
        bail!("No targets given; use --targets or --target-file");
    }

    let limit = limit.unwrap_or(config.batch.default_limit);
    let mut store = Checkpointer::load(&config.output.store_path)?;
    let harvester = Harvester::new(config);

    let summary = with_source!(source_args, config, |source| {
        BatchOrchestrator::new(&harvester, &source, &mut store)
            .run(&targets, Some(limit), config.batch.delay())
            .await
    })?;

    print_batch_summary(&summary);
    Ok(())
}

/// Handles `dump-state`: writes the target page's state document
async fn handle_dump_state(
    config: &Config,
    source_args: &SourceArgs,
    target: &EntityId,
    output: &Path,
) -> anyhow::Result<()> {
    let harvester = Harvester::new(config);

    with_source!(source_args, config, |source| {
        dump_state(&harvester, &source, target, output)
            .await
            .with_context(|| format!("Failed to dump state of {}", target))
    })?;

    println!("✓ State of {} written to {}", target, output.display());
    Ok(())
}

/// Handles `stats`: shows statistics of the record store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = &config.output.store_path;
    println!("Store: {}\n", path.display());

    let store = load_store(path)?;
    let stats = load_statistics(&store);
    print_statistics(&stats);

    Ok(())
}

/// Handles `check-config`: shows the effective configuration
fn handle_check_config(config: &Config) {
    println!("=== Review-Harvester Configuration ===\n");

    println!("Source:");
    println!("  URL template: {}", config.source.url_template);
    println!("  Item query: {}", config.source.item_query);
    println!(
        "  Timestamp: {} [{}]",
        config.source.timestamp.query,
        config.source.timestamp.attribute.as_deref().unwrap_or("text")
    );
    println!(
        "  Rating: {} [{}]",
        config.source.rating.query,
        config.source.rating.attribute.as_deref().unwrap_or("text")
    );
    if let Some(query) = &config.source.total_count_query {
        println!("  Total count: {}", query);
    }
    println!("  State: {}", config.source.state_query);

    println!("\nResolver:");
    println!("  Attempts: {}", config.resolver.attempts);
    println!("  Timeout: {}ms", config.resolver.timeout_ms);
    println!("  Backoff: {}ms", config.resolver.backoff_ms);

    println!("\nPager:");
    println!("  Max scroll attempts: {}", config.pager.max_scroll_attempts);
    println!("  Stall threshold: {}", config.pager.stall_threshold);
    println!(
        "  Offsets: fixed {}, random {}..={}",
        config.pager.fixed_offset, config.pager.random_offset_min, config.pager.random_offset_max
    );
    println!(
        "  Pause: {}..={}ms",
        config.pager.pause_min_ms, config.pager.pause_max_ms
    );

    println!("\nExtractor:");
    println!("  Node pause: {}ms", config.extractor.node_pause_ms);
    println!("  Focus each node: {}", config.extractor.focus_each_node);
    println!("  Settle: {}ms", config.extractor.settle_ms);

    println!("\nBatch:");
    println!("  Default limit: {}", config.batch.default_limit);
    println!(
        "  Delay: {}..={}ms",
        config.batch.delay_min_ms, config.batch.delay_max_ms
    );

    println!("\nOutput:");
    println!("  Store: {}", config.output.store_path.display());

    println!("\n✓ Configuration is valid");
}
