mod cmd;
mod output;
mod provider;
mod root;

use clap::{ArgAction, Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use prd_core::{config::Config, paths};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "prd",
    about = "Grow a markdown PRD chunk by chunk through an AI assistant",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .prd/ or .git/)
    #[arg(long, global = true, env = "PRD_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// More detail: chunk tables in `status`, debug logging (-vv for trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create config, document skeleton and chunk map
    Init {
        /// Lines per chunk (saved to the config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Rebuild the chunk map even if a state file exists
        #[arg(long)]
        force: bool,

        /// Project description for a new document skeleton
        #[arg(long)]
        description: Option<String>,
    },

    /// Show chunk progress
    Status,

    /// Run a single enhancement pass
    #[command(alias = "start")]
    Enhance {
        /// Process at most N chunks
        #[arg(long)]
        limit: Option<usize>,

        /// Show what would be processed without calling the provider
        #[arg(long)]
        dry_run: bool,

        /// Fail out-of-range chunks instead of aborting the pass
        #[arg(long)]
        lenient: bool,

        /// Use the offline stub provider regardless of config
        #[arg(long)]
        stub: bool,
    },

    /// Run passes until the document reaches the target size
    Grow {
        /// Target line count
        #[arg(long)]
        target: Option<usize>,

        #[arg(long)]
        max_passes: Option<u32>,

        #[arg(long)]
        chunks_per_pass: Option<usize>,

        /// Keep the chunk map between passes instead of rebuilding it
        #[arg(long)]
        no_rebuild: bool,

        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        lenient: bool,

        #[arg(long)]
        stub: bool,
    },

    /// Back up and remove the state file
    Reset,

    /// Mark chunks pending again
    Retry {
        /// Chunk ids
        ids: Vec<u32>,

        /// Retry every failed chunk
        #[arg(long)]
        failed: bool,
    },

    /// Check config, state and document consistency
    Doctor {
        /// Apply safe repairs
        #[arg(long)]
        fix: bool,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let root = root::resolve_root(cli.root.as_deref());
    init_tracing(&root, &cli);

    let json = cli.json;
    let result = match cli.command {
        Commands::Init {
            chunk_size,
            force,
            description,
        } => cmd::init::run(&root, chunk_size, force, description.as_deref(), json),
        Commands::Status => cmd::status::run(&root, cli.verbose > 0, json),
        Commands::Enhance {
            limit,
            dry_run,
            lenient,
            stub,
        } => cmd::enhance::run(
            &root,
            cmd::RunFlags {
                dry_run,
                lenient,
                stub,
            },
            limit,
            json,
        ),
        Commands::Grow {
            target,
            max_passes,
            chunks_per_pass,
            no_rebuild,
            dry_run,
            lenient,
            stub,
        } => cmd::grow::run(
            &root,
            cmd::RunFlags {
                dry_run,
                lenient,
                stub,
            },
            cmd::grow::GrowOverrides {
                target,
                max_passes,
                chunks_per_pass,
                no_rebuild,
            },
            json,
        ),
        Commands::Reset => cmd::reset::run(&root, json),
        Commands::Retry { ids, failed } => cmd::retry::run(&root, &ids, failed, json),
        Commands::Doctor { fix } => cmd::doctor::run(&root, fix, json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Stderr logging plus, inside an initialised project, a plain-text mirror
/// appended to the configured log file.
fn init_tracing(root: &Path, cli: &Cli) {
    let default_level = match cli.verbose {
        0 => match &cli.command {
            Commands::Enhance { .. } | Commands::Grow { .. } => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        },
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(default_level.into());
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = log_file(root).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn log_file(root: &Path) -> Option<std::fs::File> {
    if !paths::prd_dir(root).is_dir() {
        return None;
    }
    let path = Config::load(root).ok()?.log_file(root)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("warning: cannot open log file {}: {e}", path.display());
            None
        }
    }
}
