#![forbid(unsafe_code)]

mod cmd;
mod context;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use context::AppContext;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "duet",
    author,
    version,
    about = "duet: hybrid vector + trigram document search",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Alias for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Document store path (overrides config and `DUET_DB`).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Project",
        about = "Initialize a duet project",
        long_about = "Write .duet/config.toml and create an empty document store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    duet init\n\n    # Keep the store somewhere else\n    duet --db /var/lib/duet/docs.db init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Embedding",
        about = "Embed one text",
        after_help = "EXAMPLES:\n    duet embed \"hello world\" --format json"
    )]
    Embed(cmd::embed::EmbedArgs),

    #[command(
        next_help_heading = "Embedding",
        about = "Embed several texts in one batch",
        after_help = "EXAMPLES:\n    duet embed-batch first second third --format json"
    )]
    EmbedBatch(cmd::embed::EmbedBatchArgs),

    #[command(
        next_help_heading = "Documents",
        about = "Embed and insert documents",
        long_about = "Embed each item's \"{title} {text}\" and insert all items in one transaction.",
        after_help = "EXAMPLES:\n    # From a file\n    duet insert --file docs.json\n\n    # From stdin\n    cat docs.json | duet insert"
    )]
    Insert(cmd::insert::InsertArgs),

    #[command(next_help_heading = "Documents")]
    Search(cmd::search::SearchArgs),

    #[command(
        next_help_heading = "Documents",
        about = "Show document counts",
        after_help = "EXAMPLES:\n    duet stats --format json"
    )]
    Stats,

    #[command(
        next_help_heading = "Project",
        about = "Check store and embedder health",
        long_about = "Check that the document store opens and that its vector dimension matches the embedder."
    )]
    Health,

    #[command(
        next_help_heading = "Project",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    duet completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("DUET_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "duet=debug,info"
        } else if quiet {
            "error"
        } else {
            "duet=info,warn"
        })
    });

    let format = env::var("DUET_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let db = cli.db.as_deref();

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, db, output, &project_root),
        Commands::Embed(args) => {
            let embedder = context::open_embedder(&project_root, db)?;
            cmd::embed::run_embed(args, embedder.as_ref(), output)
        }
        Commands::EmbedBatch(args) => {
            let embedder = context::open_embedder(&project_root, db)?;
            cmd::embed::run_embed_batch(args, embedder.as_ref(), output)
        }
        Commands::Insert(args) => {
            let mut ctx = AppContext::open(&project_root, db)?;
            cmd::insert::run_insert(args, &mut ctx, output)
        }
        Commands::Search(args) => {
            let ctx = AppContext::open(&project_root, db)?;
            cmd::search::run_search(args, &ctx, output)
        }
        Commands::Stats => {
            let ctx = AppContext::open(&project_root, db)?;
            cmd::stats::run_stats(&ctx, output)
        }
        Commands::Health => cmd::health::run_health(db, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let output = cli.output_mode();
    if cli.verbose {
        info!("Verbose mode enabled");
    }
    debug!(?output, "output mode resolved");

    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if render_error(output, &CliError::from(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
