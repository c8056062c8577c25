use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "gait")]
#[command(about = "gait - track AI conversations alongside the code they produced", long_about = None)]
struct Cli {
    /// Workspace root holding the `.gait` directory
    #[arg(long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the state and config files
    Init,
    /// Hide a message from every view
    DeleteMessage { id: String },
    /// Hide a conversation from every view
    DeleteChat { id: String },
    /// Render a conversation as Markdown
    Export {
        chat_id: String,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List stored conversations by the commit that introduced them
    History,
    /// Show which conversations produced regions of a file
    Blame { file: PathBuf },
    /// Reconcile a session export into the store on an interval
    Watch {
        /// JSON file holding the editor's panel chats
        #[arg(long)]
        source: PathBuf,
        /// Stop after this many ticks instead of running until Ctrl-C
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Merge conflict markers left in the state file
    ResolveConflicts,
    /// Git merge driver entry point (%O %A %B)
    MergeDriver {
        base: PathBuf,
        ours: PathBuf,
        theirs: PathBuf,
    },
    /// Register the merge driver for the state file
    InstallMergeDriver,
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("GAIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = cli.workspace;
    match cli.command {
        Commands::Init => commands::store::init(&root).await?,
        Commands::DeleteMessage { id } => commands::store::delete_message(&root, &id).await?,
        Commands::DeleteChat { id } => commands::store::delete_chat(&root, &id).await?,
        Commands::Export { chat_id, output } => {
            commands::store::export(&root, &chat_id, output.as_deref()).await?
        }
        Commands::History => commands::history::history(&root).await?,
        Commands::Blame { file } => commands::history::blame(&root, &file).await?,
        Commands::Watch { source, ticks } => commands::watch::watch(&root, &source, ticks).await?,
        Commands::ResolveConflicts => commands::merge::resolve(&root).await?,
        Commands::MergeDriver { base, ours, theirs } => {
            commands::merge::merge_driver(&base, &ours, &theirs).await?
        }
        Commands::InstallMergeDriver => commands::merge::install(&root).await?,
    }

    Ok(())
}
