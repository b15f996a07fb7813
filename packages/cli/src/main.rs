use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "rivalry",
    about = "Rivalry research: analyze rivalrous relationships between two people",
    version
)]
struct Cli {
    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze the rivalry between two people by knowledge-graph ID
    Analyze {
        /// First entity ID (e.g. Q935 for Newton)
        entity1: String,
        /// Second entity ID (e.g. Q9047 for Leibniz)
        entity2: String,
        /// Skip writing the analysis to disk
        #[arg(long)]
        no_save: bool,
    },
    /// Search for people by name, for disambiguation
    Search {
        /// Name to search for
        name: String,
        /// Maximum results
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Inspect and manage the source catalog
    Sources {
        #[command(subcommand)]
        command: commands::SourcesCommand,
    },
    /// List saved analyses
    Analyses,
    /// Delete generated data (catalog, raw sources, analyses)
    Clean {
        /// Actually delete; without this flag nothing is removed
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("research=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Analyze {
            entity1,
            entity2,
            no_save,
        } => commands::analyze(&entity1, &entity2, no_save, cli.json).await,
        Command::Search { name, limit } => commands::search(&name, limit, cli.json).await,
        Command::Sources { command } => commands::sources(command, cli.json).await,
        Command::Analyses => commands::list_analyses(cli.json),
        Command::Clean { yes } => commands::clean(yes),
    }
}
