mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, member::MemberSubcommand, workspace::WorkspaceSubcommand};
use context::Context;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pulse",
    about = "Weekly co-founder alignment pulse: check-ins, trends and mediation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./pulse.yaml; missing file means defaults)
    #[arg(long, global = true, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database (default: server.db_path from the config)
    #[arg(long, global = true, env = "PULSE_DB")]
    db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (default: server.port from the config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the week key (Monday, YYYY-MM-DD) for a date
    Week {
        /// Any date as YYYY-MM-DD (default: today)
        date: Option<String>,
    },

    /// Show the current alignment summary for a workspace
    Score {
        #[arg(long)]
        workspace: String,
    },

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        subcommand: WorkspaceSubcommand,
    },

    /// Manage workspace members
    Member {
        #[command(subcommand)]
        subcommand: MemberSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = Context::resolve(cli.config.as_deref(), cli.db.as_deref()).and_then(|ctx| {
        match cli.command {
            Commands::Serve { port } => cmd::serve::run(ctx, port),
            Commands::Week { date } => cmd::week::run(date.as_deref(), cli.json),
            Commands::Score { workspace } => cmd::score::run(&ctx, &workspace, cli.json),
            Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand, cli.json),
            Commands::Workspace { subcommand } => {
                cmd::workspace::run(&ctx, subcommand, cli.json)
            }
            Commands::Member { subcommand } => cmd::member::run(&ctx, subcommand, cli.json),
        }
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
