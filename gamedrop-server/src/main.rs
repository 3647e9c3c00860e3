//! Gamedrop CLI - run the download server and administer accounts

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{accounts, activity, counts, serve};

/// Gamedrop - game archives for approved accounts
#[derive(Parser)]
#[command(name = "gamedrop", version, about, long_about = None)]
struct Cli {
    /// Data directory (default: ~/.gamedrop)
    #[arg(long, global = true, env = "GAMEDROP_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on, overrides settings.json
        #[arg(long)]
        bind: Option<String>,
    },

    /// List accounts waiting for approval
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Approve a pending account
    Approve {
        /// Account id
        id: i64,
    },

    /// Decline a pending account and delete it
    Decline {
        /// Account id
        id: i64,
    },

    /// Show per-game download counters
    Counts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent activity
    Activity {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Delete entries older than DAYS instead of listing
        #[arg(long, value_name = "DAYS")]
        prune_days: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = commands::resolve_data_dir(cli.data_dir)?;

    match cli.command {
        Commands::Serve { bind } => serve::run(&data_dir, bind),
        Commands::Pending { json } => accounts::pending(&data_dir, json),
        Commands::Approve { id } => accounts::approve(&data_dir, id),
        Commands::Decline { id } => accounts::decline(&data_dir, id),
        Commands::Counts { json } => counts::run(&data_dir, json),
        Commands::Activity { prune_days: Some(days), json, .. } => activity::prune(&data_dir, days, json),
        Commands::Activity { limit, errors, json, .. } => activity::run(&data_dir, limit, errors, json),
    }
}
