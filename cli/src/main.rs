mod commands;
mod config;
mod gemini;
mod supabase;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    RecordEdit, cmd_add, cmd_dashboard, cmd_delete, cmd_edit, cmd_export, cmd_history,
    cmd_import, cmd_insight, cmd_login, cmd_logout, cmd_signup, cmd_whoami,
};
use crate::config::Config;
use fitlog_core::history::DEFAULT_PAGE_SIZE;

#[derive(Parser)]
#[command(
    name = "fitlog",
    version,
    about = "Track morning/evening weight and bowel movements"
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Signup {
        /// Handle: up to 10 ASCII letters or digits
        handle: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in to an existing account
    Login {
        handle: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign out and forget the stored session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the signed-in account
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a day's weights; an existing entry for the date is replaced
    Add {
        /// Morning weight in 斤
        morning: String,
        /// Evening weight in 斤
        evening: String,
        /// Number of bowel movements (0 for none)
        #[arg(long, default_value_t = 0)]
        bm: u32,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of a logged record
    Edit {
        /// Record ID (see `fitlog history`)
        id: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        morning: Option<String>,
        #[arg(long)]
        evening: Option<String>,
        /// Number of bowel movements (0 for none)
        #[arg(long)]
        bm: Option<u32>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        /// Remove the notes
        #[arg(long)]
        clear_notes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a record by ID
    Delete {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List records, newest first
    History {
        /// Earliest date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        per_page: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Weekly averages, trend and bowel-movement rate
    Dashboard {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export all records to a CSV file
    Export {
        /// Output path (default: fitlog_records_<today>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import records from a file written by `fitlog export`
    Import {
        file: PathBuf,
        /// Parse and validate without saving
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// AI analysis of the last week
    Insight {
        /// Discard the cached analysis and ask again
        #[arg(long)]
        regenerate: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Signup {
            handle,
            password,
            json,
        } => cmd_signup(&config, &handle, password, json).await,
        Commands::Login {
            handle,
            password,
            json,
        } => cmd_login(&config, &handle, password, json).await,
        Commands::Logout { json } => cmd_logout(&config, json).await,
        Commands::Whoami { json } => cmd_whoami(&config, json),
        Commands::Add {
            morning,
            evening,
            bm,
            date,
            notes,
            json,
        } => cmd_add(&config, &morning, &evening, bm, date, notes, json).await,
        Commands::Edit {
            id,
            date,
            morning,
            evening,
            bm,
            notes,
            clear_notes,
            json,
        } => {
            let edit = RecordEdit {
                date,
                morning,
                evening,
                bm,
                notes,
                clear_notes,
            };
            cmd_edit(&config, &id, edit, json).await
        }
        Commands::Delete { id, json } => cmd_delete(&config, &id, json).await,
        Commands::History {
            from,
            to,
            page,
            per_page,
            json,
        } => cmd_history(&config, from, to, page, per_page, json).await,
        Commands::Dashboard { json } => cmd_dashboard(&config, json).await,
        Commands::Export { output, json } => cmd_export(&config, output, json).await,
        Commands::Import {
            file,
            dry_run,
            json,
        } => cmd_import(&config, &file, dry_run, json).await,
        Commands::Insight { regenerate, json } => cmd_insight(&config, regenerate, json).await,
    }
}
