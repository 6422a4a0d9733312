use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dt_cli::commands::{report, reset, run, status};
use dt_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<dt_db::Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    dt_db::Database::open(&config.database_path).context("failed to open database")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        Some(Commands::Run) => {
            let summary = run::run(&config)?;
            println!(
                "Processed {} events ({} skipped, {} failed)",
                summary.events, summary.skipped, summary.failures
            );
        }
        Some(Commands::Report { json }) => {
            let db = open_database(&config)?;
            report::run(&mut io::stdout().lock(), &db, *json)?;
        }
        Some(Commands::Reset { yes }) => {
            let mut db = open_database(&config)?;
            reset::run(
                &mut db,
                &mut io::stdin().lock(),
                &mut io::stdout().lock(),
                *yes,
            )?;
        }
        Some(Commands::Status) => {
            let db = open_database(&config)?;
            status::run(&mut io::stdout().lock(), &db, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
