mod cli;
mod commands;
mod db;
mod loader;
mod model;
mod schema;
mod stringtable;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rebuild(args) => commands::rebuild::run(args),
        Commands::LoadCsv(args) => commands::load_csv::run(args),
        Commands::Strings(args) => commands::strings::run(args),
        Commands::Quests(args) => commands::quests::run(args),
        Commands::Replicate(args) => commands::replicate::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
