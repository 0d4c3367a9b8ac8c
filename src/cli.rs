use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "eqdata",
    version,
    about = "Game-data migration tooling: CSV exports into SQLite, quests into MySQL"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Destroy and rebuild the SQLite database from all known source files
    Rebuild(RebuildArgs),
    /// Load a single CSV into a single table, stopping at the first bad row
    LoadCsv(LoadCsvArgs),
    /// Parse the string-table dump and upsert it into eqstr_us
    Strings(StringsArgs),
    /// Walk quests/<zone>/<name>.lua and upsert the scripts
    Quests(QuestsArgs),
    /// Copy the quests table from SQLite into MySQL in batches
    Replicate(ReplicateArgs),
    /// Report row counts for the known tables
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RebuildArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Defaults to <data-root>/db/eq_data.db
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Defaults to <data-root>/manifests/rebuild_run.json
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LoadCsvArgs {
    pub csv_path: PathBuf,

    pub db_path: PathBuf,

    /// Defaults to the CSV file stem
    #[arg(long)]
    pub table: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StringsArgs {
    #[arg(long, default_value = "data/text/eqstr_us.txt")]
    pub text_path: PathBuf,

    #[arg(long, default_value = "data/db/eq_data.db")]
    pub db_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct QuestsArgs {
    #[arg(long, default_value = "data/quests")]
    pub quests_root: PathBuf,

    #[arg(long, default_value = "data/db/eq_data.db")]
    pub db_path: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ReplicateArgs {
    #[arg(long, default_value = "data/db/eq_data.db")]
    pub db_path: PathBuf,

    /// e.g. mysql://root@127.0.0.1/eqgo
    #[arg(long, env = "EQDATA_MYSQL_URL")]
    pub mysql_url: String,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data/db/eq_data.db")]
    pub db_path: PathBuf,
}
