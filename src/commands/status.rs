use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::rebuild::CSV_TABLES;
use crate::db;
use crate::stringtable::STRING_TABLE;

pub fn run(args: StatusArgs) -> Result<()> {
    if !args.db_path.exists() {
        warn!(path = %args.db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = db::open_database(&args.db_path)?;
    info!(path = %args.db_path.display(), "database status");

    let mut tables: Vec<&str> = CSV_TABLES.iter().map(|(table, _)| *table).collect();
    tables.push(STRING_TABLE);
    tables.push("quests");

    for table in tables {
        if db::table_exists(&connection, table)? {
            let rows = db::count_rows(&connection, table)?;
            info!(table, rows, "table status");
        } else {
            warn!(table, "table missing");
        }
    }

    Ok(())
}
