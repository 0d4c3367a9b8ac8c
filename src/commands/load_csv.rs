use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::LoadCsvArgs;
use crate::db;
use crate::loader::{self, RowPolicy};

pub fn run(args: LoadCsvArgs) -> Result<()> {
    if !args.csv_path.exists() {
        bail!("source file not found: {}", args.csv_path.display());
    }

    let table = match args.table.clone() {
        Some(table) => table,
        None => derive_table_name(&args)?,
    };

    let mut connection = db::open_database(&args.db_path)?;
    let report = loader::load_csv_table(&mut connection, &args.csv_path, &table, RowPolicy::FailFast)?;

    if report.halted {
        // The failing row was already logged with its line number; the rows
        // accepted before it stay committed.
        warn!(
            table = %table,
            inserted = report.inserted,
            "load stopped at the first failing row"
        );
    }

    info!(
        table = %table,
        db_path = %args.db_path.display(),
        inserted = report.inserted,
        rejected_arity = report.rejected_arity,
        "standalone load finished"
    );

    Ok(())
}

fn derive_table_name(args: &LoadCsvArgs) -> Result<String> {
    let stem = args
        .csv_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| {
            format!(
                "cannot derive a table name from {}; pass --table",
                args.csv_path.display()
            )
        })?;
    Ok(stem.to_string())
}
