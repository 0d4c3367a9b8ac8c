use anyhow::{Result, bail};
use tracing::info;

use crate::cli::StringsArgs;
use crate::db;
use crate::stringtable;
use crate::util::read_text_with_fallback;

pub fn run(args: StringsArgs) -> Result<()> {
    // Unlike a full rebuild, the standalone command treats a missing dump
    // as a hard error.
    if !args.text_path.exists() {
        bail!("string-table file not found: {}", args.text_path.display());
    }

    let content = read_text_with_fallback(&args.text_path)?;

    let mut connection = db::open_database(&args.db_path)?;
    stringtable::ensure_table(&connection)?;
    let entries = stringtable::load_entries(&mut connection, &content)?;

    info!(
        entries,
        path = %args.text_path.display(),
        db_path = %args.db_path.display(),
        "string table loaded"
    );

    Ok(())
}
