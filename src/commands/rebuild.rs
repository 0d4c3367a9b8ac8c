use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::cli::RebuildArgs;
use crate::db;
use crate::loader::{self, RowPolicy};
use crate::model::{IndexStats, RebuildManifest};
use crate::stringtable;
use crate::util::{ensure_directory, now_utc_string, write_json_pretty};

// Table order mirrors the source export set; a missing file skips the table.
pub const CSV_TABLES: &[(&str, &str)] = &[
    ("items", "items.csv"),
    ("zone", "zone.csv"),
    ("loottable_entries", "loottable_entries.csv"),
    ("lootdrop_entries", "lootdrop_entries.csv"),
    ("lootdrop", "lootdrop.csv"),
    ("loottable", "loottable.csv"),
    ("spawngroup", "spawngroup.csv"),
    ("spawnentry", "spawnentry.csv"),
    ("npc_types", "npc_types.csv"),
    ("spawnlocation", "spawnlocation.csv"),
    ("spells", "spells.csv"),
    ("zone_points", "zone_points.csv"),
];

const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_items_id ON items(id)",
    "CREATE INDEX IF NOT EXISTS idx_items_name ON items(name)",
    "CREATE INDEX IF NOT EXISTS idx_lootdrop_entries_lootdrop_id ON lootdrop_entries(lootdrop_id)",
    "CREATE INDEX IF NOT EXISTS idx_lootdrop_entries_item_id ON lootdrop_entries(item_id)",
    "CREATE INDEX IF NOT EXISTS idx_loottable_entries_loottable_id ON loottable_entries(loottable_id)",
    "CREATE INDEX IF NOT EXISTS idx_loottable_entries_lootdrop_id ON loottable_entries(lootdrop_id)",
    "CREATE INDEX IF NOT EXISTS idx_npc_types_id ON npc_types(id)",
    "CREATE INDEX IF NOT EXISTS idx_npc_types_loottable_id ON npc_types(loottable_id)",
    "CREATE INDEX IF NOT EXISTS idx_zone_short_name ON zone(short_name)",
    "CREATE INDEX IF NOT EXISTS idx_zone_zoneidnumber ON zone(zoneidnumber)",
    "CREATE INDEX IF NOT EXISTS idx_zone_points_zone ON zone_points(zone)",
    "CREATE INDEX IF NOT EXISTS idx_zone_points_target_zone_id ON zone_points(target_zone_id)",
];

pub fn run(args: RebuildArgs) -> Result<()> {
    let started_at = now_utc_string();

    let data_root = args.data_root.clone();
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| data_root.join("db").join("eq_data.db"));
    let manifest_path = args
        .manifest_path
        .clone()
        .unwrap_or_else(|| data_root.join("manifests").join("rebuild_run.json"));

    info!(data_root = %data_root.display(), db_path = %db_path.display(), "starting rebuild");

    remove_stale_database(&db_path)?;
    if let Some(parent) = db_path.parent() {
        ensure_directory(parent)?;
    }

    let mut connection = db::open_database(&db_path)?;

    let mut warnings = Vec::new();
    let mut reports = Vec::new();

    for (table, file_name) in CSV_TABLES {
        let csv_path = data_root.join("csv").join(file_name);
        if !csv_path.exists() {
            warn!(table, path = %csv_path.display(), "source file missing, skipping table");
            warnings.push(format!("missing source file: {}", csv_path.display()));
            continue;
        }

        match loader::load_csv_table(&mut connection, &csv_path, table, RowPolicy::ContinueOnError)
        {
            Ok(report) => reports.push(report),
            Err(err) => {
                error!(table, error = %err, "table load failed, continuing with next table");
                warnings.push(format!("table {table} failed: {err:#}"));
            }
        }
    }

    let string_entries = load_string_table(&mut connection, &data_root, &mut warnings)?;

    // Hand-written schema: a no-op when zone_points.csv already built the
    // table, a guaranteed fallback shape when it did not.
    ensure_zone_points_schema(&connection)?;

    let indices = create_indices(&connection);

    let manifest = RebuildManifest {
        manifest_version: 1,
        started_at,
        completed_at: now_utc_string(),
        db_path: db_path.display().to_string(),
        tables: reports,
        string_entries,
        indices,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote rebuild manifest");

    let inserted: usize = manifest.tables.iter().map(|report| report.inserted).sum();
    let rejected: usize = manifest.tables.iter().map(|report| report.rejected()).sum();
    info!(
        tables = manifest.tables.len(),
        rows = inserted,
        rejected_rows = rejected,
        string_entries,
        indices_created = manifest.indices.created,
        indices_failed = manifest.indices.failed,
        "rebuild completed"
    );

    Ok(())
}

// A rebuild starts from nothing: the database file and any WAL leftovers
// from a previous run are deleted before the first connection opens.
fn remove_stale_database(db_path: &Path) -> Result<()> {
    let mut stale: Vec<PathBuf> = vec![db_path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut sibling = db_path.as_os_str().to_os_string();
        sibling.push(suffix);
        stale.push(PathBuf::from(sibling));
    }

    for path in stale {
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
    }

    Ok(())
}

fn load_string_table(
    connection: &mut Connection,
    data_root: &Path,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    stringtable::ensure_table(connection)?;

    let text_path = data_root.join("text").join("eqstr_us.txt");
    if !text_path.exists() {
        warn!(path = %text_path.display(), "string-table source missing, skipping");
        warnings.push(format!("missing source file: {}", text_path.display()));
        return Ok(0);
    }

    let content = crate::util::read_text_with_fallback(&text_path)?;
    let entries = stringtable::load_entries(connection, &content)?;
    info!(entries, path = %text_path.display(), "loaded string table");

    Ok(entries)
}

fn ensure_zone_points_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS zone_points (
              id INTEGER PRIMARY KEY,
              zone TEXT,
              target_zone_id INTEGER,
              target_x REAL,
              target_y REAL,
              target_z REAL,
              target_heading INTEGER,
              number INTEGER,
              x REAL,
              y REAL,
              z REAL,
              heading INTEGER,
              min_expansion INTEGER DEFAULT -1,
              max_expansion INTEGER DEFAULT -1,
              content_flags TEXT,
              content_flags_disabled TEXT,
              is_virtual INTEGER DEFAULT 0,
              height INTEGER DEFAULT 0,
              width INTEGER DEFAULT 0
            );
            ",
        )
        .context("failed to create table zone_points")?;
    Ok(())
}

// Each index stands alone: one failure (usually an absent table) must not
// stop the remaining indices.
fn create_indices(connection: &Connection) -> IndexStats {
    let mut stats = IndexStats::default();

    for statement in INDEX_STATEMENTS {
        match connection.execute(statement, []) {
            Ok(_) => stats.created += 1,
            Err(err) => {
                warn!(error = %err, statement, "failed to create index");
                stats.failed += 1;
            }
        }
    }

    info!(created = stats.created, failed = stats.failed, "index creation finished");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_workspace(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("eqdata-rebuild-{tag}-{}", std::process::id()));
        fs::remove_dir_all(&root).ok();
        fs::create_dir_all(root.join("csv")).unwrap();
        fs::create_dir_all(root.join("text")).unwrap();
        root
    }

    #[test]
    fn rebuild_loads_present_sources_and_skips_missing_ones() {
        let root = temp_workspace("partial");

        fs::write(
            root.join("csv/items.csv"),
            "id,name,weight\n1,Rusty Sword,2.5\n2,Cloth Cap,0.4\n3,Torch,1.0\n",
        )
        .unwrap();
        fs::write(
            root.join("csv/zone.csv"),
            "short_name,zoneidnumber,long_name\nqeynos,1,South Qeynos\nfreporte,10,East Freeport\n",
        )
        .unwrap();
        fs::write(
            root.join("text/eqstr_us.txt"),
            "100 Hello world 200 Goodbye\n",
        )
        .unwrap();

        run(RebuildArgs {
            data_root: root.clone(),
            db_path: None,
            manifest_path: None,
        })
        .unwrap();

        let connection = Connection::open(root.join("db/eq_data.db")).unwrap();
        assert_eq!(db::count_rows(&connection, "items").unwrap(), 3);
        assert_eq!(db::count_rows(&connection, "zone").unwrap(), 2);
        assert_eq!(db::count_rows(&connection, "eqstr_us").unwrap(), 2);

        // The manual schema supplies zone_points when no CSV exists for it.
        assert!(db::table_exists(&connection, "zone_points").unwrap());
        assert!(!db::table_exists(&connection, "npc_types").unwrap());

        let index_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_items_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 1);

        assert!(root.join("manifests/rebuild_run.json").exists());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn rebuild_replaces_an_existing_database() {
        let root = temp_workspace("replace");

        fs::write(root.join("csv/items.csv"), "id,name\n1,Rusty Sword\n").unwrap();

        run(RebuildArgs {
            data_root: root.clone(),
            db_path: None,
            manifest_path: None,
        })
        .unwrap();

        // Second rebuild with a different source must not see old rows.
        fs::write(root.join("csv/items.csv"), "id,name\n7,Fine Steel Dagger\n").unwrap();

        run(RebuildArgs {
            data_root: root.clone(),
            db_path: None,
            manifest_path: None,
        })
        .unwrap();

        let connection = Connection::open(root.join("db/eq_data.db")).unwrap();
        assert_eq!(db::count_rows(&connection, "items").unwrap(), 1);
        let id: i64 = connection
            .query_row("SELECT id FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(id, 7);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn index_failures_do_not_stop_later_indices() {
        let root = temp_workspace("indices");

        // Only zone exists; ten of the twelve indices reference absent tables.
        fs::write(
            root.join("csv/zone.csv"),
            "short_name,zoneidnumber\nqeynos,1\n",
        )
        .unwrap();

        run(RebuildArgs {
            data_root: root.clone(),
            db_path: None,
            manifest_path: None,
        })
        .unwrap();

        let connection = Connection::open(root.join("db/eq_data.db")).unwrap();
        for index in [
            "idx_zone_short_name",
            "idx_zone_zoneidnumber",
            "idx_zone_points_zone",
            "idx_zone_points_target_zone_id",
        ] {
            let count: i64 = connection
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?1",
                    [index],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "expected index {index}");
        }

        fs::remove_dir_all(&root).ok();
    }
}
