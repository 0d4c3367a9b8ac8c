use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};
use tracing::info;

use crate::cli::QuestsArgs;
use crate::db;
use crate::util::read_text_with_fallback;

pub fn run(args: QuestsArgs) -> Result<()> {
    if !args.quests_root.is_dir() {
        bail!("quest directory not found: {}", args.quests_root.display());
    }

    let mut connection = db::open_database(&args.db_path)?;
    ensure_quests_table(&connection)?;

    let scripts = upsert_scripts(&mut connection, &args.quests_root)?;

    info!(
        scripts,
        quests_root = %args.quests_root.display(),
        db_path = %args.db_path.display(),
        "quest scripts loaded"
    );

    Ok(())
}

pub fn ensure_quests_table(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS quests (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              zone TEXT,
              name TEXT,
              lua_content TEXT,
              UNIQUE(zone, name)
            );
            ",
        )
        .context("failed to create table quests")?;
    Ok(())
}

// One level deep: quests/<zone>/<name>.lua. The zone is the directory name,
// the quest name is the file stem.
fn upsert_scripts(connection: &mut Connection, quests_root: &Path) -> Result<usize> {
    let mut scripts = 0usize;

    let tx = connection.transaction()?;
    {
        let mut statement = tx
            .prepare(
                "INSERT INTO quests(zone, name, lua_content) VALUES(?1, ?2, ?3)
                 ON CONFLICT(zone, name) DO UPDATE SET lua_content=excluded.lua_content",
            )
            .context("failed to prepare quests upsert")?;

        let mut zone_paths = Vec::new();
        for entry in fs::read_dir(quests_root)
            .with_context(|| format!("failed to read {}", quests_root.display()))?
        {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", quests_root.display()))?;
            if entry.path().is_dir() {
                zone_paths.push(entry.path());
            }
        }
        zone_paths.sort();

        for zone_path in zone_paths {
            let Some(zone) = zone_path.file_name().and_then(|name| name.to_str()) else {
                bail!("invalid UTF-8 zone directory: {}", zone_path.display());
            };

            let mut script_paths = Vec::new();
            for entry in fs::read_dir(&zone_path)
                .with_context(|| format!("failed to read {}", zone_path.display()))?
            {
                let entry = entry
                    .with_context(|| format!("failed to read entry in {}", zone_path.display()))?;
                let path = entry.path();

                let is_lua = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("lua"))
                    .unwrap_or(false);
                if path.is_file() && is_lua {
                    script_paths.push(path);
                }
            }
            script_paths.sort();

            for path in script_paths {
                let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    bail!("invalid UTF-8 script filename: {}", path.display());
                };

                let lua_content = read_text_with_fallback(&path)?;
                statement.execute(params![zone, name, lua_content])?;
                scripts += 1;
            }
        }
    }
    tx.commit()?;

    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("eqdata-quests-{tag}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn walks_zone_directories_and_upserts_scripts() {
        let dir = temp_dir("walk");
        fs::create_dir_all(dir.join("quests/qeynos")).unwrap();
        fs::create_dir_all(dir.join("quests/freporte")).unwrap();
        fs::write(dir.join("quests/qeynos/Guard_Gehnus.lua"), "-- guard\n").unwrap();
        fs::write(dir.join("quests/qeynos/a_rat.lua"), "-- rat\n").unwrap();
        // Latin-1 content must survive the fallback decode.
        fs::write(dir.join("quests/freporte/Tann.lua"), b"-- Qu\xE9bec\n").unwrap();
        // Non-lua files are ignored.
        fs::write(dir.join("quests/qeynos/readme.txt"), "ignored").unwrap();

        run(QuestsArgs {
            quests_root: dir.join("quests"),
            db_path: dir.join("out.db"),
        })
        .unwrap();

        let connection = Connection::open(dir.join("out.db")).unwrap();
        assert_eq!(db::count_rows(&connection, "quests").unwrap(), 3);

        let content: String = connection
            .query_row(
                "SELECT lua_content FROM quests WHERE zone='freporte' AND name='Tann'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(content, "-- Qu\u{e9}bec\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rerunning_overwrites_by_zone_and_name() {
        let dir = temp_dir("rerun");
        fs::create_dir_all(dir.join("quests/qeynos")).unwrap();
        fs::write(dir.join("quests/qeynos/a_rat.lua"), "-- v1\n").unwrap();

        run(QuestsArgs {
            quests_root: dir.join("quests"),
            db_path: dir.join("out.db"),
        })
        .unwrap();

        fs::write(dir.join("quests/qeynos/a_rat.lua"), "-- v2\n").unwrap();
        run(QuestsArgs {
            quests_root: dir.join("quests"),
            db_path: dir.join("out.db"),
        })
        .unwrap();

        let connection = Connection::open(dir.join("out.db")).unwrap();
        assert_eq!(db::count_rows(&connection, "quests").unwrap(), 1);

        let content: String = connection
            .query_row("SELECT lua_content FROM quests", [], |row| row.get(0))
            .unwrap();
        assert_eq!(content, "-- v2\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_quest_directory_is_fatal() {
        let dir = temp_dir("missing");
        let result = run(QuestsArgs {
            quests_root: dir.join("quests"),
            db_path: dir.join("out.db"),
        });
        assert!(result.is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
