use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use sqlx::{Connection as _, MySqlConnection};
use tracing::info;

use crate::cli::ReplicateArgs;

#[derive(Debug, Clone)]
pub struct QuestRow {
    pub zone: String,
    pub name: String,
    pub lua_content: String,
}

pub fn run(args: ReplicateArgs) -> Result<()> {
    let quests = read_quests(&args.db_path)?;
    info!(
        quests = quests.len(),
        db_path = %args.db_path.display(),
        "fetched quest rows from sqlite"
    );

    // The replicator is the one network-attached step; it owns its own
    // single-threaded runtime so the rest of the tool stays synchronous.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(replicate(&args.mysql_url, &quests, args.batch_size))
}

pub fn read_quests(db_path: &Path) -> Result<Vec<QuestRow>> {
    if !db_path.exists() {
        bail!("source database not found: {}", db_path.display());
    }

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let mut statement = connection
        .prepare("SELECT zone, name, lua_content FROM quests")
        .context("failed to query quests table")?;
    let rows = statement.query_map([], |row| {
        Ok(QuestRow {
            zone: row.get(0)?,
            name: row.get(1)?,
            lua_content: row.get(2)?,
        })
    })?;

    let quests = rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read quest rows")?;
    Ok(quests)
}

async fn replicate(mysql_url: &str, quests: &[QuestRow], batch_size: usize) -> Result<()> {
    let mut connection = MySqlConnection::connect(mysql_url)
        .await
        .context("failed to connect to mysql")?;

    ensure_destination_table(&mut connection).await?;

    let total = quests.len();
    let mut imported = 0usize;

    for batch in quests.chunks(batch_size.max(1)) {
        let mut tx = connection.begin().await.context("failed to begin batch")?;

        for quest in batch {
            sqlx::query(
                "INSERT INTO quests (zone, name, lua_content) VALUES (?, ?, ?)
                 ON DUPLICATE KEY UPDATE lua_content = VALUES(lua_content)",
            )
            .bind(&quest.zone)
            .bind(&quest.name)
            .bind(&quest.lua_content)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert quest {}/{}", quest.zone, quest.name))?;
        }

        tx.commit().await.context("failed to commit batch")?;
        imported += batch.len();
        info!("imported {imported} of {total}");
    }

    // Re-read the destination as the verification figure.
    let (destination_rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quests")
        .fetch_one(&mut connection)
        .await
        .context("failed to verify destination row count")?;

    info!(destination_rows, total, "replication complete");
    Ok(())
}

async fn ensure_destination_table(connection: &mut MySqlConnection) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS quests (
           id INT AUTO_INCREMENT PRIMARY KEY,
           zone VARCHAR(64) NOT NULL,
           name VARCHAR(128) NOT NULL,
           lua_content LONGTEXT,
           UNIQUE KEY quests_zone_name (zone, name)
         )",
    )
    .execute(connection)
    .await
    .context("failed to create destination quests table")?;
    Ok(())
}
