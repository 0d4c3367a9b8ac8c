use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::{Connection, params};
use tracing::debug;

pub const STRING_TABLE: &str = "eqstr_us";

pub fn ensure_table(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS eqstr_us (
              id INTEGER PRIMARY KEY,
              text TEXT
            );
            ",
        )
        .context("failed to create table eqstr_us")?;
    Ok(())
}

// An entry starts at a run of 3+ digits that sits at the start of the text
// or behind whitespace, and is itself followed by exactly one whitespace
// character. The entry text runs up to (but not including) the whitespace
// that introduces the next entry, so markers are never consumed by the
// preceding entry's text.
pub fn parse_entries(content: &str) -> Result<Vec<(i64, &str)>> {
    let marker =
        Regex::new(r"\d{3,}").context("failed to compile string-table marker pattern")?;
    let bytes = content.as_bytes();

    let mut markers = Vec::new();
    for found in marker.find_iter(content) {
        let preceded_ok =
            found.start() == 0 || bytes[found.start() - 1].is_ascii_whitespace();
        let followed_by_space = bytes
            .get(found.end())
            .is_some_and(|byte| byte.is_ascii_whitespace());

        if preceded_ok && followed_by_space {
            markers.push((found.start(), found.end()));
        }
    }

    let mut entries = Vec::with_capacity(markers.len());
    for (index, &(start, end)) in markers.iter().enumerate() {
        let Ok(id) = content[start..end].parse::<i64>() else {
            debug!(marker = &content[start..end], "skipping unparsable entry id");
            continue;
        };

        let text_start = end + 1;
        let text = match markers.get(index + 1) {
            Some(&(next_start, _)) => &content[text_start..next_start - 1],
            None => content[text_start..].trim_end(),
        };

        if text.is_empty() {
            continue;
        }

        entries.push((id, text));
    }

    Ok(entries)
}

// Last write wins: a recurring id overwrites the earlier text.
pub fn load_entries(connection: &mut Connection, content: &str) -> Result<usize> {
    let entries = parse_entries(content)?;

    let tx = connection.transaction()?;
    {
        let mut statement = tx
            .prepare(
                "INSERT INTO eqstr_us(id, text) VALUES(?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET text=excluded.text",
            )
            .context("failed to prepare eqstr_us upsert")?;

        for (id, text) in &entries {
            statement.execute(params![id, text])?;
        }
    }
    tx.commit()?;

    Ok(entries.len())
}
