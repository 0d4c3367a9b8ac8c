use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

// Game exports predate UTF-8; fall back to Latin-1, where every byte maps
// directly to the matching code point, so the fallback cannot fail.
pub fn read_text_with_fallback(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => Ok(err
            .into_bytes()
            .iter()
            .map(|&byte| char::from(byte))
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_1_fallback_preserves_high_bytes() {
        let dir = std::env::temp_dir().join(format!("eqdata-util-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("latin1.lua");

        // 0xE9 is 'é' in Latin-1 but invalid as a standalone UTF-8 byte.
        fs::write(&path, b"-- Qu\xE9bec quest\n").unwrap();

        let text = read_text_with_fallback(&path).unwrap();
        assert_eq!(text, "-- Qu\u{e9}bec quest\n");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn utf_8_content_reads_unchanged() {
        let dir = std::env::temp_dir().join(format!("eqdata-util8-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("utf8.lua");

        fs::write(&path, "-- déjà vu\n").unwrap();
        assert_eq!(read_text_with_fallback(&path).unwrap(), "-- déjà vu\n");

        fs::remove_dir_all(&dir).ok();
    }
}
