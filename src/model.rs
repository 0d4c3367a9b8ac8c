use serde::Serialize;

use crate::loader::LoadReport;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexStats {
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebuildManifest {
    pub manifest_version: u32,
    pub started_at: String,
    pub completed_at: String,
    pub db_path: String,
    pub tables: Vec<LoadReport>,
    pub string_entries: usize,
    pub indices: IndexStats,
    pub warnings: Vec<String>,
}
