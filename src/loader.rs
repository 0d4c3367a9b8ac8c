use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::schema::{self, TableSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    // Bulk rebuild: log each failing row and keep going.
    ContinueOnError,
    // Standalone single-table load: stop the file at the first failing row.
    FailFast,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub inserted: usize,
    pub rejected_arity: usize,
    pub rejected_insert: usize,
    pub halted: bool,
}

impl LoadReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            inserted: 0,
            rejected_arity: 0,
            rejected_insert: 0,
            halted: false,
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejected_arity + self.rejected_insert
    }
}

pub fn load_csv_table(
    connection: &mut Connection,
    csv_path: &Path,
    table_name: &str,
    policy: RowPolicy,
) -> Result<LoadReport> {
    let file = File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let report = load_csv_reader(connection, file, table_name, policy)
        .with_context(|| format!("failed to load {}", csv_path.display()))?;

    info!(
        table = table_name,
        path = %csv_path.display(),
        inserted = report.inserted,
        rejected_arity = report.rejected_arity,
        rejected_insert = report.rejected_insert,
        "loaded table from csv"
    );

    Ok(report)
}

pub fn load_csv_reader<R: Read>(
    connection: &mut Connection,
    input: R,
    table_name: &str,
    policy: RowPolicy,
) -> Result<LoadReport> {
    // flexible: short or long rows come back as records so the arity policy
    // can see them instead of the csv reader erroring out.
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut records = reader.records();

    let Some(header) = records.next() else {
        bail!("table {table_name}: csv input is empty");
    };
    let header = header.context("failed to read csv header row")?;

    let Some(sample) = records.next() else {
        bail!("table {table_name}: csv input has a header but no data rows");
    };
    let sample = sample.context("failed to read first csv data row")?;

    let headers: Vec<String> = header.iter().map(|field| field.to_string()).collect();
    let sample_fields: Vec<String> = sample.iter().map(|field| field.to_string()).collect();
    let spec = schema::infer_table_spec(table_name, &headers, &sample_fields)?;

    let mut report = LoadReport::new(table_name);

    let tx = connection.transaction()?;
    {
        tx.execute(&schema::create_table_sql(&spec)?, [])
            .with_context(|| format!("failed to create table {table_name}"))?;

        let mut statement = tx
            .prepare(&schema::insert_sql(&spec)?)
            .with_context(|| format!("failed to prepare insert for {table_name}"))?;

        // The inference sample is data row 1, source line 2 behind the header.
        let mut keep_going = insert_record(&mut statement, &spec, &sample, 2, policy, &mut report);

        if keep_going {
            for (index, record) in records.enumerate() {
                let record = record.context("failed to read csv record")?;
                let line = index + 3;
                keep_going = insert_record(&mut statement, &spec, &record, line, policy, &mut report);
                if !keep_going {
                    break;
                }
            }
        }
    }
    // One commit covers the whole load, halted or not, so rows accepted
    // before a fail-fast stop are kept.
    tx.commit()?;

    Ok(report)
}

fn insert_record(
    statement: &mut rusqlite::Statement<'_>,
    spec: &TableSpec,
    record: &StringRecord,
    line: usize,
    policy: RowPolicy,
    report: &mut LoadReport,
) -> bool {
    if record.len() != spec.column_count() {
        report.rejected_arity += 1;
        debug!(
            table = %spec.name,
            line,
            expected = spec.column_count(),
            found = record.len(),
            "rejected row: column count mismatch"
        );
        // Arity mismatches never halt ingestion, under either policy.
        return true;
    }

    match statement.execute(rusqlite::params_from_iter(record.iter())) {
        Ok(_) => {
            report.inserted += 1;
            true
        }
        Err(err) => {
            report.rejected_insert += 1;
            warn!(
                table = %spec.name,
                line,
                error = %err,
                row = ?record,
                "rejected row: insert failed"
            );
            match policy {
                RowPolicy::ContinueOnError => true,
                RowPolicy::FailFast => {
                    report.halted = true;
                    false
                }
            }
        }
    }
}
