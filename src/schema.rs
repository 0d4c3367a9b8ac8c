use anyhow::{Result, bail};

// Column names that always map to INTEGER; the first column of a table
// additionally becomes the primary key when its name is in this set.
const INTEGER_KEY_NAMES: &[&str] = &["id", "itemid", "zoneidnumber"];

// Column names that always map to TEXT, whatever the sample value looks like.
const FORCED_TEXT_NAMES: &[&str] = &[
    "name",
    "lore",
    "file",
    "filename",
    "short_name",
    "long_name",
];

const MAX_IDENTIFIER_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_keyword(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub primary_key: bool,
}

#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

pub fn infer_table_spec(table_name: &str, headers: &[String], sample: &[String]) -> Result<TableSpec> {
    validate_identifier(table_name)?;

    if headers.is_empty() {
        bail!("table {table_name} has an empty header row");
    }
    if headers.len() != sample.len() {
        bail!(
            "table {table_name}: header has {} columns but first data row has {}",
            headers.len(),
            sample.len()
        );
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (position, (header, value)) in headers.iter().zip(sample).enumerate() {
        validate_identifier(header)?;

        let lowered = header.to_ascii_lowercase();
        let mut kind = infer_kind(value);
        let mut primary_key = false;

        if INTEGER_KEY_NAMES.contains(&lowered.as_str()) {
            kind = ColumnKind::Integer;
            primary_key = position == 0;
        } else if FORCED_TEXT_NAMES.contains(&lowered.as_str()) {
            kind = ColumnKind::Text;
        }

        columns.push(ColumnSpec {
            name: header.clone(),
            kind,
            primary_key,
        });
    }

    Ok(TableSpec {
        name: table_name.to_string(),
        columns,
    })
}

// Digit-only literals are INTEGER; anything else that parses as a float is
// REAL; everything else is TEXT. Inference is advisory for schema typing
// only — no range checks.
fn infer_kind(value: &str) -> ColumnKind {
    if value.parse::<f64>().is_err() {
        return ColumnKind::Text;
    }

    if !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit()) {
        ColumnKind::Integer
    } else {
        ColumnKind::Real
    }
}

// Identifiers cannot be bound as statement parameters, so every table and
// column name is checked against an allow-list before it reaches SQL text.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("SQL identifier is empty");
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        bail!(
            "SQL identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes ({} bytes): {name:?}",
            name.len()
        );
    }

    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    let rest_ok = chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

    if !leading_ok || !rest_ok {
        bail!("SQL identifier contains characters outside [A-Za-z0-9_]: {name:?}");
    }

    Ok(())
}

pub fn create_table_sql(spec: &TableSpec) -> Result<String> {
    validate_identifier(&spec.name)?;

    let mut definitions = Vec::with_capacity(spec.columns.len());
    for column in &spec.columns {
        validate_identifier(&column.name)?;

        let mut definition = format!("\"{}\" {}", column.name, column.kind.sql_keyword());
        if column.primary_key {
            definition.push_str(" PRIMARY KEY");
        }
        definitions.push(definition);
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        spec.name,
        definitions.join(", ")
    ))
}

pub fn insert_sql(spec: &TableSpec) -> Result<String> {
    validate_identifier(&spec.name)?;

    let mut names = Vec::with_capacity(spec.columns.len());
    let mut placeholders = Vec::with_capacity(spec.columns.len());
    for (index, column) in spec.columns.iter().enumerate() {
        validate_identifier(&column.name)?;
        names.push(format!("\"{}\"", column.name));
        placeholders.push(format!("?{}", index + 1));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        spec.name,
        names.join(", "),
        placeholders.join(", ")
    ))
}
