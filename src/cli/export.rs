use std::io::Write;

use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::ese::table::Table;
use crate::ese::value::TypedValue;
use crate::util::hex::format_bytes;
use crate::EseError;

/// Options for the `ese export` subcommand.
pub struct ExportOptions {
    /// Path to the ESE database file.
    pub file: String,
    /// Table to export; every table when absent.
    pub table: Option<String>,
    /// JSON output instead of tab-separated values.
    pub json: bool,
}

/// Render a typed value for line-oriented output.
pub(crate) fn typed_to_display(value: &TypedValue) -> String {
    match value {
        TypedValue::Null => "NULL".to_string(),
        TypedValue::Bool(value) => value.to_string(),
        TypedValue::Int(value) => value.to_string(),
        TypedValue::Uint(value) => value.to_string(),
        TypedValue::Float(value) => value.to_string(),
        TypedValue::Double(value) => value.to_string(),
        TypedValue::DateTime(value) => {
            if value.looks_like_filetime() {
                if let Some(datetime) =
                    chrono::DateTime::from_timestamp(value.filetime_as_unix_seconds(), 0)
                {
                    return datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string();
                }
            }
            format!("{} days (raw 0x{:016x})", value.as_oadate(), value.raw)
        }
        TypedValue::Text(value) => value.clone(),
        TypedValue::Guid(value) => value.clone(),
        TypedValue::Bytes(bytes) => format_bytes(bytes),
        TypedValue::Multi(values) => {
            let parts: Vec<String> = values.iter().map(typed_to_display).collect();
            parts.join(";")
        }
    }
}

fn export_table(table: &Table<'_>, json: bool, writer: &mut dyn Write) -> Result<(), EseError> {
    let columns: Vec<_> = table.columns().cloned().collect();

    if json {
        let mut rows = Vec::new();
        for record in table.records()? {
            let record = record?;
            let mut row = serde_json::Map::new();
            for column in &columns {
                let value = record.value(column.id)?;
                row.insert(
                    column.name.clone(),
                    serde_json::to_value(value.typed()).map_err(|e| EseError::Io(e.to_string()))?,
                );
            }
            rows.push(serde_json::Value::Object(row));
        }
        let document = serde_json::json!({ "table": table.name(), "rows": rows });
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| EseError::Io(e.to_string()))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    // TSV: header line, then one line per record.
    let header: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
    wprintln!(writer, "# table {}", table.name())?;
    wprintln!(writer, "{}", header.join("\t"))?;
    for record in table.records()? {
        let record = record?;
        let mut fields = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = record.value(column.id)?;
            fields.push(typed_to_display(&value.typed()));
        }
        wprintln!(writer, "{}", fields.join("\t"))?;
    }
    Ok(())
}

/// Export one table (or every table) as JSON or TSV.
pub fn execute(opts: &ExportOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    let db = EseDatabase::open(&opts.file)?;

    match &opts.table {
        Some(name) => {
            let table = db
                .table_by_name(name)?
                .ok_or_else(|| EseError::CatalogMissing(format!("no table named {}", name)))?;
            export_table(&table, opts.json, writer)
        }
        None => {
            for table in db.tables()? {
                export_table(&table, opts.json, writer)?;
                wprintln!(writer)?;
            }
            Ok(())
        }
    }
}
