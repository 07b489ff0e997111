use std::io::Write;

use colored::Colorize;

use crate::cli::export::typed_to_display;
use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::EseError;

/// Options for the `ese records` subcommand.
pub struct RecordsOptions {
    /// Path to the ESE database file.
    pub file: String,
    /// Table to read.
    pub table: String,
    /// Stop after this many records.
    pub limit: Option<u64>,
    /// Emit JSON instead of formatted text.
    pub json: bool,
}

/// Decode and display a table's records in primary-key order.
pub fn execute(opts: &RecordsOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    let db = EseDatabase::open(&opts.file)?;
    let table = db
        .table_by_name(&opts.table)?
        .ok_or_else(|| EseError::CatalogMissing(format!("no table named {}", opts.table)))?;

    let columns: Vec<_> = table.columns().cloned().collect();
    let mut shown = 0u64;

    if opts.json {
        let mut rows = Vec::new();
        for record in table.records()? {
            let record = record?;
            let mut row = serde_json::Map::new();
            for column in &columns {
                let value = record.value(column.id)?;
                let json = serde_json::to_value(value.typed())
                    .map_err(|e| EseError::Io(e.to_string()))?;
                row.insert(column.name.clone(), json);
            }
            rows.push(serde_json::Value::Object(row));
            shown += 1;
            if opts.limit.is_some_and(|limit| shown >= limit) {
                break;
            }
        }
        let json = serde_json::to_string_pretty(&rows).map_err(|e| EseError::Io(e.to_string()))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    for record in table.records()? {
        let record = record?;
        wprintln!(
            writer,
            "{}",
            format!("record key {}", crate::util::hex::format_bytes(record.key())).bold()
        )?;
        for column in &columns {
            let value = record.value(column.id)?;
            if value.is_null() {
                continue;
            }
            wprintln!(
                writer,
                "  {:<24} {}",
                column.name,
                typed_to_display(&value.typed())
            )?;
        }
        wprintln!(writer)?;
        shown += 1;
        if opts.limit.is_some_and(|limit| shown >= limit) {
            break;
        }
    }
    wprintln!(writer, "{} record(s)", shown)?;
    Ok(())
}
