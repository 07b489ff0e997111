use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::EseError;

/// Options for the `ese tables` subcommand.
pub struct TablesOptions {
    /// Path to the ESE database file.
    pub file: String,
    /// Show column and index detail.
    pub verbose: bool,
    /// Emit JSON instead of formatted text.
    pub json: bool,
}

#[derive(Serialize)]
struct ColumnReport {
    id: u32,
    name: String,
    column_type: &'static str,
    codepage: u32,
}

#[derive(Serialize)]
struct IndexReport {
    name: String,
    root_page: u32,
}

#[derive(Serialize)]
struct TableReport {
    id: u32,
    name: String,
    data_root: u32,
    long_value_root: u32,
    template_table_id: u32,
    columns: Vec<ColumnReport>,
    indexes: Vec<IndexReport>,
}

/// List every table in the catalog with its columns and indexes.
pub fn execute(opts: &TablesOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    let db = EseDatabase::open(&opts.file)?;
    let tables = db.tables()?;

    let reports: Vec<TableReport> = tables
        .iter()
        .map(|table| {
            let schema = table.schema();
            TableReport {
                id: schema.id,
                name: schema.name.clone(),
                data_root: schema.data_root,
                long_value_root: schema.long_value_root,
                template_table_id: schema.template_table_id,
                columns: schema
                    .columns()
                    .map(|column| ColumnReport {
                        id: column.id,
                        name: column.name.clone(),
                        column_type: column.column_type.name(),
                        codepage: column.codepage,
                    })
                    .collect(),
                indexes: schema
                    .indexes
                    .iter()
                    .map(|index| IndexReport {
                        name: index.name.clone(),
                        root_page: index.root_page,
                    })
                    .collect(),
            }
        })
        .collect();

    if opts.json {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| EseError::Io(e.to_string()))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    wprintln!(writer, "{} table(s) in {}", reports.len(), opts.file)?;
    wprintln!(writer)?;
    for report in &reports {
        wprintln!(
            writer,
            "{} (id {}, data root {}, {} column(s), {} index(es))",
            report.name.bold(),
            report.id,
            report.data_root,
            report.columns.len(),
            report.indexes.len()
        )?;
        if opts.verbose {
            for column in &report.columns {
                let codepage = if column.codepage != 0 {
                    format!(" cp={}", column.codepage)
                } else {
                    String::new()
                };
                wprintln!(
                    writer,
                    "    column {:>4}  {:<24} {}{}",
                    column.id,
                    column.name,
                    column.column_type,
                    codepage
                )?;
            }
            for index in &report.indexes {
                wprintln!(
                    writer,
                    "    index  {:<24} root {}",
                    index.name,
                    index.root_page
                )?;
            }
        }
    }
    Ok(())
}
