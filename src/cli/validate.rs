use std::io::Write;

use colored::Colorize;

use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::ese::validate::validate_database;
use crate::EseError;

/// Options for the `ese validate` subcommand.
pub struct ValidateOptions {
    /// Path to the ESE database file.
    pub file: String,
    /// Emit JSON instead of formatted text.
    pub json: bool,
}

/// Run the full physical + logical validation sweep and report findings.
pub fn execute(opts: &ValidateOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    let db = EseDatabase::open(&opts.file)?;
    let report = validate_database(&db)?;

    if opts.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| EseError::Io(e.to_string()))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    wprintln!(writer, "Validation of {}", opts.file)?;
    wprintln!(writer)?;
    wprintln!(writer, "  pages checked:   {}", report.pages_checked)?;
    wprintln!(writer, "  bad checksums:   {}", report.pages_bad_checksum)?;
    wprintln!(writer, "  tables checked:  {}", report.tables_checked)?;
    wprintln!(writer, "  records checked: {}", report.records_checked)?;
    if !report.correctable_pages.is_empty() {
        wprintln!(
            writer,
            "  {}",
            format!(
                "{} page(s) carry a single-bit error the ECC can locate",
                report.correctable_pages.len()
            )
            .yellow()
        )?;
    }
    wprintln!(writer)?;

    for issue in &report.issues {
        let location = match (issue.page, &issue.table) {
            (Some(page), Some(table)) => format!("page {} ({})", page, table),
            (Some(page), None) => format!("page {}", page),
            (None, Some(table)) => format!("table {}", table),
            (None, None) => "database".to_string(),
        };
        wprintln!(writer, "  {:?}: {}: {}", issue.kind, location, issue.detail)?;
    }

    if report.is_clean() {
        wprintln!(writer, "{}", "No structural issues found".green())?;
    } else {
        wprintln!(
            writer,
            "{}",
            format!("{} issue(s) found", report.issues.len()).red()
        )?;
    }
    Ok(())
}
