use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::util::fs::find_ese_files;
use crate::EseError;

/// Options for the `ese find` subcommand.
pub struct FindOptions {
    /// Directory to search.
    pub dir: String,
    /// Open each hit and report its geometry.
    pub verbose: bool,
    /// Emit JSON instead of formatted text.
    pub json: bool,
}

#[derive(Serialize)]
struct FindReport {
    path: String,
    page_size: Option<u32>,
    page_count: Option<u32>,
    error: Option<String>,
}

/// Recursively search a directory for ESE database files by signature.
pub fn execute(opts: &FindOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    let files = find_ese_files(Path::new(&opts.dir))?;

    let mut reports = Vec::with_capacity(files.len());
    for path in &files {
        let mut report = FindReport {
            path: path.display().to_string(),
            page_size: None,
            page_count: None,
            error: None,
        };
        if opts.verbose || opts.json {
            match EseDatabase::open(path) {
                Ok(db) => {
                    report.page_size = Some(db.page_size());
                    report.page_count = Some(db.page_count());
                }
                Err(error) => report.error = Some(error.to_string()),
            }
        }
        reports.push(report);
    }

    if opts.json {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| EseError::Io(e.to_string()))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    for report in &reports {
        match (&report.error, report.page_size) {
            (Some(error), _) => wprintln!(writer, "{}  (unreadable: {})", report.path, error)?,
            (None, Some(page_size)) => wprintln!(
                writer,
                "{}  ({} pages of {} bytes)",
                report.path,
                report.page_count.unwrap_or(0),
                page_size
            )?,
            (None, None) => wprintln!(writer, "{}", report.path)?,
        }
    }
    wprintln!(writer, "{} file(s) found", reports.len())?;
    Ok(())
}
