use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::EseError;

/// Options for the `ese parse` subcommand.
pub struct ParseOptions {
    /// Path to the ESE database file.
    pub file: String,
    /// Show per-page detail in addition to the summary.
    pub verbose: bool,
    /// Emit JSON instead of formatted text.
    pub json: bool,
}

#[derive(Serialize)]
struct ParseReport<'a> {
    file: &'a str,
    page_size: u32,
    page_count: u32,
    format_version: u32,
    format_revision: u32,
    database_state: &'static str,
    used_shadow_header: bool,
    pages: PageSummary,
}

#[derive(Default, Serialize)]
struct PageSummary {
    root: u64,
    leaf: u64,
    branch: u64,
    empty: u64,
    space_tree: u64,
    index: u64,
    long_value: u64,
    unreadable: u64,
}

/// Parse a database file and display the header plus a page summary.
///
/// Every page is read through the validating pager; pages that fail
/// their checksum are counted as unreadable rather than aborting the
/// whole summary.
pub fn execute(opts: &ParseOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    let db = EseDatabase::open(&opts.file)?;
    let header = db.header();

    let mut summary = PageSummary::default();
    for page_number in 1..=db.page_count() {
        match db.read_page(page_number) {
            Ok(page) => {
                let flags = page.header.flags;
                if flags.is_root() {
                    summary.root += 1;
                }
                if flags.is_leaf() {
                    summary.leaf += 1;
                } else {
                    summary.branch += 1;
                }
                if flags.is_empty_page() {
                    summary.empty += 1;
                }
                if flags.is_space_tree() {
                    summary.space_tree += 1;
                }
                if flags.is_index() {
                    summary.index += 1;
                }
                if flags.is_long_value() {
                    summary.long_value += 1;
                }
                if opts.verbose && !opts.json {
                    wprintln!(
                        writer,
                        "  page {:>6}: {}",
                        page_number,
                        flags.describe()
                    )?;
                }
            }
            Err(EseError::Closed) => return Err(EseError::Closed),
            Err(_) => summary.unreadable += 1,
        }
    }

    if opts.json {
        let report = ParseReport {
            file: &opts.file,
            page_size: db.page_size(),
            page_count: db.page_count(),
            format_version: header.format_version,
            format_revision: header.format_revision,
            database_state: header.database_state.name(),
            used_shadow_header: db.used_shadow_header(),
            pages: summary,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| EseError::Io(e.to_string()))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    wprintln!(writer, "{}", format!("ESE database: {}", opts.file).bold())?;
    wprintln!(writer)?;
    wprintln!(writer, "  format version:  0x{:x}", header.format_version)?;
    wprintln!(writer, "  format revision: 0x{:x}", header.format_revision)?;
    wprintln!(writer, "  page size:       {}", db.page_size())?;
    wprintln!(writer, "  page count:      {}", db.page_count())?;
    wprintln!(writer, "  database state:  {}", header.database_state.name())?;
    if db.used_shadow_header() {
        wprintln!(writer, "  {}", "primary header corrupt, shadow header in use".yellow())?;
    }
    wprintln!(writer)?;
    wprintln!(writer, "  root pages:       {:>8}", summary.root)?;
    wprintln!(writer, "  leaf pages:       {:>8}", summary.leaf)?;
    wprintln!(writer, "  branch pages:     {:>8}", summary.branch)?;
    wprintln!(writer, "  empty pages:      {:>8}", summary.empty)?;
    wprintln!(writer, "  space tree pages: {:>8}", summary.space_tree)?;
    wprintln!(writer, "  index pages:      {:>8}", summary.index)?;
    wprintln!(writer, "  long value pages: {:>8}", summary.long_value)?;
    if summary.unreadable > 0 {
        wprintln!(
            writer,
            "  {}",
            format!("unreadable pages: {:>8}", summary.unreadable).red()
        )?;
    }

    Ok(())
}
