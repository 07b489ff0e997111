use std::io::Write;

use serde::Serialize;

use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::EseError;

/// Options for the `ese pages` subcommand.
pub struct PagesOptions {
    /// Path to the ESE database file.
    pub file: String,
    /// Restrict output to one page.
    pub page: Option<u32>,
    /// One line per page instead of a block.
    pub list_mode: bool,
    /// Emit JSON instead of formatted text.
    pub json: bool,
}

#[derive(Serialize)]
struct PageReport {
    page: u32,
    flags: String,
    prev_page: u32,
    next_page: u32,
    fdp_object_id: u32,
    available_size: u16,
    tag_count: u16,
    error: Option<String>,
}

/// Show per-page structure: flags, sibling links, tag counts.
pub fn execute(opts: &PagesOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    let db = EseDatabase::open(&opts.file)?;

    let range: Vec<u32> = match opts.page {
        Some(page) => vec![page],
        None => (1..=db.page_count()).collect(),
    };

    let mut reports = Vec::new();
    for page_number in range {
        match db.read_page(page_number) {
            Ok(page) => reports.push(PageReport {
                page: page_number,
                flags: page.header.flags.describe(),
                prev_page: page.header.prev_page,
                next_page: page.header.next_page,
                fdp_object_id: page.header.fdp_object_id,
                available_size: page.header.available_size,
                tag_count: page.header.tag_count,
                error: None,
            }),
            Err(EseError::Closed) => return Err(EseError::Closed),
            Err(error) => reports.push(PageReport {
                page: page_number,
                flags: String::new(),
                prev_page: 0,
                next_page: 0,
                fdp_object_id: 0,
                available_size: 0,
                tag_count: 0,
                error: Some(error.to_string()),
            }),
        }
    }

    if opts.json {
        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| EseError::Io(e.to_string()))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    for report in &reports {
        if let Some(error) = &report.error {
            wprintln!(writer, "page {:>6}: {}", report.page, error)?;
            continue;
        }
        if opts.list_mode {
            wprintln!(
                writer,
                "page {:>6}: {:<40} prev={:<6} next={:<6} tags={}",
                report.page,
                report.flags,
                report.prev_page,
                report.next_page,
                report.tag_count
            )?;
        } else {
            wprintln!(writer, "page {}", report.page)?;
            wprintln!(writer, "  flags:          {}", report.flags)?;
            wprintln!(writer, "  prev page:      {}", report.prev_page)?;
            wprintln!(writer, "  next page:      {}", report.next_page)?;
            wprintln!(writer, "  fdp object id:  {}", report.fdp_object_id)?;
            wprintln!(writer, "  available size: {}", report.available_size)?;
            wprintln!(writer, "  tag count:      {}", report.tag_count)?;
            wprintln!(writer)?;
        }
    }
    Ok(())
}
