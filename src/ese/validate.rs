//! Whole-database structural validation.
//!
//! [`validate_database`] sweeps the file twice. The physical pass reads
//! every page raw, verifies its checksum(s), and parses the header to
//! cross-check sibling links: a page naming a `next_page` must be named
//! back by that page's `prev_page`, and vice versa. The logical pass
//! resolves the catalog and walks every table's data, long-value, and
//! index trees with a cursor, so key-order violations, cycles, truncated
//! records, and dangling long-value references all surface as findings.
//!
//! Findings are collected into a [`ValidationReport`] rather than
//! aborting on the first problem; only a handle-level failure (I/O)
//! stops the sweep.

use serde::Serialize;

use crate::ese::btree::BTreeCursor;
use crate::ese::database::EseDatabase;
use crate::ese::longvalue::long_value_info;
use crate::ese::page::PageHeader;
use crate::ese::record::{parse_record, RecordValue};
use crate::ese::space::read_space_tree;
use crate::EseError;

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    /// Page checksum mismatch.
    Checksum,
    /// Sibling links are not symmetric.
    SiblingLink,
    /// A tree root recorded in the catalog is out of range.
    CatalogReference,
    /// A tree walk failed (cycle, key order, page type, record decode).
    TreeStructure,
    /// A record references a long value the tree does not resolve.
    LongValueReference,
}

/// One validation finding.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Category.
    pub kind: IssueKind,
    /// Offending page, when known.
    pub page: Option<u32>,
    /// Containing table, when known.
    pub table: Option<String>,
    /// Human-readable detail.
    pub detail: String,
}

/// Outcome of a database validation sweep.
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    /// Pages examined in the physical pass.
    pub pages_checked: u32,
    /// Pages whose checksums failed.
    pub pages_bad_checksum: u32,
    /// Pages whose corruption the ECC located as a single flipped bit.
    pub correctable_pages: Vec<u32>,
    /// Tables whose trees were walked.
    pub tables_checked: u32,
    /// Records decoded across all tables.
    pub records_checked: u64,
    /// All findings, physical then logical.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when no finding was recorded.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, kind: IssueKind, page: Option<u32>, table: Option<&str>, detail: String) {
        self.issues.push(ValidationIssue {
            kind,
            page,
            table: table.map(|name| name.to_string()),
            detail,
        });
    }
}

/// Validate every page and every catalogued tree of a database.
pub fn validate_database(db: &EseDatabase) -> Result<ValidationReport, EseError> {
    let mut report = ValidationReport::default();
    physical_pass(db, &mut report)?;
    logical_pass(db, &mut report)?;
    Ok(report)
}

/// Checksum every page and cross-check sibling links.
fn physical_pass(db: &EseDatabase, report: &mut ValidationReport) -> Result<(), EseError> {
    let page_count = db.page_count();
    let mut headers: Vec<Option<PageHeader>> = Vec::with_capacity(page_count as usize);

    for page_number in 1..=page_count {
        let buffer = db.read_page_raw(page_number)?;
        report.pages_checked += 1;

        let verification = db.verify_page_buffer(&buffer, page_number);
        if !verification.valid {
            report.pages_bad_checksum += 1;
            if let Some(bit) = verification.correctable_bit {
                report.correctable_pages.push(page_number);
                report.push(
                    IssueKind::Checksum,
                    Some(page_number),
                    None,
                    format!("single-bit error at bit offset {} (ECC-correctable)", bit),
                );
            } else {
                report.push(
                    IssueKind::Checksum,
                    Some(page_number),
                    None,
                    format!(
                        "checksum mismatch (stored 0x{:08x}, calculated 0x{:08x})",
                        verification.stored_xor, verification.calculated_xor
                    ),
                );
            }
            headers.push(None);
            continue;
        }

        headers.push(PageHeader::parse(&buffer, db.format()).ok());
    }

    // Sibling symmetry: next/prev must reference each other.
    for (index, header) in headers.iter().enumerate() {
        let page_number = index as u32 + 1;
        let Some(header) = header else { continue };

        for (link, named, expect_back) in [
            ("next", header.next_page, "prev"),
            ("prev", header.prev_page, "next"),
        ] {
            if named == 0 {
                continue;
            }
            if named > page_count {
                report.push(
                    IssueKind::SiblingLink,
                    Some(page_number),
                    None,
                    format!("{} sibling {} is out of range", link, named),
                );
                continue;
            }
            let Some(other) = headers[named as usize - 1].as_ref() else {
                continue;
            };
            let back = if link == "next" {
                other.prev_page
            } else {
                other.next_page
            };
            if back != page_number {
                report.push(
                    IssueKind::SiblingLink,
                    Some(page_number),
                    None,
                    format!(
                        "{} sibling {} does not name this page as its {} (names {})",
                        link, named, expect_back, back
                    ),
                );
            }
        }
    }
    Ok(())
}

/// Walk every catalogued tree.
fn logical_pass(db: &EseDatabase, report: &mut ValidationReport) -> Result<(), EseError> {
    let tables = match db.tables() {
        Ok(tables) => tables,
        Err(error) => {
            report.push(
                IssueKind::CatalogReference,
                None,
                None,
                format!("catalog resolution failed: {}", error),
            );
            return Ok(());
        }
    };

    let page_count = db.page_count();
    for table in &tables {
        let schema = table.schema();
        report.tables_checked += 1;

        let mut roots = vec![("data tree", schema.data_root)];
        if schema.long_value_root != 0 {
            roots.push(("long-value tree", schema.long_value_root));
        }
        for index in &schema.indexes {
            roots.push(("index tree", index.root_page));
        }
        for (what, root) in &roots {
            if *root == 0 || *root > page_count {
                report.push(
                    IssueKind::CatalogReference,
                    Some(*root),
                    Some(&schema.name),
                    format!("{} root {} is out of range", what, root),
                );
            }
        }

        if schema.data_root == 0 || schema.data_root > page_count {
            continue;
        }
        check_space_trees(db, report, &schema.name, schema.data_root);
        walk_table(db, report, table);
    }
    Ok(())
}

/// Verify the space trees a multiple-extent root declares. The space
/// tree root page and the one following it hold the owned and available
/// extents respectively.
fn check_space_trees(db: &EseDatabase, report: &mut ValidationReport, table: &str, root: u32) {
    let page = match db.read_page(root) {
        Ok(page) => page,
        Err(_) => return,
    };
    let Some(root_header) = page.root_header else {
        return;
    };
    if root_header.extent_space == 0 || root_header.space_tree_page == 0 {
        return;
    }
    for space_root in [root_header.space_tree_page, root_header.space_tree_page + 1] {
        if space_root > db.page_count() {
            report.push(
                IssueKind::CatalogReference,
                Some(space_root),
                Some(table),
                "space tree root is out of range".to_string(),
            );
            continue;
        }
        if let Err(error) = read_space_tree(db, space_root) {
            report.push(
                IssueKind::TreeStructure,
                Some(space_root),
                Some(table),
                format!("space tree walk failed: {}", error),
            );
        }
    }
}

/// Scan one table's records, resolving long-value references without
/// materializing them.
fn walk_table(
    db: &EseDatabase,
    report: &mut ValidationReport,
    table: &crate::ese::table::Table<'_>,
) {
    let schema = table.schema();
    let mut cursor = match BTreeCursor::seek_first(db, schema.data_root) {
        Ok(cursor) => cursor,
        Err(error) => {
            report.push(
                IssueKind::TreeStructure,
                Some(schema.data_root),
                Some(&schema.name),
                format!("cannot open data tree: {}", error),
            );
            return;
        }
    };

    loop {
        let entry = match cursor.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                report.push(
                    IssueKind::TreeStructure,
                    error_page(&error),
                    Some(&schema.name),
                    error.to_string(),
                );
                return;
            }
        };

        let record = match parse_record(&entry.data, schema, entry.page_flags.new_record_format())
        {
            Ok(record) => record,
            Err(error) => {
                report.push(
                    IssueKind::TreeStructure,
                    Some(entry.page_number),
                    Some(&schema.name),
                    format!("record decode failed: {}", error),
                );
                continue;
            }
        };
        report.records_checked += 1;

        for column_id in record.present_columns() {
            if let RecordValue::LongValueRef { id, .. } = record.value(column_id) {
                if let Err(error) = long_value_info(db, schema.long_value_root, *id) {
                    report.push(
                        IssueKind::LongValueReference,
                        Some(entry.page_number),
                        Some(&schema.name),
                        format!("column {}: {}", column_id, error),
                    );
                }
            }
        }
    }
}

fn error_page(error: &EseError) -> Option<u32> {
    match error {
        EseError::PageCorrupt { page, .. }
        | EseError::TreeCycle { page }
        | EseError::KeyOrderViolation { page }
        | EseError::PageTypeMismatch { page, .. } => Some(*page),
        _ => None,
    }
}
