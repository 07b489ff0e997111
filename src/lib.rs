//! ESE database file analysis toolkit.
//!
//! The `esedb-utils` crate (library name `ese`) provides Rust types and
//! functions for opening and inspecting Extensible Storage Engine (ESE)
//! database files (`.edb`) — the on-disk container used by Active
//! Directory (`ntds.dit`), Windows Search, and Exchange. The library is
//! strictly read-only: it validates headers and per-page checksums,
//! walks the B⁺-trees, resolves the catalog, and decodes records, long
//! values, and multi-values. There is no write path and no log replay.
//!
//! # CLI Reference
//!
//! Install the `ese` binary and use its subcommands to inspect ESE files
//! from the command line.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `ese parse` | File header summary and per-page-type counts |
//! | `ese pages` | Detailed page structure analysis |
//! | `ese dump` | Hex dump of raw page bytes |
//! | `ese checksum` | Validate page checksums (XOR-32 / ECC-32) |
//! | `ese tables` | List tables, columns, and indexes from the catalog |
//! | `ese records` | Decode and display a table's records |
//! | `ese export` | Export table data as JSON or TSV |
//! | `ese validate` | Physical + logical structure validation |
//! | `ese find` | Search a directory for ESE files by signature |
//!
//! All subcommands accept `--color <auto|always|never>` and
//! `--output <file>`; most accept `--json`.
//!
//! # Library API
//!
//! ```no_run
//! use ese::ese::database::EseDatabase;
//!
//! let db = EseDatabase::open("ntds.dit").unwrap();
//! println!("page size: {}", db.page_size());
//!
//! for table in db.tables().unwrap() {
//!     println!("{} ({} columns)", table.name(), table.column_count());
//! }
//!
//! let people = db.table_by_name("People").unwrap().expect("table exists");
//! for record in people.records().unwrap() {
//!     let record = record.unwrap();
//!     let name = record.value_by_name("name").unwrap();
//!     println!("{:?}", name.typed());
//! }
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`ese::database`] | Pager: open, header fallback, validated page reads |
//! | [`ese::header`] | 668-byte file header, primary/shadow selection |
//! | [`ese::checksum`] | XOR-32 and ECC-32 page checksums |
//! | [`ese::page`] | Page header, tag table, cell and key assembly |
//! | [`ese::btree`] | B⁺-tree cursor with cycle detection |
//! | [`ese::catalog`] | Catalog tree walk, schema and template resolution |
//! | [`ese::record`] | Fixed/variable/tagged record decoding |
//! | [`ese::longvalue`] | Long-value reassembly and streaming reads |
//! | [`ese::compression`] | 7-bit pack and identity decompression |
//! | [`ese::value`] | Typed views: integers, dates, GUIDs, text codepages |
//! | [`ese::table`] | Public `Table`/`Record`/`Index` handles |
//! | [`ese::space`] | Space tree (extent list) decoding |
//! | [`ese::validate`] | Whole-database structural validation |
//! | [`ese::cache`] | Pin-aware LRU page and record caches |

#[cfg(feature = "cli")]
pub mod cli;
pub mod ese;
pub mod util;

use thiserror::Error;

/// Errors returned by `ese` operations.
///
/// Variants carry the offending page number or object identifier where
/// one is known. Errors are never recovered internally: a bad checksum
/// aborts the containing read, a structural violation terminates the
/// cursor that hit it, and other cursors on the same handle stay usable
/// (except after I/O failure, which closes the handle).
#[derive(Error, Debug)]
pub enum EseError {
    /// A backing read failed or the file is too short.
    #[error("I/O error: {0}")]
    Io(String),

    /// Signature, version, page size, page layout, or flag combination
    /// outside the supported set.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Both file headers failed validation, or they disagree.
    #[error("corrupt file header: {0}")]
    CorruptHeader(String),

    /// Page checksum or self-reference mismatch, or malformed page
    /// structure.
    #[error("page {page} corrupt: {reason}")]
    PageCorrupt { page: u32, reason: String },

    /// A sibling chain revisited a page during one iteration.
    #[error("page tree cycle at page {page}")]
    TreeCycle { page: u32 },

    /// Keys on a page are not monotonically increasing.
    #[error("key order violation on page {page}")]
    KeyOrderViolation { page: u32 },

    /// A page of the wrong kind was found during traversal.
    #[error("unexpected page type at page {page} (flags 0x{flags:08x})")]
    PageTypeMismatch { page: u32, flags: u32 },

    /// A record's declared layout extends past its bytes.
    #[error("record truncated: {0}")]
    RecordTruncated(String),

    /// A referenced long value or one of its segments is absent.
    #[error("long value 0x{id:08x} missing from the long-value tree")]
    LongValueMissing { id: u32 },

    /// Reassembled long value length disagrees with its metadata.
    #[error("long value 0x{id:08x}: reassembled {actual} bytes, declared {declared}")]
    LongValueLengthMismatch { id: u32, actual: u64, declared: u64 },

    /// A column identifier is not part of the table schema.
    #[error("column {column} not in table schema")]
    ColumnIdUnknown { column: u32 },

    /// A compressed value uses a scheme outside the supported set.
    #[error("unsupported compression tag 0x{tag:02x}")]
    UnsupportedCompression { tag: u8 },

    /// The catalog tree is absent or malformed.
    #[error("catalog missing: {0}")]
    CatalogMissing(String),

    /// Template-table references form a cycle.
    #[error("template table cycle involving {0}")]
    TemplateCycle(String),

    /// The same column identifier appears twice after template merge.
    #[error("duplicate column id {column} in table {table}")]
    DuplicateColumnId { table: String, column: u32 },

    /// Operation on a handle past its terminal failed state.
    #[error("database handle is closed")]
    Closed,
}
