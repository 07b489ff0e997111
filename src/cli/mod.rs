//! CLI subcommand implementations for the `ese` binary.
//!
//! CLI argument parsing uses clap derive macros, with the top-level
//! [`app::Cli`] struct and [`app::Commands`] enum defined in [`app`] and
//! shared between `main.rs` and `build.rs` (for man page generation)
//! via `include!()`.
//!
//! Each subcommand module follows the same pattern: an `Options` struct
//! holding the parsed arguments and a
//! `pub fn execute(opts, writer) -> Result<(), EseError>` entry point.
//! The `writer: &mut dyn Write` parameter allows output to be captured
//! in tests or redirected to a file via the global `--output` flag.
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `ese parse` | [`parse`] | File header fields and a page-type summary table |
//! | `ese pages` | [`pages`] | Per-page header and tag structure |
//! | `ese dump` | [`dump`] | Hex dump by page number or absolute offset |
//! | `ese checksum` | [`checksum`] | XOR-32/ECC-32 validation for every page |
//! | `ese tables` | [`tables`] | Catalog listing: tables, columns, indexes |
//! | `ese records` | [`records`] | Decoded records of one table |
//! | `ese export` | [`export`] | Table data as JSON or TSV |
//! | `ese validate` | [`validate`] | Physical + logical structure validation |
//! | `ese find` | [`find`] | Search a directory for ESE files by signature |

pub mod app;
pub mod checksum;
pub mod dump;
pub mod export;
pub mod find;
pub mod pages;
pub mod parse;
pub mod records;
pub mod tables;
pub mod validate;

/// Write a line to the given writer, converting io::Error to EseError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::EseError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::EseError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;
