use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::cli::wprintln;
use crate::ese::database::EseDatabase;
use crate::util::hex::hex_dump;
use crate::EseError;

/// Options for the `ese dump` subcommand.
pub struct DumpOptions {
    /// Path to the ESE database file.
    pub file: String,
    /// Page number to dump (defaults to page 1).
    pub page: Option<u32>,
    /// Absolute byte offset to start dumping (bypasses page mode).
    pub offset: Option<u64>,
    /// Number of bytes to dump.
    pub length: Option<usize>,
    /// Output raw binary bytes instead of a formatted hex dump.
    pub raw: bool,
}

/// Produce a hex dump of raw bytes from a database file.
///
/// Page mode reads the page without checksum validation, so corrupt
/// pages can still be inspected. Offset mode reads from an arbitrary
/// file position, which is how the header blocks are examined.
pub fn execute(opts: &DumpOptions, writer: &mut dyn Write) -> Result<(), EseError> {
    if let Some(offset) = opts.offset {
        return dump_at_offset(&opts.file, offset, opts.length.unwrap_or(256), opts.raw, writer);
    }

    let db = EseDatabase::open(&opts.file)?;
    let page_number = opts.page.unwrap_or(1);
    let data = db.read_page_raw(page_number)?;
    let length = opts.length.unwrap_or(data.len()).min(data.len());
    let base_offset = db.format().page_offset(page_number);

    if opts.raw {
        writer
            .write_all(&data[..length])
            .map_err(|e| EseError::Io(e.to_string()))?;
    } else {
        wprintln!(
            writer,
            "Hex dump of {} page {} ({} bytes):",
            opts.file,
            page_number,
            length
        )?;
        wprintln!(writer)?;
        wprintln!(writer, "{}", hex_dump(&data[..length], base_offset))?;
    }
    Ok(())
}

fn dump_at_offset(
    file: &str,
    offset: u64,
    length: usize,
    raw: bool,
    writer: &mut dyn Write,
) -> Result<(), EseError> {
    let mut handle =
        File::open(file).map_err(|e| EseError::Io(format!("Cannot open {}: {}", file, e)))?;
    let file_size = handle
        .metadata()
        .map_err(|e| EseError::Io(format!("Cannot stat {}: {}", file, e)))?
        .len();
    if offset >= file_size {
        return Err(EseError::Io(format!(
            "offset {} past end of {}-byte file",
            offset, file_size
        )));
    }

    let length = length.min((file_size - offset) as usize);
    let mut data = vec![0u8; length];
    handle
        .seek(SeekFrom::Start(offset))
        .and_then(|_| handle.read_exact(&mut data))
        .map_err(|e| EseError::Io(format!("Cannot read {}: {}", file, e)))?;

    if raw {
        writer
            .write_all(&data)
            .map_err(|e| EseError::Io(e.to_string()))?;
    } else {
        wprintln!(writer, "Hex dump of {} at offset {} ({} bytes):", file, offset, length)?;
        wprintln!(writer)?;
        wprintln!(writer, "{}", hex_dump(&data, offset))?;
    }
    Ok(())
}
