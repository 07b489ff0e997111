//! ESE database file header parsing.
//!
//! The database begins with two 2-KiB header blocks: the primary header
//! at offset 0 and a shadow copy at offset `page_size`. Each block starts
//! with an XOR-32 checksum of the rest of the block. The primary header
//! is authoritative; when its checksum fails the shadow is used instead,
//! and when both fail the file is rejected as corrupt.
//!
//! Because the page size is itself a header field, the shadow offset is
//! only known after the primary has been read. [`read_headers`] handles
//! the bootstrap: read 2 KiB at offset 0, extract a page size candidate,
//! then locate and validate the shadow.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::ese::checksum::header_checksum;
use crate::ese::constants::*;
use crate::ese::io::ReadAt;
use crate::EseError;

/// File type declared in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    /// Regular database file.
    Database,
    /// Streaming file (`.stm`).
    StreamingFile,
}

impl FileType {
    fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(FileType::Database),
            1 => Some(FileType::StreamingFile),
            _ => None,
        }
    }
}

/// Database state declared in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatabaseState {
    JustCreated,
    DirtyShutdown,
    CleanShutdown,
    BeingConverted,
    ForceDetach,
    Unknown(u32),
}

impl DatabaseState {
    fn from_u32(value: u32) -> Self {
        match value {
            1 => DatabaseState::JustCreated,
            2 => DatabaseState::DirtyShutdown,
            3 => DatabaseState::CleanShutdown,
            4 => DatabaseState::BeingConverted,
            5 => DatabaseState::ForceDetach,
            other => DatabaseState::Unknown(other),
        }
    }

    /// Human-readable state name as shown by `ese parse`.
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseState::JustCreated => "just created",
            DatabaseState::DirtyShutdown => "dirty shutdown",
            DatabaseState::CleanShutdown => "clean shutdown",
            DatabaseState::BeingConverted => "being converted",
            DatabaseState::ForceDetach => "force detach",
            DatabaseState::Unknown(_) => "unknown",
        }
    }
}

/// Parsed file header.
#[derive(Debug, Clone, Serialize)]
pub struct FileHeader {
    /// XOR checksum stored in the header block.
    pub checksum: u32,
    /// File signature (must be 0x89abcdef).
    pub signature: u32,
    /// Format version (0x620 for all supported files).
    pub format_version: u32,
    /// Creation format revision (0x0b, 0x0c, 0x11, 0x14).
    pub format_revision: u32,
    /// File type.
    pub file_type: FileType,
    /// Database time counter at last modification.
    pub database_time: u64,
    /// Database state.
    pub database_state: DatabaseState,
    /// Log position at the last consistent shutdown.
    pub consistent_position: u64,
    /// Log position at attach.
    pub attach_position: u64,
    /// Log position at detach.
    pub detach_position: u64,
    /// Shadowing-disabled flag.
    pub shadowing_disabled: bool,
    /// Last object identifier handed out by the engine.
    pub last_object_id: u32,
    /// Page size in bytes.
    pub page_size: u32,
    /// Repair count.
    pub repair_count: u32,
}

impl FileHeader {
    /// Parse a 2-KiB header block without validating its checksum.
    ///
    /// Signature, format version, file type and page size are validated
    /// here; checksum validation is the caller's job so the
    /// primary/shadow fallback can distinguish "corrupt" from
    /// "unsupported".
    pub fn parse(block: &[u8]) -> Result<Self, EseError> {
        if block.len() < FILE_HEADER_BLOCK_SIZE {
            return Err(EseError::CorruptHeader(format!(
                "header block truncated at {} bytes",
                block.len()
            )));
        }

        let signature = LittleEndian::read_u32(&block[HDR_SIGNATURE..]);
        if signature != ESEDB_SIGNATURE {
            return Err(EseError::UnsupportedFormat(format!(
                "bad file signature 0x{:08x}",
                signature
            )));
        }

        let format_version = LittleEndian::read_u32(&block[HDR_FORMAT_VERSION..]);
        if format_version != FORMAT_VERSION {
            return Err(EseError::UnsupportedFormat(format!(
                "format version 0x{:x} not supported",
                format_version
            )));
        }

        let file_type_raw = LittleEndian::read_u32(&block[HDR_FILE_TYPE..]);
        let file_type = FileType::from_u32(file_type_raw).ok_or_else(|| {
            EseError::UnsupportedFormat(format!("file type {} not supported", file_type_raw))
        })?;

        let page_size = LittleEndian::read_u32(&block[HDR_PAGE_SIZE..]);
        if !SUPPORTED_PAGE_SIZES.contains(&page_size) {
            return Err(EseError::UnsupportedFormat(format!(
                "page size {} not supported",
                page_size
            )));
        }

        let format_revision = LittleEndian::read_u32(&block[HDR_FORMAT_REVISION..]);
        if format_revision > FORMAT_REVISION_MAX {
            return Err(EseError::UnsupportedFormat(format!(
                "format revision 0x{:x} newer than 0x{:x}",
                format_revision, FORMAT_REVISION_MAX
            )));
        }

        Ok(FileHeader {
            checksum: LittleEndian::read_u32(&block[HDR_CHECKSUM..]),
            signature,
            format_version,
            format_revision,
            file_type,
            database_time: LittleEndian::read_u64(&block[HDR_DATABASE_TIME..]),
            database_state: DatabaseState::from_u32(LittleEndian::read_u32(
                &block[HDR_DATABASE_STATE..],
            )),
            consistent_position: LittleEndian::read_u64(&block[HDR_CONSISTENT_POSITION..]),
            attach_position: LittleEndian::read_u64(&block[HDR_ATTACH_POSITION..]),
            detach_position: LittleEndian::read_u64(&block[HDR_DETACH_POSITION..]),
            shadowing_disabled: LittleEndian::read_u32(&block[HDR_SHADOWING_DISABLED..]) != 0,
            last_object_id: LittleEndian::read_u32(&block[HDR_LAST_OBJECT_ID..]),
            page_size,
            repair_count: LittleEndian::read_u32(&block[HDR_REPAIR_COUNT..]),
        })
    }

    /// Whether pages in this file carry the XOR+ECC checksum pair.
    pub fn uses_ecc_checksum(&self) -> bool {
        self.format_revision >= FORMAT_REVISION_NEW_CHECKSUM
    }

    /// Whether pages use the 80-byte extended header.
    pub fn extended_page_header(&self) -> bool {
        self.page_size >= 16384 || self.format_revision >= FORMAT_REVISION_EXTENDED_PAGE_HEADER
    }
}

fn block_checksum_ok(block: &[u8]) -> bool {
    LittleEndian::read_u32(&block[HDR_CHECKSUM..]) == header_checksum(block)
}

/// Read and select the authoritative file header.
///
/// Returns the chosen header plus whether the shadow was used. The
/// primary wins when its checksum validates; otherwise the shadow wins
/// unconditionally. When both validate they must agree on page size and
/// format version.
pub fn read_headers(backend: &mut dyn ReadAt) -> Result<(FileHeader, bool), EseError> {
    let mut primary_block = vec![0u8; FILE_HEADER_BLOCK_SIZE];
    backend.read_at(0, &mut primary_block)?;

    let primary_ok = block_checksum_ok(&primary_block);
    let primary = if primary_ok {
        Some(FileHeader::parse(&primary_block)?)
    } else {
        None
    };

    // The shadow lives at offset page_size. Without a trustworthy primary
    // the page size is unknown, so probe every supported size.
    let shadow_offsets: Vec<u64> = match &primary {
        Some(header) => vec![u64::from(header.page_size)],
        None => SUPPORTED_PAGE_SIZES.iter().map(|&s| u64::from(s)).collect(),
    };

    let mut shadow = None;
    let mut shadow_block = vec![0u8; FILE_HEADER_BLOCK_SIZE];
    for offset in shadow_offsets {
        if backend.read_at(offset, &mut shadow_block).is_err() {
            continue;
        }
        if !block_checksum_ok(&shadow_block) {
            continue;
        }
        if let Ok(header) = FileHeader::parse(&shadow_block) {
            // A shadow found by probing must name the offset it was
            // found at, or it is a false positive inside page data.
            if primary.is_some() || u64::from(header.page_size) == offset {
                shadow = Some(header);
                break;
            }
        }
    }

    match (primary, shadow) {
        (Some(primary), Some(shadow)) => {
            if primary.page_size != shadow.page_size
                || primary.format_version != shadow.format_version
            {
                return Err(EseError::CorruptHeader(format!(
                    "primary and shadow header disagree: page size {} vs {}, version 0x{:x} vs 0x{:x}",
                    primary.page_size, shadow.page_size,
                    primary.format_version, shadow.format_version
                )));
            }
            Ok((primary, false))
        }
        (Some(primary), None) => Ok((primary, false)),
        (None, Some(shadow)) => {
            log::warn!(
                "primary file header checksum mismatch, continuing from shadow header \
                 (page size {}, revision 0x{:x})",
                shadow.page_size,
                shadow.format_revision
            );
            Ok((shadow, true))
        }
        (None, None) => Err(EseError::CorruptHeader(
            "both primary and shadow header checksums failed".to_string(),
        )),
    }
}
