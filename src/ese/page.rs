//! ESE page header, tag table, and cell parsing.
//!
//! Every page starts with a 40-byte header (80 bytes once the extended
//! header is in effect) followed by cell data growing up from the header
//! and a tag table growing down from the end of the page. Each 4-byte tag
//! names one cell by `(value_offset, value_size)` relative to the end of
//! the header; tag 0 is the page *external* value — the root page header
//! on ROOT pages, the page key prefix everywhere else — and data cells
//! start at tag 1.
//!
//! Tag layout depends on the page size: pages of 8 KiB and below pack
//! 13-bit offset/size fields with three cell-flag bits in the upper bits
//! of each u16; larger pages use 15-bit fields and move the cell flags
//! into the upper three bits of the first u16 of the cell data (masked
//! off whenever a key size is read).
//!
//! [`Page::cell`] assembles the full cell key: on NEW_RECORD_FORMAT pages
//! a cell flagged HAS_COMMON_KEY elides the leading `common_key_size`
//! bytes it shares with the page's key prefix; legacy pages store the
//! whole key inline behind a plain 16-bit size field.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::ese::constants::*;
use crate::ese::header::FileHeader;
use crate::EseError;

/// Per-file format facts the page decoder branches on.
#[derive(Debug, Clone, Copy)]
pub struct FormatInfo {
    /// Page size in bytes.
    pub page_size: u32,
    /// Creation format revision.
    pub format_revision: u32,
    /// Pages carry the XOR+ECC checksum pair.
    pub uses_ecc_checksum: bool,
    /// Pages use the 80-byte extended header.
    pub extended_page_header: bool,
}

impl FormatInfo {
    pub fn from_header(header: &FileHeader) -> Self {
        FormatInfo {
            page_size: header.page_size,
            format_revision: header.format_revision,
            uses_ecc_checksum: header.uses_ecc_checksum(),
            extended_page_header: header.extended_page_header(),
        }
    }

    /// Size of the page header in this file.
    pub fn page_header_size(&self) -> usize {
        if self.extended_page_header {
            PAGE_HEADER_SIZE_EXTENDED
        } else {
            PAGE_HEADER_SIZE
        }
    }

    /// Whether the packed 13-bit tag format is in use.
    pub fn small_page_tags(&self) -> bool {
        self.page_size <= MAX_SMALL_PAGE_SIZE
    }

    /// Physical byte offset of a 1-based page number.
    ///
    /// The first two page-size blocks hold the primary and shadow file
    /// headers, so page 1 starts at `2 * page_size`.
    pub fn page_offset(&self, page_number: u32) -> u64 {
        u64::from(self.page_size) * (1 + u64::from(page_number))
    }
}

/// Page flag bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageFlags(pub u32);

impl PageFlags {
    pub const ROOT: u32 = 0x0001;
    pub const LEAF: u32 = 0x0002;
    pub const PARENT: u32 = 0x0004;
    pub const EMPTY: u32 = 0x0008;
    pub const SPACE_TREE: u32 = 0x0020;
    pub const INDEX: u32 = 0x0040;
    pub const LONG_VALUE: u32 = 0x0080;
    pub const NON_UNIQUE_KEYS: u32 = 0x0400;
    pub const NEW_RECORD_FORMAT: u32 = 0x0800;
    pub const NEW_CHECKSUM_FORMAT: u32 = 0x2000;
    pub const SCRUBBED: u32 = 0x4000;

    pub fn contains(&self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    pub fn is_root(&self) -> bool {
        self.contains(Self::ROOT)
    }

    pub fn is_leaf(&self) -> bool {
        self.contains(Self::LEAF)
    }

    /// Branch pages carry children instead of payloads.
    pub fn is_branch(&self) -> bool {
        !self.is_leaf()
    }

    pub fn is_empty_page(&self) -> bool {
        self.contains(Self::EMPTY)
    }

    pub fn is_space_tree(&self) -> bool {
        self.contains(Self::SPACE_TREE)
    }

    pub fn is_index(&self) -> bool {
        self.contains(Self::INDEX)
    }

    pub fn is_long_value(&self) -> bool {
        self.contains(Self::LONG_VALUE)
    }

    /// Primary data pages are those that are neither index nor
    /// long-value nor space-tree pages.
    pub fn is_primary(&self) -> bool {
        !self.is_index() && !self.is_long_value() && !self.is_space_tree()
    }

    pub fn new_record_format(&self) -> bool {
        self.contains(Self::NEW_RECORD_FORMAT)
    }

    pub fn new_checksum_format(&self) -> bool {
        self.contains(Self::NEW_CHECKSUM_FORMAT)
    }

    /// Short classification string used by `ese pages`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (bit, name) in [
            (Self::ROOT, "root"),
            (Self::LEAF, "leaf"),
            (Self::PARENT, "parent"),
            (Self::EMPTY, "empty"),
            (Self::SPACE_TREE, "space-tree"),
            (Self::INDEX, "index"),
            (Self::LONG_VALUE, "long-value"),
            (Self::NEW_RECORD_FORMAT, "new-record"),
            (Self::NEW_CHECKSUM_FORMAT, "new-checksum"),
            (Self::SCRUBBED, "scrubbed"),
        ] {
            if self.contains(bit) {
                parts.push(name);
            }
        }
        if parts.is_empty() {
            parts.push("none");
        }
        parts.join("|")
    }
}

/// Per-cell flag bits carried in the tag table (small pages) or the
/// first u16 of the cell data (large pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TagFlags(pub u8);

impl TagFlags {
    /// Cell participates in a version/range chain.
    pub const RANGE: u8 = 0x1;
    /// Cell is logically deleted and must be skipped.
    pub const DEFUNCT: u8 = 0x2;
    /// Cell key elides a prefix shared with the page key.
    pub const COMMON_KEY: u8 = 0x4;

    pub fn is_defunct(&self) -> bool {
        self.0 & Self::DEFUNCT != 0
    }

    pub fn has_common_key(&self) -> bool {
        self.0 & Self::COMMON_KEY != 0
    }
}

/// One entry of the page tag table, offsets already masked.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageTag {
    /// Cell offset relative to the end of the page header.
    pub offset: u16,
    /// Cell size in bytes.
    pub size: u16,
    /// Cell flags.
    pub flags: TagFlags,
}

/// Parsed page header (base fields plus the self page number when the
/// format stores one explicitly).
#[derive(Debug, Clone, Serialize)]
pub struct PageHeader {
    /// Stored XOR checksum.
    pub xor_checksum: u32,
    /// Stored ECC checksum (ECC era only).
    pub ecc_checksum: Option<u32>,
    /// Self page number. Legacy pages store it in bytes 4..8; extended
    /// headers store it at offset 64. In between (ECC era, small pages)
    /// the number is implicit in the checksum seed and this is `None`.
    pub page_number: Option<u64>,
    /// Database time at last modification.
    pub database_time: u64,
    /// Previous sibling page number (0 = none).
    pub prev_page: u32,
    /// Next sibling page number (0 = none).
    pub next_page: u32,
    /// Father data page object identifier.
    pub fdp_object_id: u32,
    /// Available data size.
    pub available_size: u16,
    /// Available uncommitted data size.
    pub available_uncommitted_size: u16,
    /// First available data offset.
    pub first_available_offset: u16,
    /// First available page tag; equals the number of tags in use.
    pub tag_count: u16,
    /// Page flags.
    pub flags: PageFlags,
}

impl PageHeader {
    /// Parse a page header from the start of a page buffer.
    pub fn parse(data: &[u8], format: &FormatInfo) -> Result<Self, EseError> {
        let header_size = format.page_header_size();
        if data.len() < header_size {
            return Err(EseError::CorruptHeader(format!(
                "page buffer of {} bytes shorter than {}-byte header",
                data.len(),
                header_size
            )));
        }

        let flags = PageFlags(LittleEndian::read_u32(&data[PAGE_FLAGS..]));
        let xor_checksum = LittleEndian::read_u32(&data[0..4]);
        let second_word = LittleEndian::read_u32(&data[4..8]);

        let (ecc_checksum, page_number) = if format.extended_page_header {
            (
                Some(second_word),
                Some(LittleEndian::read_u64(&data[PAGE_EXT_SELF_NUMBER..])),
            )
        } else if format.uses_ecc_checksum {
            (Some(second_word), None)
        } else {
            (None, Some(u64::from(second_word)))
        };

        Ok(PageHeader {
            xor_checksum,
            ecc_checksum,
            page_number,
            database_time: LittleEndian::read_u64(&data[PAGE_DATABASE_TIME..]),
            prev_page: LittleEndian::read_u32(&data[PAGE_PREV..]),
            next_page: LittleEndian::read_u32(&data[PAGE_NEXT..]),
            fdp_object_id: LittleEndian::read_u32(&data[PAGE_FDP_OBJECT_ID..]),
            available_size: LittleEndian::read_u16(&data[PAGE_AVAILABLE_SIZE..]),
            available_uncommitted_size: LittleEndian::read_u16(
                &data[PAGE_AVAILABLE_UNCOMMITTED_SIZE..],
            ),
            first_available_offset: LittleEndian::read_u16(&data[PAGE_FIRST_AVAILABLE_OFFSET..]),
            tag_count: LittleEndian::read_u16(&data[PAGE_FIRST_AVAILABLE_TAG..]),
            flags,
        })
    }

    pub fn has_next(&self) -> bool {
        self.next_page != 0
    }

    pub fn has_prev(&self) -> bool {
        self.prev_page != 0
    }
}

/// Root page header stored in tag 0 of ROOT pages.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RootPageHeader {
    /// Initial number of pages allocated to the tree.
    pub initial_page_count: u32,
    /// Parent father data page number.
    pub parent_fdp: u32,
    /// Extent space type (0 = single, 1 = multiple).
    pub extent_space: u32,
    /// Space tree page number, when extent space is multiple.
    pub space_tree_page: u32,
}

impl RootPageHeader {
    /// Parse the short (16 byte) or long (25 byte) root page header.
    pub fn parse(data: &[u8]) -> Result<Self, EseError> {
        match data.len() {
            16 => Ok(RootPageHeader {
                initial_page_count: LittleEndian::read_u32(&data[0..]),
                parent_fdp: LittleEndian::read_u32(&data[4..]),
                extent_space: LittleEndian::read_u32(&data[8..]),
                space_tree_page: LittleEndian::read_u32(&data[12..]),
            }),
            25 => Ok(RootPageHeader {
                initial_page_count: LittleEndian::read_u32(&data[0..]),
                parent_fdp: LittleEndian::read_u32(&data[5..]),
                extent_space: LittleEndian::read_u32(&data[9..]),
                space_tree_page: LittleEndian::read_u32(&data[13..]),
            }),
            other => Err(EseError::UnsupportedFormat(format!(
                "root page header of {} bytes (expected 16 or 25)",
                other
            ))),
        }
    }
}

/// Value carried by a data cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue<'a> {
    /// Branch cell: page number of the child covering keys >= the cell key.
    Branch(u32),
    /// Leaf cell payload: a record, a long-value segment, or (on index
    /// pages) the primary-tree key of the referenced record.
    Leaf(&'a [u8]),
}

/// A fully decoded data cell.
#[derive(Debug, Clone)]
pub struct Cell<'a> {
    /// Assembled key: inherited prefix bytes plus the inline local key.
    pub key: Vec<u8>,
    /// Cell value.
    pub value: CellValue<'a>,
    /// Cell flags.
    pub flags: TagFlags,
}

/// A validated, decoded page: buffer, parsed header, and tag table.
#[derive(Debug)]
pub struct Page {
    /// Pager-addressed page number.
    pub number: u32,
    /// Parsed header.
    pub header: PageHeader,
    /// Root page header, present on ROOT pages with a tag 0.
    pub root_header: Option<RootPageHeader>,
    tags: Vec<PageTag>,
    data: Vec<u8>,
    data_start: usize,
    new_record_format: bool,
}

impl Page {
    /// Parse a page buffer into header + tag table and validate every
    /// tag's bounds.
    pub fn parse(data: Vec<u8>, number: u32, format: &FormatInfo) -> Result<Self, EseError> {
        if data.len() != format.page_size as usize {
            return Err(EseError::PageCorrupt {
                page: number,
                reason: format!(
                    "buffer of {} bytes for page size {}",
                    data.len(),
                    format.page_size
                ),
            });
        }

        let header = PageHeader::parse(&data, format)?;
        let data_start = format.page_header_size();
        let tag_count = header.tag_count as usize;

        let tag_table_size = tag_count * PAGE_TAG_SIZE;
        let data_end = data
            .len()
            .checked_sub(tag_table_size)
            .filter(|&end| end >= data_start)
            .ok_or_else(|| EseError::PageCorrupt {
                page: number,
                reason: format!("tag table of {} entries overlaps the page header", tag_count),
            })?;

        let small_tags = format.small_page_tags();
        let mut tags = Vec::with_capacity(tag_count);
        for index in 0..tag_count {
            let entry_start = data.len() - (index + 1) * PAGE_TAG_SIZE;
            let size_word = LittleEndian::read_u16(&data[entry_start..]);
            let offset_word = LittleEndian::read_u16(&data[entry_start + 2..]);

            let (offset, size, mut flags) = if small_tags {
                (
                    offset_word & TAG_SMALL_VALUE_MASK,
                    size_word & TAG_SMALL_VALUE_MASK,
                    TagFlags((offset_word >> 13) as u8),
                )
            } else {
                (
                    offset_word & TAG_LARGE_VALUE_MASK,
                    size_word & TAG_LARGE_VALUE_MASK,
                    TagFlags(0),
                )
            };

            let cell_start = data_start + offset as usize;
            let cell_end = cell_start + size as usize;
            if cell_end > data_end {
                return Err(EseError::PageCorrupt {
                    page: number,
                    reason: format!(
                        "tag {} spans {}..{} past usable data end {}",
                        index, cell_start, cell_end, data_end
                    ),
                });
            }

            // Large pages keep the cell flags in the upper bits of the
            // first u16 of the cell data.
            if !small_tags && size >= 2 {
                let first_word = LittleEndian::read_u16(&data[cell_start..]);
                flags = TagFlags((first_word >> 13) as u8);
            }

            tags.push(PageTag { offset, size, flags });
        }

        let new_record_format = header.flags.new_record_format();
        let mut page = Page {
            number,
            header,
            root_header: None,
            tags,
            data,
            data_start,
            new_record_format,
        };

        if page.header.flags.is_root() && page.header.tag_count > 0 {
            let root_header = RootPageHeader::parse(page.tag_data(0)?)?;
            page.root_header = Some(root_header);
        }

        Ok(page)
    }

    /// The full validated page buffer.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    /// Number of tags in use, including tag 0.
    pub fn tag_count(&self) -> u16 {
        self.header.tag_count
    }

    /// The tag table entry at `index`.
    pub fn tag(&self, index: u16) -> Result<&PageTag, EseError> {
        self.tags
            .get(index as usize)
            .ok_or_else(|| EseError::PageCorrupt {
                page: self.number,
                reason: format!("tag {} beyond tag count {}", index, self.header.tag_count),
            })
    }

    /// Raw cell bytes for the tag at `index`. Bounds were validated at
    /// parse time.
    pub fn tag_data(&self, index: u16) -> Result<&[u8], EseError> {
        let tag = self.tag(index)?;
        let start = self.data_start + tag.offset as usize;
        Ok(&self.data[start..start + tag.size as usize])
    }

    /// The page key prefix: tag 0's bytes on non-root pages, empty on
    /// root pages (whose tag 0 is the root page header).
    pub fn key_prefix(&self) -> Result<&[u8], EseError> {
        if self.header.flags.is_root() || self.header.tag_count == 0 {
            Ok(&[])
        } else {
            self.tag_data(0)
        }
    }

    /// Decode the data cell at `index` (>= 1), assembling its full key
    /// against `prefix` (the cursor-accumulated key prefix for this
    /// page).
    pub fn cell(&self, index: u16, prefix: &[u8]) -> Result<Cell<'_>, EseError> {
        if index == 0 {
            return Err(EseError::PageCorrupt {
                page: self.number,
                reason: "tag 0 is the page external value, not a data cell".to_string(),
            });
        }
        let tag = *self.tag(index)?;
        let raw = self.tag_data(index)?;
        let mut pos = 0usize;

        let mut common_key_size = 0usize;
        if self.new_record_format && tag.flags.has_common_key() {
            if raw.len() < 2 {
                return Err(self.malformed_key(index, "truncated common key size"));
            }
            common_key_size = (LittleEndian::read_u16(&raw[0..2]) & TAG_SMALL_VALUE_MASK) as usize;
            pos += 2;
        }

        if raw.len() < pos + 2 {
            return Err(self.malformed_key(index, "truncated local key size"));
        }
        // The first u16 of a large-page cell doubles as the flag carrier,
        // so key sizes are always masked.
        let size_word = LittleEndian::read_u16(&raw[pos..pos + 2]);
        let local_key_size = if pos == 0 {
            (size_word & TAG_SMALL_VALUE_MASK) as usize
        } else {
            size_word as usize
        };
        pos += 2;

        if raw.len() < pos + local_key_size {
            return Err(self.malformed_key(index, "local key past end of cell"));
        }
        if common_key_size > prefix.len() {
            return Err(self.malformed_key(index, "common key longer than inherited prefix"));
        }

        let mut key = Vec::with_capacity(common_key_size + local_key_size);
        key.extend_from_slice(&prefix[..common_key_size]);
        key.extend_from_slice(&raw[pos..pos + local_key_size]);
        pos += local_key_size;

        let rest = &raw[pos..];
        let value = if self.header.flags.is_branch() {
            if rest.len() < 4 {
                return Err(EseError::PageCorrupt {
                    page: self.number,
                    reason: format!("branch cell {} has no child page number", index),
                });
            }
            CellValue::Branch(LittleEndian::read_u32(&rest[0..4]))
        } else {
            CellValue::Leaf(rest)
        };

        Ok(Cell {
            key,
            value,
            flags: tag.flags,
        })
    }

    fn malformed_key(&self, index: u16, what: &str) -> EseError {
        EseError::PageCorrupt {
            page: self.number,
            reason: format!("cell {}: {}", index, what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ese::testutil::{encode_cell, PageBuilder};

    fn test_format() -> FormatInfo {
        FormatInfo {
            page_size: 4096,
            format_revision: 0x0c,
            uses_ecc_checksum: true,
            extended_page_header: false,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let format = test_format();
        let page = PageBuilder::new(format, PageFlags::LEAF | PageFlags::NEW_RECORD_FORMAT)
            .prev_next(11, 13)
            .build(12);
        assert_eq!(page.header.prev_page, 11);
        assert_eq!(page.header.next_page, 13);
        assert!(page.header.flags.is_leaf());
        assert!(!page.header.flags.is_root());
        assert!(page.header.flags.new_record_format());
        assert_eq!(page.tag_count(), 0);
    }

    #[test]
    fn test_root_header_from_tag_zero() {
        let format = test_format();
        let mut root_header = vec![0u8; 16];
        LittleEndian::write_u32(&mut root_header[0..], 1);
        LittleEndian::write_u32(&mut root_header[8..], 0);
        let page = PageBuilder::new(
            format,
            PageFlags::ROOT | PageFlags::LEAF | PageFlags::NEW_RECORD_FORMAT,
        )
        .push_cell(root_header, 0)
        .build(4);
        let root = page.root_header.expect("root header");
        assert_eq!(root.initial_page_count, 1);
        assert_eq!(root.extent_space, 0);
        assert!(page.key_prefix().unwrap().is_empty());
    }

    #[test]
    fn test_leaf_cell_keys_with_common_prefix() {
        let format = test_format();
        let page = PageBuilder::new(format, PageFlags::LEAF | PageFlags::NEW_RECORD_FORMAT)
            .push_cell(b"keyp".to_vec(), 0) // tag 0: page key prefix
            .push_cell(encode_cell(None, b"keyaa", b"payload-a"), 0)
            .push_cell(
                encode_cell(Some(3), b"bb", b"payload-b"),
                TagFlags::COMMON_KEY,
            )
            .build(7);

        let prefix = page.key_prefix().unwrap().to_vec();
        assert_eq!(prefix, b"keyp");

        let cell = page.cell(1, &prefix).unwrap();
        assert_eq!(cell.key, b"keyaa");
        assert_eq!(cell.value, CellValue::Leaf(b"payload-a".as_slice()));

        let cell = page.cell(2, &prefix).unwrap();
        assert_eq!(cell.key, b"keybb");
        assert_eq!(cell.value, CellValue::Leaf(b"payload-b".as_slice()));
    }

    #[test]
    fn test_branch_cell_child_pointer() {
        let format = test_format();
        let mut payload = Vec::new();
        payload.extend_from_slice(&99u32.to_le_bytes());
        let page = PageBuilder::new(
            format,
            PageFlags::ROOT | PageFlags::PARENT | PageFlags::NEW_RECORD_FORMAT,
        )
        .push_cell(vec![0u8; 16], 0)
        .push_cell(encode_cell(None, b"m", &payload), 0)
        .build(3);

        let cell = page.cell(1, &[]).unwrap();
        assert_eq!(cell.key, b"m");
        assert_eq!(cell.value, CellValue::Branch(99));
    }

    #[test]
    fn test_common_key_longer_than_prefix_rejected() {
        let format = test_format();
        let page = PageBuilder::new(format, PageFlags::LEAF | PageFlags::NEW_RECORD_FORMAT)
            .push_cell(b"ab".to_vec(), 0)
            .push_cell(
                encode_cell(Some(10), b"x", b"data"),
                TagFlags::COMMON_KEY,
            )
            .build(7);
        let prefix = page.key_prefix().unwrap().to_vec();
        assert!(page.cell(1, &prefix).is_err());
    }

    #[test]
    fn test_tag_out_of_bounds_rejected() {
        let format = test_format();
        let mut data = vec![0u8; 4096];
        LittleEndian::write_u32(&mut data[PAGE_FLAGS..], PageFlags::LEAF);
        LittleEndian::write_u16(&mut data[PAGE_FIRST_AVAILABLE_TAG..], 1);
        // One tag pointing past the end of usable data
        let entry_start = 4096 - PAGE_TAG_SIZE;
        LittleEndian::write_u16(&mut data[entry_start..], 512); // size
        LittleEndian::write_u16(&mut data[entry_start + 2..], 0x1f00); // offset
        assert!(matches!(
            Page::parse(data, 5, &format),
            Err(EseError::PageCorrupt { page: 5, .. })
        ));
    }

    #[test]
    fn test_legacy_cell_inline_key() {
        let format = FormatInfo {
            page_size: 4096,
            format_revision: 0x09,
            uses_ecc_checksum: false,
            extended_page_header: false,
        };
        // Legacy pages: no common keys, plain 16-bit key size.
        let page = PageBuilder::new(format, PageFlags::LEAF)
            .push_cell(Vec::new(), 0)
            .push_cell(encode_cell(None, b"fullkey", b"v"), 0)
            .build(2);
        let cell = page.cell(1, &[]).unwrap();
        assert_eq!(cell.key, b"fullkey");
        assert_eq!(cell.value, CellValue::Leaf(b"v".as_slice()));
    }

    #[test]
    fn test_large_page_tag_flags_in_cell_data() {
        let format = FormatInfo {
            page_size: 16384,
            format_revision: 0x11,
            uses_ecc_checksum: true,
            extended_page_header: true,
        };
        let mut cell = encode_cell(Some(2), b"zz", b"data");
        // Large pages carry the flags in the top bits of the first u16.
        let first = LittleEndian::read_u16(&cell[0..2]);
        LittleEndian::write_u16(&mut cell[0..2], first | (u16::from(TagFlags::COMMON_KEY) << 13));

        let page = PageBuilder::new(format, PageFlags::LEAF | PageFlags::NEW_RECORD_FORMAT)
            .push_cell(b"pfx-".to_vec(), 0)
            .push_cell(cell, 0)
            .build(9);

        let tag = page.tag(1).unwrap();
        assert!(tag.flags.has_common_key());
        let prefix = page.key_prefix().unwrap().to_vec();
        let cell = page.cell(1, &prefix).unwrap();
        assert_eq!(cell.key, b"pfzz");
    }

    #[test]
    fn test_page_offset_layout() {
        let format = test_format();
        assert_eq!(format.page_offset(1), 2 * 4096);
        assert_eq!(format.page_offset(3), 4 * 4096);
    }
}
