//! Shared fixture builders for the integration tests.
//!
//! Assembles complete ESE database images in memory: sealed header
//! blocks (primary + shadow), checksummed pages with tag tables, record
//! payloads, catalog rows, and long-value trees. Images can be handed to
//! the library via a temp file or the in-memory backend.

#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

use ese::ese::checksum::{ecc32, header_checksum, page_xor_seed, xor32};
use ese::ese::constants::*;
use ese::ese::page::PageFlags;

pub const REVISION: u32 = 0x0c;

/// Flag combinations used throughout the fixtures.
pub fn leaf_flags() -> u32 {
    PageFlags::LEAF | PageFlags::NEW_RECORD_FORMAT
}

pub fn root_leaf_flags() -> u32 {
    PageFlags::ROOT | PageFlags::LEAF | PageFlags::NEW_RECORD_FORMAT
}

pub fn branch_root_flags() -> u32 {
    PageFlags::ROOT | PageFlags::PARENT | PageFlags::NEW_RECORD_FORMAT
}

// ── Page construction ───────────────────────────────────────────────

/// Builds one page: cells appended in order, tag table at the end.
pub struct PageWriter {
    data: Vec<u8>,
    cells: Vec<(Vec<u8>, u8)>,
}

impl PageWriter {
    pub fn new(page_size: u32, flags: u32) -> Self {
        let mut data = vec![0u8; page_size as usize];
        LittleEndian::write_u32(&mut data[PAGE_FLAGS..], flags);
        PageWriter {
            data,
            cells: Vec::new(),
        }
    }

    pub fn prev_next(mut self, prev: u32, next: u32) -> Self {
        LittleEndian::write_u32(&mut self.data[PAGE_PREV..], prev);
        LittleEndian::write_u32(&mut self.data[PAGE_NEXT..], next);
        self
    }

    /// Append a raw cell with tag flags (small-page format).
    pub fn cell(mut self, bytes: Vec<u8>, flags: u8) -> Self {
        self.cells.push((bytes, flags));
        self
    }

    /// Append the 16-byte short root page header as tag 0.
    pub fn root_header(self) -> Self {
        let mut bytes = vec![0u8; 16];
        LittleEndian::write_u32(&mut bytes[0..], 1);
        self.cell(bytes, 0)
    }

    /// Append an empty page-key-prefix cell as tag 0 (non-root pages).
    pub fn empty_prefix(self) -> Self {
        self.cell(Vec::new(), 0)
    }

    /// Append a data cell with a local key and payload.
    pub fn keyed_cell(self, key: &[u8], payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(2 + key.len() + payload.len());
        bytes.extend_from_slice(&(key.len() as u16).to_le_bytes());
        bytes.extend_from_slice(key);
        bytes.extend_from_slice(payload);
        self.cell(bytes, 0)
    }

    /// Append a branch cell pointing at a child page.
    pub fn branch_cell(self, key: &[u8], child: u32) -> Self {
        self.keyed_cell(key, &child.to_le_bytes())
    }

    pub fn finish(mut self) -> Vec<u8> {
        let header_size = PAGE_HEADER_SIZE;
        let mut write_pos = header_size;
        let page_len = self.data.len();
        for (index, (bytes, flags)) in self.cells.iter().enumerate() {
            let offset = (write_pos - header_size) as u16;
            self.data[write_pos..write_pos + bytes.len()].copy_from_slice(bytes);
            write_pos += bytes.len();

            let entry_start = page_len - (index + 1) * PAGE_TAG_SIZE;
            LittleEndian::write_u16(&mut self.data[entry_start..], bytes.len() as u16);
            LittleEndian::write_u16(
                &mut self.data[entry_start + 2..],
                offset | ((*flags as u16) << 13),
            );
        }
        LittleEndian::write_u16(
            &mut self.data[PAGE_FIRST_AVAILABLE_TAG..],
            self.cells.len() as u16,
        );
        self.data
    }
}

// ── Record construction ─────────────────────────────────────────────

/// Builds a record payload: header, fixed data + NULL bitmap, variable
/// offset table + data, tagged region.
#[derive(Default)]
pub struct RecordWriter {
    fixed: Vec<(Vec<u8>, bool)>,
    variable: Vec<Option<Vec<u8>>>,
    tagged: Vec<(u16, u8, Vec<u8>)>,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed(mut self, data: &[u8]) -> Self {
        self.fixed.push((data.to_vec(), false));
        self
    }

    pub fn fixed_null(mut self, placeholder: &[u8]) -> Self {
        self.fixed.push((placeholder.to_vec(), true));
        self
    }

    pub fn variable(mut self, data: Option<&[u8]>) -> Self {
        self.variable.push(data.map(|bytes| bytes.to_vec()));
        self
    }

    /// `flags == 0` encodes an entry without a data-flags byte.
    pub fn tagged(mut self, column_id: u16, flags: u8, body: &[u8]) -> Self {
        self.tagged.push((column_id, flags, body.to_vec()));
        self
    }

    pub fn finish(self, last_fixed_id: u8, last_variable_id: u8) -> Vec<u8> {
        let mut out = vec![last_fixed_id, last_variable_id, 0, 0];

        for (data, _) in &self.fixed {
            out.extend_from_slice(data);
        }
        let bitmap_size = (usize::from(last_fixed_id) + 7) / 8;
        let mut bitmap = vec![0u8; bitmap_size];
        for (index, (_, is_null)) in self.fixed.iter().enumerate() {
            if *is_null {
                bitmap[index / 8] |= 1 << (index % 8);
            }
        }
        out.extend_from_slice(&bitmap);

        let variable_offset_table = out.len() as u16;
        LittleEndian::write_u16(&mut out[2..4], variable_offset_table);

        let mut end = 0u16;
        for value in &self.variable {
            match value {
                Some(bytes) => {
                    end += bytes.len() as u16;
                    out.extend_from_slice(&end.to_le_bytes());
                }
                None => out.extend_from_slice(&(end | 0x8000).to_le_bytes()),
            }
        }
        for value in self.variable.iter().flatten() {
            out.extend_from_slice(value);
        }

        if !self.tagged.is_empty() {
            let array_len = self.tagged.len() * 4;
            let mut offset = array_len;
            let mut array = Vec::new();
            let mut bodies = Vec::new();
            for (column_id, flags, body) in &self.tagged {
                let mut raw_offset = offset as u16;
                if *flags != 0 {
                    raw_offset |= 0x8000;
                    bodies.push(*flags);
                    offset += 1;
                }
                array.extend_from_slice(&column_id.to_le_bytes());
                array.extend_from_slice(&raw_offset.to_le_bytes());
                bodies.extend_from_slice(body);
                offset += body.len();
            }
            out.extend_from_slice(&array);
            out.extend_from_slice(&bodies);
        }

        out
    }
}

// ── Catalog rows ────────────────────────────────────────────────────

/// Encode one catalog row record (fixed columns 1..=7 and the Name
/// variable column, the subset the resolver consumes).
pub fn catalog_row(
    objid_table: u32,
    row_type: u16,
    id: u32,
    coltyp_or_fdp: u32,
    space_usage: u32,
    codepage: u32,
    name: &str,
) -> Vec<u8> {
    RecordWriter::new()
        .fixed(&objid_table.to_le_bytes())
        .fixed(&row_type.to_le_bytes())
        .fixed(&id.to_le_bytes())
        .fixed(&coltyp_or_fdp.to_le_bytes())
        .fixed(&space_usage.to_le_bytes())
        .fixed(&0u32.to_le_bytes()) // Flags
        .fixed(&codepage.to_le_bytes())
        .variable(Some(name.as_bytes()))
        .finish(7, 128)
}

// ── Long-value cells ────────────────────────────────────────────────

pub fn lv_metadata_key(id: u32) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

pub fn lv_segment_key(id: u32, offset: u32) -> Vec<u8> {
    let mut key = vec![0u8; 8];
    BigEndian::write_u32(&mut key[0..4], id);
    BigEndian::write_u32(&mut key[4..8], offset);
    key
}

pub fn lv_metadata_value(total_size: u32) -> Vec<u8> {
    let mut value = vec![0u8; 8];
    LittleEndian::write_u32(&mut value[4..8], total_size);
    value
}

// ── Whole-image assembly ────────────────────────────────────────────

/// Assembles a database image: two sealed header blocks and a sparse
/// set of pages, gaps filled with sealed empty pages.
pub struct ImageBuilder {
    page_size: u32,
    revision: u32,
    pages: BTreeMap<u32, Vec<u8>>,
    corrupt_primary: bool,
    corrupt_shadow: bool,
}

impl ImageBuilder {
    pub fn new(page_size: u32) -> Self {
        ImageBuilder {
            page_size,
            revision: REVISION,
            pages: BTreeMap::new(),
            corrupt_primary: false,
            corrupt_shadow: false,
        }
    }

    pub fn revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    pub fn page(mut self, number: u32, data: Vec<u8>) -> Self {
        assert_eq!(data.len(), self.page_size as usize);
        self.pages.insert(number, data);
        self
    }

    /// Zero the primary header block so the shadow must be used.
    pub fn corrupt_primary_header(mut self) -> Self {
        self.corrupt_primary = true;
        self
    }

    /// Flip bytes in the shadow header block so its checksum fails.
    pub fn corrupt_shadow_header(mut self) -> Self {
        self.corrupt_shadow = true;
        self
    }

    fn header_block(&self) -> Vec<u8> {
        let mut block = vec![0u8; FILE_HEADER_BLOCK_SIZE];
        LittleEndian::write_u32(&mut block[HDR_SIGNATURE..], ESEDB_SIGNATURE);
        LittleEndian::write_u32(&mut block[HDR_FORMAT_VERSION..], FORMAT_VERSION);
        LittleEndian::write_u32(&mut block[HDR_FILE_TYPE..], 0);
        LittleEndian::write_u32(&mut block[HDR_DATABASE_STATE..], 3);
        LittleEndian::write_u32(&mut block[HDR_FORMAT_REVISION..], self.revision);
        LittleEndian::write_u32(&mut block[HDR_PAGE_SIZE..], self.page_size);
        let checksum = header_checksum(&block);
        LittleEndian::write_u32(&mut block[HDR_CHECKSUM..], checksum);
        block
    }

    fn seal(&self, mut page: Vec<u8>, number: u32) -> Vec<u8> {
        let uses_ecc = self.revision >= FORMAT_REVISION_NEW_CHECKSUM;
        if uses_ecc {
            let ecc = ecc32(&page[8..], 0);
            let xor = xor32(&page[8..], page_xor_seed(self.revision, number));
            LittleEndian::write_u32(&mut page[0..4], xor);
            LittleEndian::write_u32(&mut page[4..8], ecc);
        } else {
            LittleEndian::write_u32(&mut page[4..8], number);
            let xor = xor32(&page[4..], page_xor_seed(self.revision, number));
            LittleEndian::write_u32(&mut page[0..4], xor);
        }
        page
    }

    pub fn build(self) -> Vec<u8> {
        let page_size = self.page_size as usize;
        let last_page = self.pages.keys().next_back().copied().unwrap_or(0);

        let mut image = Vec::with_capacity((2 + last_page as usize) * page_size);
        let header = self.header_block();

        let mut primary = vec![0u8; page_size];
        if !self.corrupt_primary {
            primary[..header.len()].copy_from_slice(&header);
        }
        image.extend_from_slice(&primary);

        let mut shadow = vec![0u8; page_size];
        shadow[..header.len()].copy_from_slice(&header);
        if self.corrupt_shadow {
            for byte in shadow.iter_mut().take(64).skip(8) {
                *byte ^= 0xff;
            }
        }
        image.extend_from_slice(&shadow);

        for number in 1..=last_page {
            let page = match self.pages.get(&number) {
                Some(page) => page.clone(),
                None => PageWriter::new(self.page_size, PageFlags::LEAF | PageFlags::EMPTY)
                    .finish(),
            };
            image.extend_from_slice(&self.seal(page, number));
        }
        image
    }

    /// Build and write to a temp file.
    pub fn into_temp_file(self) -> NamedTempFile {
        let image = self.build();
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(&image).expect("write image");
        file.flush().expect("flush image");
        file
    }
}

// ── A standard two-table database used by several test files ────────

pub const PEOPLE_TABLE_ID: u32 = 7;
pub const PEOPLE_DATA_ROOT: u32 = 10;
pub const PEOPLE_LV_ROOT: u32 = 12;
pub const PEOPLE_INDEX_ROOT: u32 = 14;

/// Catalog page 4 describing `MSysObjects` (id 2) and `People` (id 7).
///
/// The catalog describes itself: MSysObjects carries column rows for
/// the fields the fixture rows populate (fixed columns 1..=7 plus
/// Name). People has fixed columns id (SignedInt32) and age
/// (UnsignedByte), a variable column name (Text, UTF-16LE), a tagged
/// column notes (LargeText), a long-value tree, and one index `ByName`.
pub fn standard_catalog_page(page_size: u32) -> Vec<u8> {
    let rows: Vec<Vec<u8>> = vec![
        catalog_row(2, 1, 2, CATALOG_ROOT_PAGE, 0, 0, "MSysObjects"),
        catalog_row(2, 2, 1, 4, 4, 0, "ObjidTable"),
        catalog_row(2, 2, 2, 3, 2, 0, "Type"),
        catalog_row(2, 2, 3, 4, 4, 0, "Id"),
        catalog_row(2, 2, 4, 4, 4, 0, "ColtypOrPgnoFDP"),
        catalog_row(2, 2, 5, 4, 4, 0, "SpaceUsage"),
        catalog_row(2, 2, 6, 4, 4, 0, "Flags"),
        catalog_row(2, 2, 7, 4, 4, 0, "PagesOrLocale"),
        catalog_row(2, 2, 128, 10, 0, 20127, "Name"),
        catalog_row(PEOPLE_TABLE_ID, 1, PEOPLE_TABLE_ID, PEOPLE_DATA_ROOT, 0, 0, "People"),
        catalog_row(PEOPLE_TABLE_ID, 2, 1, 4, 4, 0, "id"),
        catalog_row(PEOPLE_TABLE_ID, 2, 2, 2, 1, 0, "age"),
        catalog_row(PEOPLE_TABLE_ID, 2, 128, 10, 0, 1200, "name"),
        catalog_row(PEOPLE_TABLE_ID, 2, 256, 12, 0, 1200, "notes"),
        catalog_row(PEOPLE_TABLE_ID, 3, 9, PEOPLE_INDEX_ROOT, 0, 0, "ByName"),
        catalog_row(PEOPLE_TABLE_ID, 4, 8, PEOPLE_LV_ROOT, 0, 0, "LV_People"),
    ];

    let mut writer = PageWriter::new(page_size, root_leaf_flags()).root_header();
    for (index, row) in rows.into_iter().enumerate() {
        writer = writer.keyed_cell(&[0x7f, index as u8 + 1], &row);
    }
    writer.finish()
}

/// The `People` record from the seed scenarios: id=0x01020304, age=42,
/// name="Bob" (UTF-16LE), keyed `7f 01`.
pub fn bob_record() -> Vec<u8> {
    RecordWriter::new()
        .fixed(&0x01020304i32.to_le_bytes())
        .fixed(&[42u8])
        .variable(Some(b"B\x00o\x00b\x00"))
        .finish(2, 128)
}

/// A complete, consistent database image with the standard catalog, one
/// People record, an empty long-value tree, and the ByName index
/// referencing the record.
pub fn standard_image(page_size: u32) -> ImageBuilder {
    ImageBuilder::new(page_size)
        .page(CATALOG_ROOT_PAGE, standard_catalog_page(page_size))
        .page(
            PEOPLE_DATA_ROOT,
            PageWriter::new(page_size, root_leaf_flags())
                .root_header()
                .keyed_cell(&[0x7f, 0x01], &bob_record())
                .finish(),
        )
        .page(
            PEOPLE_LV_ROOT,
            PageWriter::new(
                page_size,
                PageFlags::ROOT | PageFlags::LEAF | PageFlags::LONG_VALUE
                    | PageFlags::NEW_RECORD_FORMAT,
            )
            .root_header()
            .finish(),
        )
        .page(
            PEOPLE_INDEX_ROOT,
            PageWriter::new(
                page_size,
                PageFlags::ROOT | PageFlags::LEAF | PageFlags::INDEX
                    | PageFlags::NEW_RECORD_FORMAT,
            )
            .root_header()
            .keyed_cell(b"bob", &[0x7f, 0x01])
            .finish(),
        )
}
