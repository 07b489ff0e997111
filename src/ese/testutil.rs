//! Shared helpers for the unit tests: synthetic page construction.

use byteorder::{ByteOrder, LittleEndian};

use crate::ese::constants::*;
use crate::ese::page::{FormatInfo, Page};

/// Minimal page builder used across the decoder and cursor tests: cells
/// are appended in order, the tag table is written from the page end.
pub(crate) struct PageBuilder {
    data: Vec<u8>,
    format: FormatInfo,
    cells: Vec<(Vec<u8>, u8)>,
}

impl PageBuilder {
    pub(crate) fn new(format: FormatInfo, flags: u32) -> Self {
        let mut data = vec![0u8; format.page_size as usize];
        LittleEndian::write_u32(&mut data[PAGE_FLAGS..], flags);
        PageBuilder {
            data,
            format,
            cells: Vec::new(),
        }
    }

    pub(crate) fn prev_next(mut self, prev: u32, next: u32) -> Self {
        LittleEndian::write_u32(&mut self.data[PAGE_PREV..], prev);
        LittleEndian::write_u32(&mut self.data[PAGE_NEXT..], next);
        self
    }

    pub(crate) fn push_cell(mut self, bytes: Vec<u8>, flags: u8) -> Self {
        self.cells.push((bytes, flags));
        self
    }

    /// Write cells and the tag table into the raw buffer.
    pub(crate) fn into_bytes(mut self) -> Vec<u8> {
        let header_size = self.format.page_header_size();
        let mut write_pos = header_size;
        let page_len = self.data.len();
        for (index, (bytes, flags)) in self.cells.iter().enumerate() {
            let offset = (write_pos - header_size) as u16;
            self.data[write_pos..write_pos + bytes.len()].copy_from_slice(bytes);
            write_pos += bytes.len();

            let entry_start = page_len - (index + 1) * PAGE_TAG_SIZE;
            let size_word = bytes.len() as u16;
            let offset_word = offset | ((*flags as u16) << 13);
            LittleEndian::write_u16(&mut self.data[entry_start..], size_word);
            LittleEndian::write_u16(&mut self.data[entry_start + 2..], offset_word);
        }
        LittleEndian::write_u16(
            &mut self.data[PAGE_FIRST_AVAILABLE_TAG..],
            self.cells.len() as u16,
        );
        self.data
    }

    pub(crate) fn build(self, number: u32) -> Page {
        let format = self.format;
        Page::parse(self.into_bytes(), number, &format).unwrap()
    }
}

/// Encode a new-format cell: optional common key size, local key size,
/// local key, payload.
pub(crate) fn encode_cell(common: Option<u16>, local_key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(common) = common {
        out.extend_from_slice(&common.to_le_bytes());
    }
    out.extend_from_slice(&(local_key.len() as u16).to_le_bytes());
    out.extend_from_slice(local_key);
    out.extend_from_slice(payload);
    out
}

/// A 16-byte short root page header for tag 0 of root pages.
pub(crate) fn root_header_bytes(initial_pages: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 16];
    LittleEndian::write_u32(&mut bytes[0..], initial_pages);
    bytes
}

/// Record payload builder mirroring the on-disk layout: header, fixed
/// data + NULL bitmap, variable offset table + data, tagged region.
///
/// Fixed columns are appended in identifier order starting at column 1;
/// `fixed_null` still occupies its slot but sets the NULL bit.
#[derive(Default)]
pub(crate) struct RecordBuilder {
    fixed: Vec<(Vec<u8>, bool)>,
    variable: Vec<Option<Vec<u8>>>,
    tagged: Vec<(u16, u8, Vec<u8>)>,
}

impl RecordBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fixed(mut self, data: &[u8]) -> Self {
        self.fixed.push((data.to_vec(), false));
        self
    }

    pub(crate) fn fixed_null(mut self, placeholder: &[u8]) -> Self {
        self.fixed.push((placeholder.to_vec(), true));
        self
    }

    pub(crate) fn variable(mut self, data: Option<&[u8]>) -> Self {
        self.variable.push(data.map(|bytes| bytes.to_vec()));
        self
    }

    /// `flags == 0` encodes an entry without a data-flags byte.
    pub(crate) fn tagged(mut self, column_id: u16, flags: u8, body: &[u8]) -> Self {
        self.tagged.push((column_id, flags, body.to_vec()));
        self
    }

    pub(crate) fn build(self, last_fixed_id: u8, last_variable_id: u8) -> Vec<u8> {
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
