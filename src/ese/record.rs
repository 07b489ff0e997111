//! Record (data definition) decoding.
//!
//! A record is the payload of a leaf cell in a table's data tree. Its
//! layout is positional and parsed strictly in order:
//!
//! 1. header: last fixed column id (u8), last variable column id (u8),
//!    offset of the variable-size offset table (u16);
//! 2. fixed column data, concatenated in column-id order, followed by a
//!    NULL bitmap (one bit per fixed column) ending where the variable
//!    offset table begins;
//! 3. the variable-size offset table: one u16 per variable column in
//!    scope, top bit = empty, low 15 bits = cumulative end offset;
//! 4. variable column data;
//! 5. the tagged region: a sorted array of `(column id, offset)` entries
//!    delimiting the trailing tagged values.
//!
//! The tagged region exists in two dialects selected by the page's
//! NEW_RECORD_FORMAT flag: the legacy dialect only knows the LONG_VALUE
//! and COMPRESSED data flags, the extended dialect adds multi-values.
//! Unknown flag bits are rejected rather than guessed, since the bit
//! assignments drifted between format revisions.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::ese::catalog::{ColumnSchema, TableSchema};
use crate::ese::compression::decompress;
use crate::EseError;

/// Tagged-entry data flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedDataFlags(pub u8);

impl TaggedDataFlags {
    pub const VARIABLE_SIZE: u8 = 0x01;
    pub const COMPRESSED: u8 = 0x02;
    pub const LONG_VALUE: u8 = 0x04;
    pub const MULTI_VALUE: u8 = 0x08;
    pub const MULTI_VALUE_SIZE_DEFINED_BY_DATA: u8 = 0x10;

    fn is_compressed(&self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    fn is_long_value(&self) -> bool {
        self.0 & Self::LONG_VALUE != 0
    }

    fn is_multi_value(&self) -> bool {
        self.0 & Self::MULTI_VALUE != 0
    }

    fn multi_value_size_defined_by_data(&self) -> bool {
        self.0 & Self::MULTI_VALUE_SIZE_DEFINED_BY_DATA != 0
    }
}

/// Decoded storage of one column within one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    /// Explicitly or implicitly NULL.
    Null,
    /// Value stored inline (decompressed when it was compressed).
    Inline(Vec<u8>),
    /// Reference into the table's long-value tree.
    LongValueRef {
        /// Long value identifier, as stored in the record.
        id: u32,
        /// The reassembled stream is itself compressed.
        compressed: bool,
    },
    /// Multi-valued column: one byte string per element.
    Multi(Vec<Vec<u8>>),
}

/// The decoded, column-indexed form of one record.
///
/// Columns of the table schema that carry no storage in this record
/// (fixed columns past the record's last fixed id, empty variable
/// columns, absent tagged columns) read as [`RecordValue::Null`].
#[derive(Debug, Clone)]
pub struct RecordData {
    values: BTreeMap<u32, RecordValue>,
}

impl RecordData {
    /// Storage for a column id; columns without storage read as NULL.
    pub fn value(&self, column_id: u32) -> &RecordValue {
        self.values.get(&column_id).unwrap_or(&RecordValue::Null)
    }

    /// Column ids that carry non-NULL storage, ascending.
    pub fn present_columns(&self) -> impl Iterator<Item = u32> + '_ {
        self.values
            .iter()
            .filter(|(_, value)| !matches!(value, RecordValue::Null))
            .map(|(&id, _)| id)
    }
}

fn truncated(what: &str) -> EseError {
    EseError::RecordTruncated(what.to_string())
}

/// Decode a record payload against a table schema.
///
/// `extended_tagged` selects the tagged-region dialect and comes from
/// the NEW_RECORD_FORMAT flag of the page the record was read from.
pub fn parse_record(
    data: &[u8],
    schema: &TableSchema,
    extended_tagged: bool,
) -> Result<RecordData, EseError> {
    if data.len() < 4 {
        return Err(truncated("record shorter than its 4-byte header"));
    }
    let last_fixed_id = u32::from(data[0]);
    let last_variable_id = u32::from(data[1]);
    let variable_offset_table = usize::from(LittleEndian::read_u16(&data[2..4]));
    if variable_offset_table < 4 || variable_offset_table > data.len() {
        return Err(truncated("variable offset table outside the record"));
    }

    let mut values = BTreeMap::new();

    // ── Fixed region ────────────────────────────────────────────────
    let bitmap_size = (last_fixed_id as usize + 7) / 8;
    let bitmap_start = variable_offset_table
        .checked_sub(bitmap_size)
        .ok_or_else(|| truncated("fixed-column NULL bitmap outside the record"))?;
    if bitmap_start < 4 {
        return Err(truncated("fixed-column NULL bitmap overlaps the header"));
    }
    let bitmap = &data[bitmap_start..variable_offset_table];

    let mut pos = 4usize;
    for column in &schema.fixed_columns {
        if column.id > last_fixed_id {
            break;
        }
        let size = column.fixed_size;
        if pos + size > bitmap_start {
            return Err(truncated("fixed column data overlaps the NULL bitmap"));
        }
        let bit = (column.id - 1) as usize;
        let is_null = bitmap
            .get(bit / 8)
            .is_some_and(|byte| byte & (1 << (bit % 8)) != 0);
        let value = if is_null {
            RecordValue::Null
        } else {
            RecordValue::Inline(data[pos..pos + size].to_vec())
        };
        values.insert(column.id, value);
        pos += size;
    }

    // ── Variable region ─────────────────────────────────────────────
    let variable_in_scope: Vec<&ColumnSchema> = schema
        .variable_columns
        .iter()
        .filter(|column| column.id <= last_variable_id)
        .collect();
    let table_size = variable_in_scope.len() * 2;
    let variable_data_base = variable_offset_table + table_size;
    if variable_data_base > data.len() {
        return Err(truncated("variable offset table past end of record"));
    }

    let mut previous_end = 0usize;
    for (index, column) in variable_in_scope.iter().enumerate() {
        let entry_at = variable_offset_table + index * 2;
        let entry = LittleEndian::read_u16(&data[entry_at..entry_at + 2]);
        let empty = entry & 0x8000 != 0;
        let end = usize::from(entry & 0x7fff);
        if end < previous_end || variable_data_base + end > data.len() {
            return Err(truncated("variable column span outside the record"));
        }
        if empty {
            values.insert(column.id, RecordValue::Null);
        } else {
            let bytes = data[variable_data_base + previous_end..variable_data_base + end].to_vec();
            values.insert(column.id, RecordValue::Inline(bytes));
        }
        previous_end = end;
    }

    // ── Tagged region ───────────────────────────────────────────────
    let tagged_start = variable_data_base + previous_end;
    if tagged_start > data.len() {
        return Err(truncated("variable data past end of record"));
    }
    let tagged = &data[tagged_start..];
    if !tagged.is_empty() {
        parse_tagged_region(tagged, schema, extended_tagged, &mut values)?;
    }

    Ok(RecordData { values })
}

fn parse_tagged_region(
    tagged: &[u8],
    schema: &TableSchema,
    extended: bool,
    values: &mut BTreeMap<u32, RecordValue>,
) -> Result<(), EseError> {
    if tagged.len() < 4 {
        return Err(truncated("tagged region shorter than one entry"));
    }

    // The first entry's offset names the end of the entry array.
    let array_end = usize::from(LittleEndian::read_u16(&tagged[2..4]) & 0x7fff);
    if array_end < 4 || array_end % 4 != 0 || array_end > tagged.len() {
        return Err(truncated("tagged entry array with bad extent"));
    }
    let entry_count = array_end / 4;

    struct RawEntry {
        column_id: u32,
        offset: usize,
        has_flags: bool,
    }

    let mut entries = Vec::with_capacity(entry_count);
    for index in 0..entry_count {
        let at = index * 4;
        let column_id = u32::from(LittleEndian::read_u16(&tagged[at..at + 2]));
        let raw_offset = LittleEndian::read_u16(&tagged[at + 2..at + 4]);
        entries.push(RawEntry {
            column_id,
            offset: usize::from(raw_offset & 0x7fff),
            has_flags: raw_offset & 0x8000 != 0,
        });
    }

    for window in entries.windows(2) {
        if window[1].column_id <= window[0].column_id || window[1].offset < window[0].offset {
            return Err(truncated("tagged entries out of order"));
        }
    }

    for (index, entry) in entries.iter().enumerate() {
        let end = match entries.get(index + 1) {
            Some(next) => next.offset,
            None => tagged.len(),
        };
        if entry.offset > end || end > tagged.len() {
            return Err(truncated("tagged value span outside the record"));
        }

        let column = schema
            .column(entry.column_id)
            .ok_or(EseError::ColumnIdUnknown {
                column: entry.column_id,
            })?;

        let mut body = &tagged[entry.offset..end];
        let mut flags = TaggedDataFlags(0);
        if entry.has_flags {
            let (&flag_byte, rest) = body
                .split_first()
                .ok_or_else(|| truncated("tagged value flag byte missing"))?;
            flags = TaggedDataFlags(flag_byte);
            body = rest;
        }

        let allowed = if extended {
            TaggedDataFlags::VARIABLE_SIZE
                | TaggedDataFlags::COMPRESSED
                | TaggedDataFlags::LONG_VALUE
                | TaggedDataFlags::MULTI_VALUE
                | TaggedDataFlags::MULTI_VALUE_SIZE_DEFINED_BY_DATA
        } else {
            TaggedDataFlags::COMPRESSED | TaggedDataFlags::LONG_VALUE
        };
        if flags.0 & !allowed != 0 {
            return Err(EseError::UnsupportedFormat(format!(
                "tagged data flags 0x{:02x} not valid for this record format",
                flags.0
            )));
        }
        if flags.is_long_value() && flags.is_multi_value() {
            return Err(EseError::UnsupportedFormat(
                "multi-valued long-value columns are not supported".to_string(),
            ));
        }

        let value = if flags.is_long_value() {
            if body.len() < 4 {
                return Err(truncated("long value reference shorter than 4 bytes"));
            }
            let id = LittleEndian::read_u32(&body[0..4]);
            if id == 0 {
                // A zero identifier is an unset reference, not an error.
                RecordValue::Null
            } else {
                RecordValue::LongValueRef {
                    id,
                    compressed: flags.is_compressed(),
                }
            }
        } else if flags.is_multi_value() {
            if flags.is_compressed() {
                return Err(EseError::UnsupportedFormat(
                    "compressed multi-values are not supported".to_string(),
                ));
            }
            RecordValue::Multi(parse_multi_value(
                body,
                column,
                flags.multi_value_size_defined_by_data(),
            )?)
        } else if flags.is_compressed() {
            RecordValue::Inline(decompress(body)?)
        } else {
            RecordValue::Inline(body.to_vec())
        };
        values.insert(entry.column_id, value);
    }
    Ok(())
}

/// Split a multi-value body into elements.
///
/// With an inline offset table, the first u16 names both the first
/// element's offset and the table's own length. Without one, fixed-width
/// column types split at their natural width and everything else carries
/// a u16 length prefix per element.
fn parse_multi_value(
    body: &[u8],
    column: &ColumnSchema,
    size_defined_by_data: bool,
) -> Result<Vec<Vec<u8>>, EseError> {
    let mut elements = Vec::new();

    if size_defined_by_data {
        if body.len() < 2 {
            return Err(truncated("multi-value offset table missing"));
        }
        let table_len = usize::from(LittleEndian::read_u16(&body[0..2]));
        if table_len < 2 || table_len % 2 != 0 || table_len > body.len() {
            return Err(truncated("multi-value offset table with bad extent"));
        }
        let count = table_len / 2;
        let mut offsets = Vec::with_capacity(count + 1);
        for index in 0..count {
            offsets.push(usize::from(LittleEndian::read_u16(
                &body[index * 2..index * 2 + 2],
            )));
        }
        offsets.push(body.len());
        for window in offsets.windows(2) {
            let (start, end) = (window[0], window[1]);
            if start > end || end > body.len() {
                return Err(truncated("multi-value element span outside the value"));
            }
            elements.push(body[start..end].to_vec());
        }
    } else if let Some(width) = column.column_type.fixed_size() {
        if body.len() % width != 0 {
            return Err(truncated("multi-value body not a multiple of element width"));
        }
        for chunk in body.chunks(width) {
            elements.push(chunk.to_vec());
        }
    } else {
        let mut pos = 0usize;
        while pos < body.len() {
            if pos + 2 > body.len() {
                return Err(truncated("multi-value element length prefix missing"));
            }
            let len = usize::from(LittleEndian::read_u16(&body[pos..pos + 2]));
            pos += 2;
            if pos + len > body.len() {
                return Err(truncated("multi-value element past end of value"));
            }
            elements.push(body[pos..pos + len].to_vec());
            pos += len;
        }
    }

    Ok(elements)
}
