//! Typed interpretation of raw column values.
//!
//! The record decoder hands out raw bytes plus the declared column type
//! and codepage; this module turns those into display-ready values:
//! little-endian integers, IEEE floats, FILETIME or OLE-automation
//! dates, GUIDs in registry format, and text in the column's codepage
//! (1200 = UTF-16LE, everything else treated as a byte encoding).
//!
//! Interpretation is lenient: a value whose length does not match its
//! declared type renders as raw bytes instead of failing, so one odd
//! column never aborts an export.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::ese::catalog::ColumnType;
use crate::ese::constants::CODEPAGE_UTF16LE;

/// A raw column value paired with its declared type and codepage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawValue {
    /// Declared column type.
    pub column_type: ColumnType,
    /// Column codepage (text types).
    pub codepage: u32,
    /// Raw stored bytes.
    pub bytes: Vec<u8>,
}

impl RawValue {
    pub fn new(column_type: ColumnType, codepage: u32, bytes: Vec<u8>) -> Self {
        RawValue {
            column_type,
            codepage,
            bytes,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.bytes.first().map(|&byte| byte != 0)
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    pub fn as_i16(&self) -> Option<i16> {
        (self.bytes.len() >= 2).then(|| LittleEndian::read_i16(&self.bytes))
    }

    pub fn as_u16(&self) -> Option<u16> {
        (self.bytes.len() >= 2).then(|| LittleEndian::read_u16(&self.bytes))
    }

    pub fn as_i32(&self) -> Option<i32> {
        (self.bytes.len() >= 4).then(|| LittleEndian::read_i32(&self.bytes))
    }

    pub fn as_u32(&self) -> Option<u32> {
        (self.bytes.len() >= 4).then(|| LittleEndian::read_u32(&self.bytes))
    }

    pub fn as_i64(&self) -> Option<i64> {
        (self.bytes.len() >= 8).then(|| LittleEndian::read_i64(&self.bytes))
    }

    pub fn as_u64(&self) -> Option<u64> {
        (self.bytes.len() >= 8).then(|| LittleEndian::read_u64(&self.bytes))
    }

    pub fn as_f32(&self) -> Option<f32> {
        (self.bytes.len() >= 4).then(|| LittleEndian::read_f32(&self.bytes))
    }

    pub fn as_f64(&self) -> Option<f64> {
        (self.bytes.len() >= 8).then(|| LittleEndian::read_f64(&self.bytes))
    }

    /// Decode text per the column codepage.
    pub fn as_text(&self) -> Option<String> {
        if !self.column_type.is_text() {
            return None;
        }
        Some(decode_text(&self.bytes, self.codepage))
    }

    /// Interpret this value as a date/time cell.
    pub fn as_datetime(&self) -> Option<DateTimeValue> {
        (self.bytes.len() >= 8).then(|| DateTimeValue {
            raw: LittleEndian::read_u64(&self.bytes),
        })
    }

    /// Format a 16-byte GUID in registry notation.
    pub fn as_guid_string(&self) -> Option<String> {
        (self.bytes.len() == 16).then(|| format_guid(&self.bytes))
    }

    /// Render into a display-ready [`TypedValue`].
    pub fn typed(&self) -> TypedValue {
        let bytes = &self.bytes;
        match self.column_type {
            ColumnType::Null => TypedValue::Bytes(bytes.clone()),
            ColumnType::Boolean => match self.as_bool() {
                Some(value) => TypedValue::Bool(value),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::UnsignedByte => match self.as_u8() {
                Some(value) => TypedValue::Uint(u64::from(value)),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::SignedInt16 => match self.as_i16() {
                Some(value) => TypedValue::Int(i64::from(value)),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::UnsignedInt16 => match self.as_u16() {
                Some(value) => TypedValue::Uint(u64::from(value)),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::SignedInt32 => match self.as_i32() {
                Some(value) => TypedValue::Int(i64::from(value)),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::UnsignedInt32 => match self.as_u32() {
                Some(value) => TypedValue::Uint(u64::from(value)),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::Currency | ColumnType::SignedInt64 => match self.as_i64() {
                Some(value) => TypedValue::Int(value),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::Float32 => match self.as_f32() {
                Some(value) => TypedValue::Float(value),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::Double64 => match self.as_f64() {
                Some(value) => TypedValue::Double(value),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::DateTime => match self.as_datetime() {
                Some(value) => TypedValue::DateTime(value),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::Text | ColumnType::LargeText => {
                TypedValue::Text(decode_text(bytes, self.codepage))
            }
            ColumnType::Guid => match self.as_guid_string() {
                Some(value) => TypedValue::Guid(value),
                None => TypedValue::Bytes(bytes.clone()),
            },
            ColumnType::Binary | ColumnType::LargeBinary | ColumnType::SuperLargeValue => {
                TypedValue::Bytes(bytes.clone())
            }
        }
    }
}

/// Display-ready column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f32),
    Double(f64),
    DateTime(DateTimeValue),
    Text(String),
    Guid(String),
    Bytes(Vec<u8>),
    Multi(Vec<TypedValue>),
}

/// A raw 8-byte date/time cell.
///
/// ESE stores timestamps in two encodings depending on the writing
/// component: an OLE automation date (IEEE double counting days since
/// 1899-12-30, used by most applications) or a Windows FILETIME
/// (100-nanosecond ticks since 1601-01-01, used by the directory
/// service). Both interpretations are exposed; [`Self::looks_like_filetime`]
/// is the heuristic the dumpers use to pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateTimeValue {
    /// Raw little-endian 8 bytes.
    pub raw: u64,
}

impl DateTimeValue {
    /// Days since 1899-12-30, by bit-reinterpretation as an IEEE double.
    pub fn as_oadate(&self) -> f64 {
        f64::from_bits(self.raw)
    }

    /// 100-nanosecond intervals since 1601-01-01.
    pub fn as_filetime(&self) -> u64 {
        self.raw
    }

    /// FILETIME values for plausible dates (1970..~2200) occupy a
    /// numeric range far above any sane OLE date's bit pattern exponent.
    pub fn looks_like_filetime(&self) -> bool {
        // 1970-01-01 and 2200-01-01 as FILETIME ticks.
        const FILETIME_1970: u64 = 116_444_736_000_000_000;
        const FILETIME_2200: u64 = 189_042_912_000_000_000;
        (FILETIME_1970..FILETIME_2200).contains(&self.raw)
    }

    /// Seconds since the Unix epoch under the FILETIME interpretation.
    pub fn filetime_as_unix_seconds(&self) -> i64 {
        const FILETIME_UNIX_EPOCH: i64 = 116_444_736_000_000_000;
        (self.raw as i64 - FILETIME_UNIX_EPOCH) / 10_000_000
    }
}

/// Decode text bytes per codepage.
pub fn decode_text(bytes: &[u8], codepage: u32) -> String {
    if codepage == CODEPAGE_UTF16LE {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Format a 16-byte GUID in registry notation: the first three fields
/// are little-endian, the rest is a byte string.
pub fn format_guid(bytes: &[u8]) -> String {
    format!(
        "{{{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}}}",
        LittleEndian::read_u32(&bytes[0..4]),
        LittleEndian::read_u16(&bytes[4..6]),
        LittleEndian::read_u16(&bytes[6..8]),
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15],
    )
}
