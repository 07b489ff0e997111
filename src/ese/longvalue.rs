//! Long-value reassembly and streaming.
//!
//! Values too large for a leaf cell live in the table's long-value tree.
//! Keys there are big-endian so byte-lexicographic order is numeric
//! order: the metadata cell's key is the 4-byte value identifier and its
//! payload declares the total size; each data cell's key appends a
//! 4-byte segment offset, and segments concatenate in ascending offset
//! order into the full value.
//!
//! [`read_long_value`] reassembles a value in memory and checks that the
//! segments are contiguous from offset 0 and add up to the declared
//! size. A gap or a short tail means a segment is missing from the tree,
//! which is a format error, not a recoverable condition. For values
//! worth not buffering, [`LongValueReader`] implements [`std::io::Read`]
//! and pulls segments from the tree on demand.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::ese::btree::BTreeCursor;
use crate::ese::database::EseDatabase;
use crate::EseError;

/// Metadata of one long value.
#[derive(Debug, Clone, Copy)]
pub struct LongValueInfo {
    /// Long value identifier.
    pub id: u32,
    /// Header flags from the metadata cell.
    pub flags: u32,
    /// Declared total size in bytes.
    pub declared_size: u64,
}

/// Key of the metadata cell for `id`.
pub fn metadata_key(id: u32) -> [u8; 4] {
    id.to_be_bytes()
}

/// Key of the data cell holding the segment of `id` at `offset`.
pub fn segment_key(id: u32, offset: u32) -> [u8; 8] {
    let mut key = [0u8; 8];
    BigEndian::write_u32(&mut key[0..4], id);
    BigEndian::write_u32(&mut key[4..8], offset);
    key
}

fn parse_metadata(id: u32, data: &[u8]) -> Result<LongValueInfo, EseError> {
    if data.len() >= 8 {
        Ok(LongValueInfo {
            id,
            flags: LittleEndian::read_u32(&data[0..4]),
            declared_size: u64::from(LittleEndian::read_u32(&data[4..8])),
        })
    } else if data.len() == 4 {
        Ok(LongValueInfo {
            id,
            flags: 0,
            declared_size: u64::from(LittleEndian::read_u32(&data[0..4])),
        })
    } else {
        Err(EseError::RecordTruncated(format!(
            "long value 0x{:08x} metadata cell of {} bytes",
            id,
            data.len()
        )))
    }
}

/// Position a cursor on the metadata cell of `id` and return its
/// parsed header.
fn open_value<'db>(
    db: &'db EseDatabase,
    long_value_root: u32,
    id: u32,
) -> Result<(BTreeCursor<'db>, LongValueInfo), EseError> {
    if long_value_root == 0 {
        return Err(EseError::LongValueMissing { id });
    }
    let mut cursor = BTreeCursor::seek_key(db, long_value_root, &metadata_key(id))?;
    let entry = cursor
        .next_entry()?
        .filter(|entry| entry.key == metadata_key(id))
        .ok_or(EseError::LongValueMissing { id })?;
    let info = parse_metadata(id, &entry.data)?;
    Ok((cursor, info))
}

/// Look up a long value's metadata without reading its segments.
pub fn long_value_info(
    db: &EseDatabase,
    long_value_root: u32,
    id: u32,
) -> Result<LongValueInfo, EseError> {
    open_value(db, long_value_root, id).map(|(_, info)| info)
}

/// Reassemble a long value into memory.
pub fn read_long_value(
    db: &EseDatabase,
    long_value_root: u32,
    id: u32,
) -> Result<Vec<u8>, EseError> {
    let mut reader = LongValueReader::open(db, long_value_root, id)?;
    let mut value = Vec::with_capacity(reader.declared_size() as usize);
    reader
        .read_to_end(&mut value)
        .map_err(|error| match error.into_inner() {
            Some(inner) => match inner.downcast::<EseError>() {
                Ok(ese) => *ese,
                Err(other) => EseError::Io(other.to_string()),
            },
            None => EseError::Io("long value read failed".to_string()),
        })?;
    Ok(value)
}

/// Block-oriented reader over a long value's segments.
///
/// Segments are fetched from the tree as the reader advances; nothing is
/// buffered beyond the current segment. The stream ends after exactly
/// the declared number of bytes; contiguity and total-length violations
/// surface as read errors carrying the underlying [`EseError`].
pub struct LongValueReader<'db> {
    db: &'db EseDatabase,
    long_value_root: u32,
    cursor: BTreeCursor<'db>,
    id: u32,
    declared_size: u64,
    produced: u64,
    segment: Vec<u8>,
    segment_pos: usize,
    finished: bool,
}

impl<'db> LongValueReader<'db> {
    /// Open a reader over the long value `id` in the tree rooted at
    /// `long_value_root`.
    pub fn open(
        db: &'db EseDatabase,
        long_value_root: u32,
        id: u32,
    ) -> Result<Self, EseError> {
        let (cursor, info) = open_value(db, long_value_root, id)?;
        Ok(LongValueReader {
            db,
            long_value_root,
            cursor,
            id,
            declared_size: info.declared_size,
            produced: 0,
            segment: Vec::new(),
            segment_pos: 0,
            finished: info.declared_size == 0,
        })
    }

    /// Declared total size of the value.
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Current stream position in bytes.
    pub fn position(&self) -> u64 {
        self.produced
    }

    /// Reposition to an absolute offset by rewinding to the metadata
    /// cell and skipping whole segments without copying them.
    fn seek_to(&mut self, target: u64) -> Result<(), EseError> {
        if target > self.declared_size {
            return Err(EseError::Io(format!(
                "seek to {} past declared size {} of long value 0x{:08x}",
                target, self.declared_size, self.id
            )));
        }
        let (cursor, _) = open_value(self.db, self.long_value_root, self.id)?;
        self.cursor = cursor;
        self.produced = 0;
        self.segment.clear();
        self.segment_pos = 0;
        self.finished = self.declared_size == 0 && target == 0;

        while self.produced < target {
            self.next_segment()?;
            let remaining = target - self.produced;
            if (self.segment.len() as u64) <= remaining {
                self.produced += self.segment.len() as u64;
                self.segment.clear();
                self.segment_pos = 0;
            } else {
                self.segment_pos = remaining as usize;
                self.produced = target;
            }
        }
        Ok(())
    }

    fn next_segment(&mut self) -> Result<(), EseError> {
        let entry = match self.cursor.next_entry()? {
            Some(entry) => entry,
            None => return Err(EseError::LongValueMissing { id: self.id }),
        };
        if entry.key.len() != 8 || entry.key[0..4] != metadata_key(self.id) {
            // Keys moved past this value's id range: the tail is missing.
            return Err(EseError::LongValueMissing { id: self.id });
        }
        let segment_offset = u64::from(BigEndian::read_u32(&entry.key[4..8]));
        if segment_offset != self.produced {
            return Err(EseError::LongValueMissing { id: self.id });
        }
        if self.produced + entry.data.len() as u64 > self.declared_size {
            return Err(EseError::LongValueLengthMismatch {
                id: self.id,
                actual: self.produced + entry.data.len() as u64,
                declared: self.declared_size,
            });
        }
        self.segment = entry.data;
        self.segment_pos = 0;
        Ok(())
    }
}

impl Seek for LongValueReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(self.produced) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.declared_size) + i128::from(delta),
        };
        let target = u64::try_from(target)
            .map_err(|_| std::io::Error::other("seek before start of long value"))?;
        self.seek_to(target).map_err(std::io::Error::other)?;
        Ok(self.produced)
    }
}

impl Read for LongValueReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }
        if self.segment_pos == self.segment.len() {
            if self.produced == self.declared_size {
                self.finished = true;
                return Ok(0);
            }
            self.next_segment().map_err(std::io::Error::other)?;
            if self.segment.is_empty() {
                return Err(std::io::Error::other(EseError::LongValueMissing {
                    id: self.id,
                }));
            }
        }
        let available = self.segment.len() - self.segment_pos;
        let count = available.min(buf.len());
        buf[..count].copy_from_slice(&self.segment[self.segment_pos..self.segment_pos + count]);
        self.segment_pos += count;
        self.produced += count as u64;
        Ok(count)
    }
}
