//! Byte-level backing store abstraction.
//!
//! The pager consumes a positional-read interface rather than a concrete
//! file type, so databases can be opened from anything that can serve
//! `read_at(offset, len)` requests: a file, an in-memory image, a
//! forensic container. [`FileBackend`] is the standard file-backed
//! implementation.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::EseError;

/// Positional byte reader over an immutable backing store.
pub trait ReadAt {
    /// Read exactly `buf.len()` bytes starting at `offset`.
    ///
    /// A short read (including reads past the end of the store) is an
    /// error; the pager never issues speculative reads.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), EseError>;

    /// Total size of the backing store in bytes.
    fn size(&mut self) -> Result<u64, EseError>;
}

/// File-backed [`ReadAt`] implementation.
pub struct FileBackend {
    file: File,
    path: String,
}

impl FileBackend {
    /// Open a file read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EseError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| EseError::Io(format!("Cannot open {}: {}", path.display(), e)))?;
        Ok(FileBackend {
            file,
            path: path.display().to_string(),
        })
    }
}

impl ReadAt for FileBackend {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), EseError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| EseError::Io(format!("Cannot seek {} to {}: {}", self.path, offset, e)))?;
        self.file.read_exact(buf).map_err(|e| {
            EseError::Io(format!(
                "Cannot read {} bytes at {} from {}: {}",
                buf.len(),
                offset,
                self.path,
                e
            ))
        })
    }

    fn size(&mut self) -> Result<u64, EseError> {
        let metadata = self
            .file
            .metadata()
            .map_err(|e| EseError::Io(format!("Cannot stat {}: {}", self.path, e)))?;
        Ok(metadata.len())
    }
}

/// In-memory [`ReadAt`] implementation over an owned byte image.
///
/// Used by tests and by callers that already hold the database in memory.
pub struct MemoryBackend {
    data: Vec<u8>,
}

impl MemoryBackend {
    pub fn new(data: Vec<u8>) -> Self {
        MemoryBackend { data }
    }
}

impl ReadAt for MemoryBackend {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), EseError> {
        let start = usize::try_from(offset)
            .map_err(|_| EseError::Io(format!("Offset {} out of range", offset)))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                EseError::Io(format!(
                    "Read of {} bytes at {} past end of {}-byte image",
                    buf.len(),
                    offset,
                    self.data.len()
                ))
            })?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn size(&mut self) -> Result<u64, EseError> {
        Ok(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_reads() {
        let mut backend = MemoryBackend::new((0u8..64).collect());
        let mut buf = [0u8; 4];
        backend.read_at(10, &mut buf).unwrap();
        assert_eq!(buf, [10, 11, 12, 13]);
        assert_eq!(backend.size().unwrap(), 64);
    }

    #[test]
    fn test_memory_backend_rejects_short_read() {
        let mut backend = MemoryBackend::new(vec![0u8; 16]);
        let mut buf = [0u8; 8];
        assert!(backend.read_at(12, &mut buf).is_err());
        assert!(backend.read_at(u64::MAX, &mut buf).is_err());
    }
}
