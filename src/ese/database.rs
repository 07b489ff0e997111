//! ESE database file I/O: the pager.
//!
//! Provides [`EseDatabase`], the primary entry point for opening `.edb`
//! files. Opening reads the primary and shadow file headers (the shadow
//! wins when the primary is corrupt), fixes the page size and format
//! revision, and computes the page count from the file size. Pages are
//! then read by 1-based number through a bounded LRU cache; every read
//! validates the page checksum(s) and the page's self-reference before
//! the buffer is handed out.
//!
//! A handle is single-threaded: cursors and caches borrow it through
//! interior mutability. Opening the same file twice yields fully
//! independent handles. The first I/O failure moves the handle to a
//! terminal failed state and every later call returns
//! [`EseError::Closed`].

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::sync::Arc;

use crate::ese::cache::{LruCache, DEFAULT_PAGE_CACHE_CAPACITY, DEFAULT_RECORD_CACHE_CAPACITY};
use crate::ese::checksum::{verify_page, ChecksumVerification};
use crate::ese::header::{read_headers, FileHeader};
use crate::ese::io::{FileBackend, ReadAt};
use crate::ese::page::{FormatInfo, Page};
use crate::ese::record::RecordData;
use crate::EseError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum HandleState {
    Ready,
    Failed,
}

/// An open, read-only ESE database.
pub struct EseDatabase {
    backend: RefCell<Box<dyn ReadAt>>,
    header: FileHeader,
    format: FormatInfo,
    page_count: u32,
    used_shadow_header: bool,
    state: Cell<HandleState>,
    page_cache: RefCell<LruCache<u32, Page>>,
    pub(crate) record_cache: RefCell<LruCache<(u32, Vec<u8>), RecordData>>,
    pub(crate) catalog: RefCell<Option<Arc<crate::ese::catalog::Catalog>>>,
}

impl EseDatabase {
    /// Open an ESE database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EseError> {
        Self::open_with_backend(Box::new(FileBackend::open(path)?))
    }

    /// Open an ESE database over an arbitrary byte backend.
    pub fn open_with_backend(mut backend: Box<dyn ReadAt>) -> Result<Self, EseError> {
        let (header, used_shadow_header) = read_headers(backend.as_mut())?;
        let format = FormatInfo::from_header(&header);

        let file_size = backend.size()?;
        // The first two page-size blocks are the header pair; everything
        // after is pages. The count is informational and bounds reads.
        let page_count = (file_size / u64::from(format.page_size)).saturating_sub(2);
        let page_count = u32::try_from(page_count).unwrap_or(u32::MAX);

        Ok(EseDatabase {
            backend: RefCell::new(backend),
            header,
            format,
            page_count,
            used_shadow_header,
            state: Cell::new(HandleState::Ready),
            page_cache: RefCell::new(LruCache::new(DEFAULT_PAGE_CACHE_CAPACITY)),
            record_cache: RefCell::new(LruCache::new(DEFAULT_RECORD_CACHE_CAPACITY)),
            catalog: RefCell::new(None),
        })
    }

    /// The file header the handle was opened from (shadow when the
    /// primary was corrupt).
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Per-file format facts.
    pub fn format(&self) -> &FormatInfo {
        &self.format
    }

    /// Page size in bytes.
    pub fn page_size(&self) -> u32 {
        self.format.page_size
    }

    /// Number of pages in the file (excluding the header pair).
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Creation format revision.
    pub fn format_revision(&self) -> u32 {
        self.format.format_revision
    }

    /// Whether the shadow header was used because the primary failed its
    /// checksum.
    pub fn used_shadow_header(&self) -> bool {
        self.used_shadow_header
    }

    /// Close the handle, releasing the caches and the backing store.
    /// Dropping the handle has the same effect; this form reads better
    /// at call sites that close explicitly.
    pub fn close(self) {}

    fn check_open(&self) -> Result<(), EseError> {
        if self.state.get() == HandleState::Failed {
            return Err(EseError::Closed);
        }
        Ok(())
    }

    /// Read a raw page buffer without caching or validation.
    ///
    /// Used by the checksum and dump inspection commands that need the
    /// bytes of pages the validating path would reject.
    pub fn read_page_raw(&self, page_number: u32) -> Result<Vec<u8>, EseError> {
        self.check_open()?;
        if page_number == 0 || page_number > self.page_count {
            return Err(EseError::Io(format!(
                "page {} out of range (database has {} pages)",
                page_number, self.page_count
            )));
        }
        let mut buffer = vec![0u8; self.format.page_size as usize];
        let offset = self.format.page_offset(page_number);
        self.backend
            .borrow_mut()
            .read_at(offset, &mut buffer)
            .inspect_err(|_| self.state.set(HandleState::Failed))?;
        Ok(buffer)
    }

    /// Verify the checksums of a raw page buffer read from this file.
    pub fn verify_page_buffer(&self, buffer: &[u8], page_number: u32) -> ChecksumVerification {
        verify_page(
            buffer,
            page_number,
            self.format.format_revision,
            self.format.uses_ecc_checksum,
        )
    }

    /// Read and validate a page, through the page cache.
    ///
    /// Validation order: checksum(s) first, then the page's
    /// self-reference (explicit where the format stores one; implicit in
    /// the checksum seed otherwise). The returned `Arc` keeps the buffer
    /// alive independently of cache eviction.
    pub fn read_page(&self, page_number: u32) -> Result<Arc<Page>, EseError> {
        self.check_open()?;
        if let Some(page) = self.page_cache.borrow_mut().get(&page_number) {
            return Ok(page);
        }

        let buffer = self.read_page_raw(page_number)?;
        let verification = self.verify_page_buffer(&buffer, page_number);
        if !verification.valid {
            return Err(EseError::PageCorrupt {
                page: page_number,
                reason: format!(
                    "checksum mismatch (stored 0x{:08x}, calculated 0x{:08x}{})",
                    verification.stored_xor,
                    verification.calculated_xor,
                    match verification.correctable_bit {
                        Some(bit) => format!(", single-bit error at bit {}", bit),
                        None => String::new(),
                    }
                ),
            });
        }

        let page = Page::parse(buffer, page_number, &self.format)?;
        if let Some(stored) = page.header.page_number {
            if stored != u64::from(page_number) {
                return Err(EseError::PageCorrupt {
                    page: page_number,
                    reason: format!("self-reference names page {}", stored),
                });
            }
        }

        let page = Arc::new(page);
        self.page_cache
            .borrow_mut()
            .insert(page_number, Arc::clone(&page));
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ese::checksum::{ecc32, header_checksum, page_xor_seed, xor32};
    use crate::ese::constants::*;
    use crate::ese::io::MemoryBackend;
    use crate::ese::page::PageFlags;
    use byteorder::{ByteOrder, LittleEndian};

    const PS: usize = 4096;
    const REVISION: u32 = 0x0c;

    fn sealed_header_block() -> Vec<u8> {
        let mut block = vec![0u8; FILE_HEADER_BLOCK_SIZE];
        LittleEndian::write_u32(&mut block[HDR_SIGNATURE..], ESEDB_SIGNATURE);
        LittleEndian::write_u32(&mut block[HDR_FORMAT_VERSION..], FORMAT_VERSION);
        LittleEndian::write_u32(&mut block[HDR_DATABASE_STATE..], 3);
        LittleEndian::write_u32(&mut block[HDR_FORMAT_REVISION..], REVISION);
        LittleEndian::write_u32(&mut block[HDR_PAGE_SIZE..], PS as u32);
        let checksum = header_checksum(&block);
        LittleEndian::write_u32(&mut block[HDR_CHECKSUM..], checksum);
        block
    }

    fn sealed_page(page_number: u32, flags: u32) -> Vec<u8> {
        let mut page = vec![0u8; PS];
        LittleEndian::write_u32(&mut page[PAGE_FLAGS..], flags);
        let ecc = ecc32(&page[8..], 0);
        let xor = xor32(&page[8..], page_xor_seed(REVISION, page_number));
        LittleEndian::write_u32(&mut page[0..4], xor);
        LittleEndian::write_u32(&mut page[4..8], ecc);
        page
    }

    fn image(pages: &[Vec<u8>]) -> Vec<u8> {
        let header = sealed_header_block();
        let mut image = vec![0u8; 2 * PS];
        image[..header.len()].copy_from_slice(&header);
        image[PS..PS + header.len()].copy_from_slice(&header);
        for page in pages {
            image.extend_from_slice(page);
        }
        image
    }

    fn open(pages: &[Vec<u8>]) -> EseDatabase {
        EseDatabase::open_with_backend(Box::new(MemoryBackend::new(image(pages)))).unwrap()
    }

    #[test]
    fn test_open_reports_geometry() {
        let db = open(&[
            sealed_page(1, PageFlags::LEAF),
            sealed_page(2, PageFlags::LEAF),
        ]);
        assert_eq!(db.page_size(), PS as u32);
        assert_eq!(db.page_count(), 2);
        assert_eq!(db.format_revision(), REVISION);
        assert!(!db.used_shadow_header());
    }

    #[test]
    fn test_read_page_validates_and_caches() {
        let db = open(&[sealed_page(1, PageFlags::LEAF)]);
        let first = db.read_page(1).unwrap();
        let second = db.read_page(1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.header.flags.is_leaf());
    }

    #[test]
    fn test_read_page_out_of_range_is_io() {
        let db = open(&[sealed_page(1, PageFlags::LEAF)]);
        assert!(matches!(db.read_page(2), Err(EseError::Io(_))));
        assert!(matches!(db.read_page(0), Err(EseError::Io(_))));
    }

    #[test]
    fn test_corrupt_page_rejected() {
        let mut page = sealed_page(1, PageFlags::LEAF);
        page[100] ^= 0xff;
        page[101] ^= 0xff;
        let db = open(&[page]);
        assert!(matches!(
            db.read_page(1),
            Err(EseError::PageCorrupt { page: 1, .. })
        ));
    }

    #[test]
    fn test_page_at_wrong_position_rejected() {
        // A page sealed as page 2 stored at position 1: the page-number
        // checksum seed makes the read fail.
        let db = open(&[sealed_page(2, PageFlags::LEAF)]);
        assert!(matches!(
            db.read_page(1),
            Err(EseError::PageCorrupt { page: 1, .. })
        ));
    }

    /// Backend that reports more bytes than it can serve, so in-range
    /// page reads can hit a genuine I/O failure.
    struct TruncatedBackend {
        inner: MemoryBackend,
        claimed_size: u64,
    }

    impl ReadAt for TruncatedBackend {
        fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), EseError> {
            self.inner.read_at(offset, buf)
        }

        fn size(&mut self) -> Result<u64, EseError> {
            Ok(self.claimed_size)
        }
    }

    #[test]
    fn test_failed_handle_is_closed() {
        // Backend claims four pages but only holds one: reading page 2
        // fails mid-flight and poisons the handle.
        let backend = TruncatedBackend {
            inner: MemoryBackend::new(image(&[sealed_page(1, PageFlags::LEAF)])),
            claimed_size: 4 * PS as u64,
        };
        let db = EseDatabase::open_with_backend(Box::new(backend)).unwrap();
        assert!(matches!(db.read_page(2), Err(EseError::Io(_))));
        // Handle is now terminal
        assert!(matches!(db.read_page(1), Err(EseError::Closed)));
    }
}
