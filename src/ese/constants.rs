//! ESE database file and page structure constants.
//!
//! Offsets and magic values for the on-disk ESE (Extensible Storage Engine)
//! format, grouped by structure:
//! - the 668-byte file header (primary at offset 0, shadow at `page_size`)
//! - the 40/80-byte page header and the page tag table
//! - the catalog tree rooted at page 4

// ── File header ─────────────────────────────────────────────────────

/// ESE database signature (`ef cd ab 89` on disk, little-endian u32).
pub const ESEDB_SIGNATURE: u32 = 0x89ab_cdef;

/// Size of the block each file header occupies and the range its XOR
/// checksum covers. The header structure itself is 668 bytes; the rest of
/// the block is zero fill.
pub const FILE_HEADER_BLOCK_SIZE: usize = 2048;

/// Supported format version.
pub const FORMAT_VERSION: u32 = 0x620;

/// Offset of the header XOR checksum. 4 bytes.
pub const HDR_CHECKSUM: usize = 0;
/// Offset of the file signature. 4 bytes.
pub const HDR_SIGNATURE: usize = 4;
/// Offset of the format version. 4 bytes.
pub const HDR_FORMAT_VERSION: usize = 8;
/// Offset of the file type (0 = database, 1 = streaming file). 4 bytes.
pub const HDR_FILE_TYPE: usize = 12;
/// Offset of the database time. 8 bytes.
pub const HDR_DATABASE_TIME: usize = 16;
/// Offset of the database signature. 28 bytes.
pub const HDR_DATABASE_SIGNATURE: usize = 24;
/// Offset of the database state. 4 bytes.
pub const HDR_DATABASE_STATE: usize = 52;
/// Offset of the consistent log position. 8 bytes.
pub const HDR_CONSISTENT_POSITION: usize = 56;
/// Offset of the consistent time. 8 bytes.
pub const HDR_CONSISTENT_TIME: usize = 64;
/// Offset of the attach time. 8 bytes.
pub const HDR_ATTACH_TIME: usize = 72;
/// Offset of the attach log position. 8 bytes.
pub const HDR_ATTACH_POSITION: usize = 80;
/// Offset of the detach time. 8 bytes.
pub const HDR_DETACH_TIME: usize = 88;
/// Offset of the detach log position. 8 bytes.
pub const HDR_DETACH_POSITION: usize = 96;
/// Offset of the log signature. 28 bytes.
pub const HDR_LOG_SIGNATURE: usize = 104;
/// Offset of the shadowing-disabled flag. 4 bytes.
pub const HDR_SHADOWING_DISABLED: usize = 208;
/// Offset of the last object identifier. 4 bytes.
pub const HDR_LAST_OBJECT_ID: usize = 212;
/// Offset of the creation format revision. 4 bytes.
pub const HDR_FORMAT_REVISION: usize = 232;
/// Offset of the page size. 4 bytes.
pub const HDR_PAGE_SIZE: usize = 236;
/// Offset of the repair count. 4 bytes.
pub const HDR_REPAIR_COUNT: usize = 240;

// ── Format revisions ────────────────────────────────────────────────

/// Revision that introduced the XOR+ECC checksum pair in the first 8
/// page bytes (Windows 2003 era).
pub const FORMAT_REVISION_NEW_CHECKSUM: u32 = 0x0b;
/// Revision that introduced the extended record format.
pub const FORMAT_REVISION_NEW_RECORD: u32 = 0x0c;
/// Revision that introduced the 80-byte extended page header
/// (Windows 7 era, also implied by page sizes of 16 KiB and up).
pub const FORMAT_REVISION_EXTENDED_PAGE_HEADER: u32 = 0x11;
/// Latest recognized revision.
pub const FORMAT_REVISION_MAX: u32 = 0x14;

// ── Page geometry ───────────────────────────────────────────────────

/// Page sizes accepted by the pager.
pub const SUPPORTED_PAGE_SIZES: [u32; 5] = [2048, 4096, 8192, 16384, 32768];

/// Largest page size still using the packed 13-bit tag format. Larger
/// pages switch to 15-bit tag fields with cell flags stored in the first
/// u16 of the cell data.
pub const MAX_SMALL_PAGE_SIZE: u32 = 8192;

/// Size of the base page header.
pub const PAGE_HEADER_SIZE: usize = 40;
/// Size of the extended page header (base + extension).
pub const PAGE_HEADER_SIZE_EXTENDED: usize = 80;

/// Offset of the checksum field (XOR u32 + page number u32 in the legacy
/// layout, XOR u32 + ECC u32 once ECC checksums are in effect). 8 bytes.
pub const PAGE_CHECKSUM: usize = 0;
/// Offset of the database modification time. 8 bytes.
pub const PAGE_DATABASE_TIME: usize = 8;
/// Offset of the previous sibling page number. 4 bytes.
pub const PAGE_PREV: usize = 16;
/// Offset of the next sibling page number. 4 bytes.
pub const PAGE_NEXT: usize = 20;
/// Offset of the father data page object identifier. 4 bytes.
pub const PAGE_FDP_OBJECT_ID: usize = 24;
/// Offset of the available data size. 2 bytes.
pub const PAGE_AVAILABLE_SIZE: usize = 28;
/// Offset of the available uncommitted data size. 2 bytes.
pub const PAGE_AVAILABLE_UNCOMMITTED_SIZE: usize = 30;
/// Offset of the first available data offset. 2 bytes.
pub const PAGE_FIRST_AVAILABLE_OFFSET: usize = 32;
/// Offset of the first available page tag (equals the tag count). 2 bytes.
pub const PAGE_FIRST_AVAILABLE_TAG: usize = 34;
/// Offset of the page flags. 4 bytes.
pub const PAGE_FLAGS: usize = 36;
/// Offset of the self page number within the extended header. 8 bytes.
pub const PAGE_EXT_SELF_NUMBER: usize = 64;

/// Bytes per page tag table entry.
pub const PAGE_TAG_SIZE: usize = 4;

/// Mask for the 13-bit offset/size fields of small-page tags.
pub const TAG_SMALL_VALUE_MASK: u16 = 0x1fff;
/// Mask for the 15-bit offset/size fields of large-page tags.
pub const TAG_LARGE_VALUE_MASK: u16 = 0x7fff;

// ── Checksums ───────────────────────────────────────────────────────

/// Initial value for the file header XOR checksum and for page XOR
/// checksums on revisions before [`FORMAT_REVISION_NEW_CHECKSUM`].
pub const XOR_SEED_SIGNATURE: u32 = ESEDB_SIGNATURE;

// ── Catalog ─────────────────────────────────────────────────────────

/// Page number of the catalog tree root.
pub const CATALOG_ROOT_PAGE: u32 = 4;

/// Highest column identifier stored in the fixed region of a record.
pub const LAST_FIXED_COLUMN_ID: u32 = 127;
/// Highest column identifier stored in the variable region of a record.
pub const LAST_VARIABLE_COLUMN_ID: u32 = 255;

/// Catalog fixed column identifiers (the catalog describes itself with
/// this well-known layout).
pub const CAT_COL_OBJID_TABLE: u32 = 1;
pub const CAT_COL_TYPE: u32 = 2;
pub const CAT_COL_ID: u32 = 3;
pub const CAT_COL_COLTYP_OR_FDP: u32 = 4;
pub const CAT_COL_SPACE_USAGE: u32 = 5;
pub const CAT_COL_FLAGS: u32 = 6;
pub const CAT_COL_PAGES_OR_LOCALE: u32 = 7;
pub const CAT_COL_ROOT_FLAG: u32 = 8;
pub const CAT_COL_RECORD_OFFSET: u32 = 9;
pub const CAT_COL_LC_MAP_FLAGS: u32 = 10;
pub const CAT_COL_KEY_MOST: u32 = 11;
/// Catalog variable column identifiers.
pub const CAT_COL_NAME: u32 = 128;
pub const CAT_COL_STATS: u32 = 129;
pub const CAT_COL_TEMPLATE_TABLE: u32 = 130;
pub const CAT_COL_DEFAULT_VALUE: u32 = 131;
pub const CAT_COL_KEY_FLD_IDS: u32 = 132;

// ── Codepages ───────────────────────────────────────────────────────

/// UTF-16 little-endian codepage for Text/LargeText columns.
pub const CODEPAGE_UTF16LE: u32 = 1200;
/// Windows Latin-1 codepage.
pub const CODEPAGE_WINDOWS_1252: u32 = 1252;
/// 7-bit ASCII codepage.
pub const CODEPAGE_ASCII: u32 = 20127;
