//! Space tree decoding.
//!
//! Trees whose root page header declares multiple extent space carry a
//! pair of auxiliary space trees (owned and available extents) starting
//! at the root's `space_tree_page`. Space tree pages are flagged
//! SPACE_TREE; each leaf cell's key is the big-endian number of the last
//! page of an extent and its value the extent's page count.
//!
//! The reader exposes the extents for inspection (`ese pages`, the
//! validator); the library itself never allocates from them.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

use crate::ese::btree::BTreeCursor;
use crate::ese::database::EseDatabase;
use crate::EseError;

#[cfg(test)]
use crate::ese::page::PageFlags;

/// One extent described by a space tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    /// Number of the last page of the extent.
    pub last_page: u32,
    /// Number of pages in the extent.
    pub page_count: u32,
}

impl Extent {
    /// Number of the first page of the extent.
    pub fn first_page(&self) -> u32 {
        self.last_page + 1 - self.page_count
    }

    /// Whether `page` falls inside the extent.
    pub fn contains(&self, page: u32) -> bool {
        self.page_count > 0 && page >= self.first_page() && page <= self.last_page
    }
}

/// Read the extents of the space tree rooted at `root_page`.
///
/// The root must carry the SPACE_TREE flag; extents come back in
/// ascending last-page order (the tree's key order).
pub fn read_space_tree(db: &EseDatabase, root_page: u32) -> Result<Vec<Extent>, EseError> {
    let root = db.read_page(root_page)?;
    if !root.header.flags.is_space_tree() {
        return Err(EseError::PageTypeMismatch {
            page: root_page,
            flags: root.header.flags.0,
        });
    }

    let mut extents = Vec::new();
    let mut cursor = BTreeCursor::seek_first(db, root_page)?;
    while let Some(entry) = cursor.next_entry()? {
        if entry.key.len() != 4 || entry.data.len() < 4 {
            return Err(EseError::PageCorrupt {
                page: entry.page_number,
                reason: format!(
                    "space tree cell with {}-byte key and {}-byte value",
                    entry.key.len(),
                    entry.data.len()
                ),
            });
        }
        let extent = Extent {
            last_page: BigEndian::read_u32(&entry.key),
            page_count: LittleEndian::read_u32(&entry.data),
        };
        if extent.page_count > extent.last_page {
            return Err(EseError::PageCorrupt {
                page: entry.page_number,
                reason: format!(
                    "extent of {} pages cannot end at page {}",
                    extent.page_count, extent.last_page
                ),
            });
        }
        extents.push(extent);
    }
    Ok(extents)
}

/// Total number of pages covered by a set of extents.
pub fn total_pages(extents: &[Extent]) -> u64 {
    extents.iter().map(|extent| u64::from(extent.page_count)).sum()
}
