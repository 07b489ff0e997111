//! B⁺-tree cursor: ordered traversal of a page tree.
//!
//! A cursor owns a stack of `(page, tag index, key prefix)` frames from
//! the tree root down to the current leaf. [`BTreeCursor::seek_first`]
//! descends the leftmost path; [`BTreeCursor::seek_key`] descends by
//! binary search, selecting at each branch level the child under the
//! lexicographically largest separator key not exceeding the target.
//! Iteration advances within the leaf, then follows the `next_page`
//! sibling link.
//!
//! Every page entered during one iteration is recorded; revisiting one
//! through a corrupted sibling chain aborts with
//! [`EseError::TreeCycle`]. Keys yielded from a single page must be
//! strictly increasing in byte-lexicographic order (equal keys are
//! tolerated on NON_UNIQUE_KEYS trees); a violation aborts the cursor.
//! An aborted or exhausted cursor is terminal and keeps yielding `None`.

use std::collections::HashSet;
use std::sync::Arc;

use crate::ese::database::EseDatabase;
use crate::ese::page::{CellValue, Page, PageFlags};
use crate::EseError;

/// One `(key, data)` pair yielded from a leaf page.
#[derive(Debug, Clone)]
pub struct LeafEntry {
    /// Fully assembled cell key.
    pub key: Vec<u8>,
    /// Cell payload, copied out of the page buffer.
    pub data: Vec<u8>,
    /// Page the entry was read from.
    pub page_number: u32,
    /// Flags of the containing page (record decoding branches on
    /// NEW_RECORD_FORMAT).
    pub page_flags: PageFlags,
}

struct Frame {
    page: Arc<Page>,
    /// Current tag position; 0 means "before the first data cell".
    tag_index: u16,
    /// Prefix inherited from the descent (parent contribution).
    inherited: Vec<u8>,
    /// Effective prefix for this page: inherited + page key (tag 0).
    prefix: Vec<u8>,
    /// Last key yielded from this page, for order validation.
    last_key: Option<Vec<u8>>,
}

impl Frame {
    fn new(page: Arc<Page>, inherited: Vec<u8>) -> Result<Self, EseError> {
        let mut prefix = inherited.clone();
        prefix.extend_from_slice(page.key_prefix()?);
        Ok(Frame {
            page,
            tag_index: 0,
            inherited,
            prefix,
            last_key: None,
        })
    }
}

/// Cursor over one page tree.
pub struct BTreeCursor<'db> {
    db: &'db EseDatabase,
    stack: Vec<Frame>,
    visited: HashSet<u32>,
    finished: bool,
}

impl<'db> BTreeCursor<'db> {
    /// Open a cursor positioned before the first entry of the tree
    /// rooted at `root_page`.
    pub fn seek_first(db: &'db EseDatabase, root_page: u32) -> Result<Self, EseError> {
        let mut cursor = BTreeCursor {
            db,
            stack: Vec::new(),
            visited: HashSet::new(),
            finished: false,
        };
        cursor.descend(root_page, Vec::new(), None)?;
        Ok(cursor)
    }

    /// Open a cursor positioned before the first entry whose key is
    /// greater than or equal to `key`.
    pub fn seek_key(db: &'db EseDatabase, root_page: u32, key: &[u8]) -> Result<Self, EseError> {
        let mut cursor = BTreeCursor {
            db,
            stack: Vec::new(),
            visited: HashSet::new(),
            finished: false,
        };
        cursor.descend(root_page, Vec::new(), Some(key))?;

        // Within the leaf, skip cells whose keys sort below the target.
        if let Some(frame) = cursor.stack.last_mut() {
            let mut position = frame.tag_index;
            while position + 1 < frame.page.tag_count() {
                let cell = frame.page.cell(position + 1, &frame.prefix)?;
                if cell.flags.is_defunct() || cell.key.as_slice() < key {
                    position += 1;
                } else {
                    break;
                }
            }
            frame.tag_index = position;
            // Seeking consumes the order baseline up to the target.
            frame.last_key = None;
        }
        Ok(cursor)
    }

    /// Descend from `page_number` to a leaf, pushing a frame per level.
    /// With a target key, each branch level picks the child under the
    /// largest separator <= key; without one, the leftmost child.
    fn descend(
        &mut self,
        page_number: u32,
        inherited: Vec<u8>,
        key: Option<&[u8]>,
    ) -> Result<(), EseError> {
        let mut page_number = page_number;
        let mut inherited = inherited;
        loop {
            if !self.visited.insert(page_number) {
                self.finished = true;
                return Err(EseError::TreeCycle { page: page_number });
            }
            let page = self.db.read_page(page_number)?;
            let mut frame = Frame::new(Arc::clone(&page), inherited)?;

            if page.header.flags.is_leaf() {
                self.stack.push(frame);
                return Ok(());
            }

            if page.tag_count() <= 1 {
                // A branch page with no children: nothing to iterate.
                self.finished = true;
                self.stack.push(frame);
                return Ok(());
            }

            let chosen = match key {
                None => 1,
                Some(key) => self.branch_search(&frame, key)?,
            };
            let cell = page.cell(chosen, &frame.prefix)?;
            let child = match cell.value {
                CellValue::Branch(child) => child,
                CellValue::Leaf(_) => {
                    return Err(EseError::PageTypeMismatch {
                        page: page_number,
                        flags: page.header.flags.0,
                    })
                }
            };

            frame.tag_index = chosen;
            inherited = frame.prefix.clone();
            self.stack.push(frame);
            page_number = child;
        }
    }

    /// Binary search the branch cells for the rightmost separator key
    /// that is <= the target. Falls back to the first child when every
    /// separator exceeds the target.
    fn branch_search(&self, frame: &Frame, key: &[u8]) -> Result<u16, EseError> {
        let mut low = 1u16;
        let mut high = frame.page.tag_count() - 1;
        let mut chosen = 1u16;
        while low <= high {
            let mid = low + (high - low) / 2;
            let cell = frame.page.cell(mid, &frame.prefix)?;
            if cell.key.as_slice() <= key {
                chosen = mid;
                low = mid + 1;
            } else {
                if mid == 1 {
                    break;
                }
                high = mid - 1;
            }
        }
        Ok(chosen)
    }

    /// Advance to the next leaf entry.
    ///
    /// Returns `Ok(None)` once the tree is exhausted; the cursor then
    /// stays terminal. Structural errors (cycles, order violations,
    /// non-leaf pages in the sibling chain) also terminate the cursor.
    pub fn next_entry(&mut self) -> Result<Option<LeafEntry>, EseError> {
        if self.finished {
            return Ok(None);
        }
        let result = self.advance();
        if matches!(result, Err(_) | Ok(None)) {
            self.finished = true;
        }
        result
    }

    fn advance(&mut self) -> Result<Option<LeafEntry>, EseError> {
        loop {
            let frame = match self.stack.last_mut() {
                Some(frame) => frame,
                None => return Ok(None),
            };

            if frame.tag_index + 1 < frame.page.tag_count() {
                frame.tag_index += 1;
                let cell = frame.page.cell(frame.tag_index, &frame.prefix)?;
                if cell.flags.is_defunct() {
                    continue;
                }

                if let Some(last) = &frame.last_key {
                    let non_unique = frame
                        .page
                        .header
                        .flags
                        .contains(PageFlags::NON_UNIQUE_KEYS);
                    let in_order = if non_unique {
                        cell.key.as_slice() >= last.as_slice()
                    } else {
                        cell.key.as_slice() > last.as_slice()
                    };
                    if !in_order {
                        return Err(EseError::KeyOrderViolation {
                            page: frame.page.number,
                        });
                    }
                }
                frame.last_key = Some(cell.key.clone());

                let data = match cell.value {
                    CellValue::Leaf(data) => data.to_vec(),
                    CellValue::Branch(_) => unreachable!("top frame is always a leaf"),
                };
                return Ok(Some(LeafEntry {
                    key: cell.key,
                    data,
                    page_number: frame.page.number,
                    page_flags: frame.page.header.flags,
                }));
            }

            // Leaf exhausted: follow the sibling link.
            let next = frame.page.header.next_page;
            if next == 0 {
                return Ok(None);
            }
            if !self.visited.insert(next) {
                return Err(EseError::TreeCycle { page: next });
            }
            let sibling = self.db.read_page(next)?;
            if !sibling.header.flags.is_leaf() {
                return Err(EseError::PageTypeMismatch {
                    page: next,
                    flags: sibling.header.flags.0,
                });
            }
            let inherited = frame.inherited.clone();
            self.stack.pop();
            self.stack.push(Frame::new(sibling, inherited)?);
        }
    }
}
