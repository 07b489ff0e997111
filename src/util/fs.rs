//! Filesystem discovery helpers.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};

use crate::ese::constants::{ESEDB_SIGNATURE, HDR_SIGNATURE};
use crate::EseError;

/// Check whether a file starts with the ESE database signature.
///
/// Reads only the first 8 bytes; unreadable or short files count as
/// non-ESE rather than erroring.
pub fn is_ese_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut prefix = [0u8; 8];
    if file.read_exact(&mut prefix).is_err() {
        return false;
    }
    LittleEndian::read_u32(&prefix[HDR_SIGNATURE..]) == ESEDB_SIGNATURE
}

/// Recursively collect every ESE database file under `dir`, sorted by
/// path. Unreadable directories are skipped.
pub fn find_ese_files(dir: &Path) -> Result<Vec<PathBuf>, EseError> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(error) => {
                if current == dir {
                    return Err(EseError::Io(format!(
                        "Cannot read directory {}: {}",
                        current.display(),
                        error
                    )));
                }
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_ese_file(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}
