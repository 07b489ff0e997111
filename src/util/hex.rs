//! Hex dump formatting utilities.

use std::fmt::Write;

/// Format a u32 value as hex with 0x prefix.
pub fn format_hex32(value: u32) -> String {
    format!("0x{:08x}", value)
}

/// Format bytes as a compact hex string (e.g., "4a2f00ff").
pub fn format_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Produce a standard hex dump of `data` with the given `base_offset`:
/// an offset column, two groups of eight hex bytes, and an ASCII
/// sidebar.
pub fn hex_dump(data: &[u8], base_offset: u64) -> String {
    let mut out = String::new();
    for (line_index, chunk) in data.chunks(16).enumerate() {
        if line_index > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:08x}  ", base_offset + (line_index * 16) as u64);

        for column in 0..16 {
            if column == 8 {
                out.push(' ');
            }
            match chunk.get(column) {
                Some(byte) => {
                    let _ = write!(out, "{:02x} ", byte);
                }
                None => out.push_str("   "),
            }
        }

        out.push_str(" |");
        for &byte in chunk {
            if byte.is_ascii_graphic() || byte == b' ' {
                out.push(byte as char);
            } else {
                out.push('.');
            }
        }
        for _ in chunk.len()..16 {
            out.push(' ');
        }
        out.push('|');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(&[0x4a, 0x2f, 0x00, 0xff]), "4a2f00ff");
        assert_eq!(format_bytes(&[]), "");
    }

    #[test]
    fn test_hex_dump_layout() {
        let data: Vec<u8> = (0..16).collect();
        let output = hex_dump(&data, 0);
        assert!(output.starts_with("00000000  "));
        assert!(output.contains("00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f"));
    }

    #[test]
    fn test_hex_dump_partial_line_and_ascii() {
        let output = hex_dump(b"Hi\x00", 0x200);
        assert!(output.starts_with("00000200  "));
        assert!(output.contains("|Hi."));
    }
}
