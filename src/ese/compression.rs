//! Column value decompression.
//!
//! A compressed tagged value starts with a one-byte scheme tag:
//!
//! | Tag | Scheme |
//! |-----|--------|
//! | 0x00 | Identity (raw bytes follow) |
//! | 0x01 | 7-bit ASCII pack |
//! | 0x18 | LZXPRESS (recognized, not supported) |
//!
//! The 7-bit pack stores ASCII text as a little-endian bit stream of
//! 7-bit units; each unit expands to one byte with the high bit clear.
//! Anything else raises [`EseError::UnsupportedCompression`] rather than
//! guessing.

use crate::EseError;

/// Compression scheme tag for identity (uncompressed) payloads.
pub const SCHEME_IDENTITY: u8 = 0x00;
/// Compression scheme tag for the 7-bit ASCII pack.
pub const SCHEME_SEVEN_BIT: u8 = 0x01;
/// Compression scheme tag for LZXPRESS (Exchange-era, unsupported).
pub const SCHEME_LZXPRESS: u8 = 0x18;

/// Decompress a tagged value, dispatching on its leading scheme tag.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, EseError> {
    let (&tag, body) = data
        .split_first()
        .ok_or(EseError::UnsupportedCompression { tag: 0 })?;
    match tag {
        SCHEME_IDENTITY => Ok(body.to_vec()),
        SCHEME_SEVEN_BIT => Ok(decompress_seven_bit(body)),
        other => Err(EseError::UnsupportedCompression { tag: other }),
    }
}

/// Expand a 7-bit packed bit stream into bytes.
///
/// The stream is read least-significant-bit first; every full group of
/// seven bits produces one output byte. `(len * 8) / 7` output bytes are
/// produced, so trailing padding bits short of a full group are ignored.
pub fn decompress_seven_bit(packed: &[u8]) -> Vec<u8> {
    let out_len = packed.len() * 8 / 7;
    let mut out = Vec::with_capacity(out_len);
    let mut accumulator: u32 = 0;
    let mut bit_count = 0u32;
    for &byte in packed {
        accumulator |= u32::from(byte) << bit_count;
        bit_count += 8;
        while bit_count >= 7 {
            out.push((accumulator & 0x7f) as u8);
            accumulator >>= 7;
            bit_count -= 7;
        }
    }
    out.truncate(out_len);
    out
}

#[cfg(test)]
pub(crate) fn compress_seven_bit(text: &[u8]) -> Vec<u8> {
    let mut out = vec![SCHEME_SEVEN_BIT];
    let mut accumulator: u32 = 0;
    let mut bit_count = 0u32;
    for &byte in text {
        accumulator |= u32::from(byte & 0x7f) << bit_count;
        bit_count += 7;
        while bit_count >= 8 {
            out.push((accumulator & 0xff) as u8);
            accumulator >>= 8;
            bit_count -= 8;
        }
    }
    if bit_count > 0 {
        out.push((accumulator & 0xff) as u8);
    }
    out
}
