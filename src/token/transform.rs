//! Token transform
//!
//! Reproduces the client-side computation of the `tk` request parameter.
//! The text is first turned into UTF-16 code units and then re-encoded into
//! UTF-8 style bytes *from those units*, which is how the upstream script
//! sees strings. Each byte is folded into an accumulator seeded with the
//! rotation epoch; the result is bound to the seed delta and reduced to six
//! decimal digits.
//!
//! # Example
//!
//! ```
//! use gtoken::token::{Seed, compute};
//!
//! let token = compute(&Seed::new(413627, 1987336334), "test");
//! assert_eq!(token, "950629.577246");
//! ```

use crate::token::rotation::{BYTE_MIX, FINAL_MIX, rotate_mix};
use crate::token::seed::Seed;

const SURROGATE_BASE: u32 = 0x10000;
const HIGH_SURROGATE_START: u32 = 0xD800;
const LOW_SURROGATE_START: u32 = 0xDC00;

/// Split a supplementary-plane code point into its high and low surrogates;
/// `None` for code points that fit in a single unit or lie outside Unicode
pub fn surrogate_pair(code_point: u32) -> Option<(u16, u16)> {
    if code_point > 0x10FFFF {
        return None;
    }
    let offset = code_point.checked_sub(SURROGATE_BASE)?;
    let high = offset / 0x400 + HIGH_SURROGATE_START;
    let low = offset % 0x400 + LOW_SURROGATE_START;
    Some((high as u16, low as u16))
}

/// Text as UTF-16 code units
pub fn utf16_units(text: &str) -> Vec<u16> {
    let mut units = Vec::with_capacity(text.len());
    for c in text.chars() {
        match surrogate_pair(c as u32) {
            Some((high, low)) => {
                units.push(high);
                units.push(low);
            }
            None => units.push(c as u32 as u16),
        }
    }
    units
}

/// UTF-8 style bytes built from UTF-16 units.
///
/// A high surrogate immediately followed by a low surrogate is recombined into
/// a four-byte sequence; an unpaired surrogate is emitted as a three-byte
/// sequence of its own value.
pub fn utf8_like_bytes(units: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(units.len() * 3);
    let mut i = 0;
    while i < units.len() {
        let mut l = units[i] as u32;
        if l < 128 {
            bytes.push(l as u8);
        } else {
            if l < 2048 {
                bytes.push((l >> 6 | 192) as u8);
            } else {
                let paired = (l & 0xFC00) == 0xD800
                    && i + 1 < units.len()
                    && (units[i + 1] as u32 & 0xFC00) == 0xDC00;
                if paired {
                    i += 1;
                    l = SURROGATE_BASE + ((l & 1023) << 10) + (units[i] as u32 & 1023);
                    bytes.push((l >> 18 | 240) as u8);
                    bytes.push((l >> 12 & 63 | 128) as u8);
                } else {
                    bytes.push((l >> 12 | 224) as u8);
                }
                bytes.push((l >> 6 & 63 | 128) as u8);
            }
            bytes.push((l & 63 | 128) as u8);
        }
        i += 1;
    }
    bytes
}

/// Compute the token for `text` under `seed`
pub fn compute(seed: &Seed, text: &str) -> String {
    compute_units(seed, &utf16_units(text))
}

/// Compute the token for a raw UTF-16 unit sequence, which may hold unpaired surrogates
pub fn compute_units(seed: &Seed, units: &[u16]) -> String {
    let (epoch, delta) = seed.components();

    let mut acc = epoch;
    for byte in utf8_like_bytes(units) {
        acc = rotate_mix(acc.wrapping_add(byte as i64), BYTE_MIX);
    }
    acc = rotate_mix(acc, FINAL_MIX);
    acc ^= delta;
    if acc < 0 {
        acc = (acc & 0x7FFF_FFFF) + 0x8000_0000;
    }
    acc %= 1_000_000;

    format!("{}.{}", acc, acc ^ epoch)
}
