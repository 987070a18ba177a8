//! Bit-rotation mixing shared by every stage of the token transform

/// Control string applied after each input byte
pub const BYTE_MIX: &str = "+-a^+6";

/// Control string applied once after all bytes
pub const FINAL_MIX: &str = "+-3^+b+-f";

const LOW_32: i64 = 0xFFFF_FFFF;

/// Zero-filling right shift over the low 32 bits of `value`; shifting out
/// every bit yields 0
pub fn unsigned_shr(value: i64, amount: u32) -> i64 {
    ((value & LOW_32) as u64).checked_shr(amount).unwrap_or(0) as i64
}

/// Shift amount encoded by one control character: `a`.. means 10.., digits are literal
fn shift_amount(c: u8) -> u32 {
    if c >= b'a' {
        (c - b'a') as u32 + 10
    } else {
        (c as char).to_digit(10).unwrap_or(0)
    }
}

/// Fold `value` through every `(op, direction, amount)` triplet of `control`.
///
/// `direction == '+'` shifts right without sign fill, anything else shifts
/// left. `op == '+'` adds and masks to 32 bits, anything else XORs. A trailing
/// partial triplet is ignored.
pub fn rotate_mix(value: i64, control: &str) -> i64 {
    let mut value = value;
    for triplet in control.as_bytes().chunks_exact(3) {
        let amount = shift_amount(triplet[2]);
        let shifted = if triplet[1] == b'+' {
            unsigned_shr(value, amount)
        } else {
            value.checked_shl(amount).unwrap_or(0)
        };
        value = if triplet[0] == b'+' {
            value.wrapping_add(shifted) & LOW_32
        } else {
            value ^ shifted
        };
    }
    value
}
