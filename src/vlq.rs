//! Base64 VLQ codec.
//!
//! Ported and adapted from the VLQ codec in `oxc_sourcemap`
//! (`decoder.rs`/`encoder.rs`, itself ported from
//! <https://github.com/getsentry/rust-sourcemap>). Alphabet is
//! `A-Z a-z 0-9 + /` (values 0-63); bit 5 (0x20) of each decoded value is the
//! continuation flag, the low bit of the *assembled* integer is the sign.

use crate::error::{Error, Result};

#[rustfmt::skip]
static B64: [i8; 256] = [
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 62, -1, -1, -1, 63, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, -1, -1, -1, -1, -1, -1,
    -1,  0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, -1, -1, -1, -1, -1,
    -1, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 50, 51, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
];

static B64_CHARS: [u8; 64] = [
    b'A', b'B', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'J', b'K', b'L', b'M', b'N', b'O', b'P',
    b'Q', b'R', b'S', b'T', b'U', b'V', b'W', b'X', b'Y', b'Z', b'a', b'b', b'c', b'd', b'e', b'f',
    b'g', b'h', b'i', b'j', b'k', b'l', b'm', b'n', b'o', b'p', b'q', b'r', b's', b't', b'u', b'v',
    b'w', b'x', b'y', b'z', b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'+', b'/',
];

/// Decode one VLQ-encoded segment (a run of characters up to the next `,`
/// or `;`, or end of input) into up to 5 signed fields. Returns the number
/// of fields decoded (the segment's arity); does not validate arity against
/// {1,4,5} — callers check that, since the valid set differs for the
/// two-field-count positions in a wire segment.
pub fn decode_segment(bytes: &[u8], cursor: &mut usize, out: &mut [i64; 5]) -> Result<usize> {
    let mut len = 0usize;
    let mut value = 0i64;
    let mut shift = 0u32;

    while *cursor < bytes.len() {
        let c = bytes[*cursor];
        if c == b',' || c == b';' {
            break;
        }

        let enc = B64[c as usize];
        if enc < 0 {
            return Err(Error::MalformedVlq(format!("invalid base64 character {:?}", c as char)));
        }
        let enc = i64::from(enc);
        let digit = enc & 0b1_1111;
        let continuation = enc >> 5;

        if shift > 62 {
            return Err(Error::MalformedVlq("VLQ value exceeds 64 bits of shift".to_string()));
        }
        value += digit << shift;
        *cursor += 1;
        shift += 5;

        if continuation == 0 {
            let negative = value & 1 != 0;
            let mut magnitude = value >> 1;
            if negative {
                magnitude = -magnitude;
            }
            if len >= out.len() {
                return Err(Error::MalformedVlq("VLQ segment has more than 5 fields".to_string()));
            }
            if magnitude > i64::from(i32::MAX) || magnitude < i64::from(i32::MIN) {
                return Err(Error::MalformedVlq(format!(
                    "VLQ value {magnitude} exceeds 32-bit signed range"
                )));
            }
            out[len] = magnitude;
            len += 1;
            value = 0;
            shift = 0;
        }
    }

    if shift != 0 || value != 0 {
        return Err(Error::MalformedVlq("truncated VLQ continuation at end of segment".to_string()));
    }
    if len == 0 {
        return Err(Error::MalformedVlq("empty VLQ segment".to_string()));
    }
    Ok(len)
}

/// Encode `num` as a VLQ and append it to `out`. `num` is the *signed delta*
/// carried between successive segments on a field.
pub fn encode_diff(out: &mut String, current: u32, previous: u32) {
    encode(out, i64::from(current) - i64::from(previous));
}

fn encode(out: &mut String, num: i64) {
    let mut num = if num < 0 { ((-num) << 1) + 1 } else { num << 1 };
    loop {
        let mut digit = (num & 0b1_1111) as u8;
        num >>= 5;
        if num > 0 {
            digit |= 0b10_0000;
        }
        out.push(B64_CHARS[digit as usize & 0b11_1111] as char);
        if num == 0 {
            break;
        }
    }
}
