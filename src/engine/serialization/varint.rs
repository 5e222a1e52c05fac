// Copyright © 2026 Pathway

//! LEB128 variable-length integers, with zigzag mapping for signed values.

use super::DecodeFailure;

/// Longest LEB128 encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

pub fn write_uvarint(mut value: u64, out: &mut impl Extend<u8>) {
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.extend(Some(byte));
        if value == 0 {
            break;
        }
    }
}

pub fn read_uvarint(buf: &[u8], pos: &mut usize) -> Result<u64, DecodeFailure> {
    let start = *pos;
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let Some(&byte) = buf.get(*pos) else {
            return Err(DecodeFailure::new(start, "truncated varint"));
        };
        *pos += 1;
        let payload = u64::from(byte & 0x7F);
        if shift == 63 && payload > 1 {
            return Err(DecodeFailure::new(start, "varint overflows 64 bits"));
        }
        result |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift > 63 {
            return Err(DecodeFailure::new(start, "varint longer than 10 bytes"));
        }
    }
}

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    #[allow(clippy::cast_sign_loss)]
    let encoded = ((value << 1) ^ (value >> 63)) as u64;
    encoded
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    let decoded = ((value >> 1) as i64) ^ (-((value & 1) as i64));
    decoded
}

pub fn write_vlong(value: i64, out: &mut impl Extend<u8>) {
    write_uvarint(zigzag_encode(value), out);
}

pub fn read_vlong(buf: &[u8], pos: &mut usize) -> Result<i64, DecodeFailure> {
    read_uvarint(buf, pos).map(zigzag_decode)
}

pub fn write_vint(value: i32, out: &mut impl Extend<u8>) {
    write_vlong(i64::from(value), out);
}

pub fn read_vint(buf: &[u8], pos: &mut usize) -> Result<i32, DecodeFailure> {
    let start = *pos;
    let value = read_vlong(buf, pos)?;
    i32::try_from(value).map_err(|_| DecodeFailure::new(start, "vint out of 32-bit range"))
}

/// Reads a length prefix and checks that many bytes are actually available.
pub fn read_len(buf: &[u8], pos: &mut usize) -> Result<usize, DecodeFailure> {
    let start = *pos;
    let len = read_uvarint(buf, pos)?;
    match usize::try_from(len) {
        Ok(len) if len <= buf.len() - *pos => Ok(len),
        _ => Err(DecodeFailure::new(start, "length prefix exceeds buffer")),
    }
}
