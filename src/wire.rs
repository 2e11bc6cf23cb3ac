// wire.rs
// Tag/value reader and writer for the protobuf-style migration wire format.
//
// Reading never fails: truncated or malformed input is clamped or skipped, and
// every call that starts inside the buffer returns an offset past its start.

use tracing::warn;

pub const WIRE_VARINT: u8 = 0;
pub const WIRE_FIXED64: u8 = 1;
pub const WIRE_LEN: u8 = 2;
pub const WIRE_GROUP_START: u8 = 3;
pub const WIRE_GROUP_END: u8 = 4;
pub const WIRE_FIXED32: u8 = 5;

/// How far the recovery scan looks for a plausible tag.
pub const RECOVERY_WINDOW: usize = 100;
/// Bytes skipped when the recovery scan finds nothing.
pub const RECOVERY_FALLBACK: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
    /// Fixed-width, group and unknown wire types carry no usable value.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireField<'a> {
    pub field_number: u64,
    pub wire_type: u8,
    pub value: WireValue<'a>,
    pub next_offset: usize,
}

/// Reads a base-128 varint at `offset`, returning the value and the offset
/// after it. Groups past the 64th bit are consumed but dropped. A varint cut
/// off by the end of the buffer yields what was accumulated so far.
pub fn read_varint(buf: &[u8], offset: usize) -> (u64, usize) {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut pos = offset;

    while pos < buf.len() {
        let byte = buf[pos];
        pos += 1;
        if shift < 64 {
            value |= u64::from(byte & 0x7F) << shift;
        }
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    (value, pos)
}

/// Consumes one tag and its value starting at `offset`.
pub fn read_field(buf: &[u8], offset: usize) -> WireField<'_> {
    let len = buf.len();
    let (tag, pos) = read_varint(buf, offset);
    let field_number = tag >> 3;
    let wire_type = (tag & 0x7) as u8;

    let (value, next_offset) = match wire_type {
        _ if field_number == 0 => (WireValue::Skipped, recover(buf, pos, wire_type)),
        WIRE_VARINT => {
            let (v, next) = read_varint(buf, pos);
            (WireValue::Varint(v), next)
        }
        WIRE_FIXED64 => (WireValue::Skipped, pos.saturating_add(8).min(len)),
        WIRE_LEN => {
            let (declared, start) = read_varint(buf, pos);
            let wanted = usize::try_from(declared).unwrap_or(usize::MAX);
            let end = start.saturating_add(wanted).min(len);
            if end - start < wanted {
                warn!(
                    declared,
                    available = end - start,
                    "length-delimited field truncated by end of buffer"
                );
            }
            (WireValue::Bytes(&buf[start..end]), end)
        }
        WIRE_GROUP_START | WIRE_GROUP_END => (WireValue::Skipped, pos.saturating_add(1).min(len)),
        WIRE_FIXED32 => (WireValue::Skipped, pos.saturating_add(4).min(len)),
        _ => (WireValue::Skipped, recover(buf, pos, wire_type)),
    };

    WireField {
        field_number,
        wire_type,
        value,
        next_offset,
    }
}

/// Scans for the next byte that could start a tag: non-zero field number and
/// a wire type of at most 5.
fn recover(buf: &[u8], from: usize, wire_type: u8) -> usize {
    let len = buf.len();
    let limit = from.saturating_add(RECOVERY_WINDOW).min(len);
    let found = (from..limit).find(|&i| buf[i] >= 0x08 && buf[i] & 0x07 <= WIRE_FIXED32);
    let next = found.unwrap_or_else(|| from.saturating_add(RECOVERY_FALLBACK).min(len));
    warn!(wire_type, from, next, "unreadable tag, resynchronizing");
    next
}

pub fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn write_tag(field_number: u64, wire_type: u8, out: &mut Vec<u8>) {
    write_varint((field_number << 3) | u64::from(wire_type & 0x7), out);
}

pub fn write_varint_field(field_number: u64, value: u64, out: &mut Vec<u8>) {
    write_tag(field_number, WIRE_VARINT, out);
    write_varint(value, out);
}

pub fn write_bytes_field(field_number: u64, bytes: &[u8], out: &mut Vec<u8>) {
    write_tag(field_number, WIRE_LEN, out);
    write_varint(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}
