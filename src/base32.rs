// base32.rs
// RFC 4648 Base32 with the standard alphabet. Decoding is lenient about
// separators and case; encoding always pads to a multiple of 8 characters.

use crate::error::Base32Error;

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

fn symbol_value(c: u8) -> Option<u8> {
    match c.to_ascii_uppercase() {
        c @ b'A'..=b'Z' => Some(c - b'A'),
        c @ b'2'..=b'7' => Some(c - b'2' + 26),
        _ => None,
    }
}

/// Encodes bytes MSB-first into 5-bit groups, zero-filling the last group and
/// padding the output with `=` to the next multiple of 8.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &b in bytes {
        buffer = (buffer << 8) | b as u32;
        bits += 8;
        while bits >= 5 {
            let idx = (buffer >> (bits - 5)) & 0x1F;
            out.push(ALPHABET[idx as usize] as char);
            bits -= 5;
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        let idx = (buffer << (5 - bits)) & 0x1F;
        out.push(ALPHABET[idx as usize] as char);
    }
    while out.len() % 8 != 0 {
        out.push('=');
    }
    out
}

/// Decodes after dropping everything outside `[A-Za-z2-7=]`. Stops at the
/// first `=`; trailing bits that do not fill a byte are discarded. No symbols
/// at all decodes to an empty vector.
pub fn decode(s: &str) -> Result<Vec<u8>, Base32Error> {
    let cleaned: Vec<u8> = s
        .bytes()
        .filter(|c| c.is_ascii_alphabetic() || (b'2'..=b'7').contains(c) || *c == b'=')
        .collect();
    decode_symbols(cleaned.iter().copied().enumerate())
}

/// Decodes a secret typed or pasted by a person: whitespace and `-` separators
/// are ignored, any other non-alphabet character before padding is an error.
pub fn decode_strict(s: &str) -> Result<Vec<u8>, Base32Error> {
    let symbols = s
        .char_indices()
        .filter(|(_, c)| !c.is_whitespace() && *c != '-');
    let mut cleaned = Vec::with_capacity(s.len());
    for (position, ch) in symbols {
        if ch == '=' {
            break;
        }
        if !ch.is_ascii() || symbol_value(ch as u8).is_none() {
            return Err(Base32Error::InvalidCharacter { ch, position });
        }
        cleaned.push((position, ch as u8));
    }
    decode_symbols(cleaned.into_iter())
}

fn decode_symbols(symbols: impl Iterator<Item = (usize, u8)>) -> Result<Vec<u8>, Base32Error> {
    let mut out = Vec::new();
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for (position, c) in symbols {
        if c == b'=' {
            break;
        }
        let value = symbol_value(c).ok_or(Base32Error::InvalidCharacter {
            ch: c as char,
            position,
        })?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            out.push((buffer >> (bits - 8)) as u8);
            bits -= 8;
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(out)
}
