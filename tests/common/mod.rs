// Hand-built wire fixtures, independent of the crate's own encoder.
#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::STANDARD};

/// RFC 4226 / RFC 6238 SHA-1 test key, ASCII "12345678901234567890".
pub const RFC_SECRET_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
pub const RFC_SECRET: &[u8] = b"12345678901234567890";

pub fn varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

pub fn tag(field: u64, wire_type: u64) -> Vec<u8> {
    varint((field << 3) | wire_type)
}

pub fn bytes_field(field: u64, bytes: &[u8]) -> Vec<u8> {
    let mut out = tag(field, 2);
    out.extend(varint(bytes.len() as u64));
    out.extend_from_slice(bytes);
    out
}

pub fn varint_field(field: u64, value: u64) -> Vec<u8> {
    let mut out = tag(field, 0);
    out.extend(varint(value));
    out
}

/// Builder for one `OtpParameters` submessage.
#[derive(Default, Clone)]
pub struct ParamBuilder {
    bytes: Vec<u8>,
}

impl ParamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secret(mut self, secret: &[u8]) -> Self {
        self.bytes.extend(bytes_field(1, secret));
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.bytes.extend(bytes_field(2, name.as_bytes()));
        self
    }

    pub fn raw_name(mut self, name: &[u8]) -> Self {
        self.bytes.extend(bytes_field(2, name));
        self
    }

    pub fn issuer(mut self, issuer: &str) -> Self {
        self.bytes.extend(bytes_field(3, issuer.as_bytes()));
        self
    }

    pub fn algorithm(mut self, value: u64) -> Self {
        self.bytes.extend(varint_field(4, value));
        self
    }

    pub fn digits(mut self, value: u64) -> Self {
        self.bytes.extend(varint_field(5, value));
        self
    }

    pub fn otp_type(mut self, value: u64) -> Self {
        self.bytes.extend(varint_field(6, value));
        self
    }

    pub fn counter(mut self, value: u64) -> Self {
        self.bytes.extend(varint_field(7, value));
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    /// Wrapped as field 1 of the outer payload.
    pub fn as_entry(self) -> Vec<u8> {
        bytes_field(1, &self.bytes)
    }
}

pub fn payload(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.concat()
}

pub fn migration_uri(payload: &[u8]) -> String {
    let data = STANDARD.encode(payload);
    let encoded = data.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D");
    format!("otpauth-migration://offline?data={encoded}")
}

pub fn account(name: &str, issuer: &str, secret: &[u8]) -> Vec<u8> {
    ParamBuilder::new()
        .secret(secret)
        .name(name)
        .issuer(issuer)
        .algorithm(1)
        .digits(1)
        .otp_type(2)
        .as_entry()
}
