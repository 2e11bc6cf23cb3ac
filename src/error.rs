// error.rs
// Error types surfaced by the Base32 codec, the OTP engine and URI ingestion.
// The binary wire decoder has no error type: it only skips and logs.

use thiserror::Error;

use crate::models::{Algorithm, OtpType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Base32Error {
    #[error("base32 secret is empty")]
    Empty,
    #[error("invalid base32 character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("invalid secret: {0}")]
    Decode(#[from] Base32Error),
    #[error("hmac failure: {0}")]
    Crypto(String),
    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(Algorithm),
    #[error("unsupported otp type {0:?}")]
    UnsupportedType(OtpType),
    #[error("unsupported digit count {0}, expected 6 to 8")]
    InvalidDigits(u32),
    #[error("period must be at least one second")]
    InvalidPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("account {name:?} carries no secret")]
    MissingSecret { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("malformed uri: {0}")]
    Malformed(String),
    #[error("unsupported uri scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("expected host {expected:?}, got {found:?}")]
    UnexpectedHost { expected: &'static str, found: String },
    #[error("unsupported otp type {0:?}")]
    UnsupportedType(String),
    #[error("missing query parameter {0:?}")]
    MissingParameter(&'static str),
    #[error("invalid value {value:?} for parameter {name:?}")]
    InvalidParameter { name: &'static str, value: String },
    #[error("migration data is not valid base64: {0}")]
    Base64(String),
    #[error("invalid secret: {0}")]
    Secret(#[from] Base32Error),
}
