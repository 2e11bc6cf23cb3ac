// models.rs
// Domain models for migration payloads, decoded OTP parameters and normalized accounts.

use serde::{Deserialize, Serialize};

/// Hash algorithm as numbered in the migration wire format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    Unspecified,
    Sha1,
    Sha256,
    Sha512,
    Md5,
    /// Value outside the known range, kept so callers can refuse it.
    Other(u64),
}

impl Algorithm {
    pub fn from_wire(value: u64) -> Self {
        match value {
            0 => Algorithm::Unspecified,
            1 => Algorithm::Sha1,
            2 => Algorithm::Sha256,
            3 => Algorithm::Sha512,
            4 => Algorithm::Md5,
            other => Algorithm::Other(other),
        }
    }

    pub fn to_wire(self) -> u64 {
        match self {
            Algorithm::Unspecified => 0,
            Algorithm::Sha1 => 1,
            Algorithm::Sha256 => 2,
            Algorithm::Sha512 => 3,
            Algorithm::Md5 => 4,
            Algorithm::Other(v) => v,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Unspecified => "UNSPECIFIED",
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
            Algorithm::Md5 => "MD5",
            Algorithm::Other(_) => "UNKNOWN",
        }
    }

    /// Parses the `algorithm` query value of an otpauth URI (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SHA1" => Some(Algorithm::Sha1),
            "SHA256" => Some(Algorithm::Sha256),
            "SHA512" => Some(Algorithm::Sha512),
            "MD5" => Some(Algorithm::Md5),
            _ => None,
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Sha1
    }
}

/// Digit count enum of the wire format. Only `Six` yields 6-digit codes; an
/// absent field decodes as `Six`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DigitCount {
    Unspecified,
    Six,
    Eight,
    Other(u64),
}

impl DigitCount {
    pub fn from_wire(value: u64) -> Self {
        match value {
            0 => DigitCount::Unspecified,
            1 => DigitCount::Six,
            2 => DigitCount::Eight,
            other => DigitCount::Other(other),
        }
    }

    pub fn to_wire(self) -> u64 {
        match self {
            DigitCount::Unspecified => 0,
            DigitCount::Six => 1,
            DigitCount::Eight => 2,
            DigitCount::Other(v) => v,
        }
    }

    /// Code width for this enum value.
    pub fn width(self) -> u32 {
        match self {
            DigitCount::Six => 6,
            _ => 8,
        }
    }

    pub fn from_width(width: u32) -> Self {
        if width == 8 { DigitCount::Eight } else { DigitCount::Six }
    }
}

impl Default for DigitCount {
    fn default() -> Self {
        DigitCount::Six
    }
}

/// Counter-based or time-based token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OtpType {
    Unspecified,
    Hotp,
    Totp,
    Other(u64),
}

impl OtpType {
    pub fn from_wire(value: u64) -> Self {
        match value {
            0 => OtpType::Unspecified,
            1 => OtpType::Hotp,
            2 => OtpType::Totp,
            other => OtpType::Other(other),
        }
    }

    pub fn to_wire(self) -> u64 {
        match self {
            OtpType::Unspecified => 0,
            OtpType::Hotp => 1,
            OtpType::Totp => 2,
            OtpType::Other(v) => v,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OtpType::Unspecified => "unspecified",
            OtpType::Hotp => "hotp",
            OtpType::Totp => "totp",
            OtpType::Other(_) => "unknown",
        }
    }
}

impl Default for OtpType {
    fn default() -> Self {
        OtpType::Totp
    }
}

/// One account submessage as decoded from the wire, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpParameter {
    pub secret: Option<Vec<u8>>,
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub algorithm: Algorithm,
    pub digits: DigitCount,
    pub otp_type: OtpType,
    pub counter: Option<i64>,
}

/// Top-level migration message. `otp_parameters` keeps byte-stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPayload {
    pub otp_parameters: Vec<OtpParameter>,
    pub version: Option<u64>,
    pub batch_size: Option<u64>,
    pub batch_index: Option<u64>,
    pub batch_id: Option<u64>,
}

/// Normalized account handed to storage collaborators. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub issuer: String,
    /// Padded Base32 secret.
    pub secret: String,
    #[serde(rename = "type")]
    pub otp_type: OtpType,
    pub algorithm: Algorithm,
    pub digits: u32,
}

/// An account produced by any import path, with the timing parameters the
/// migration format does not carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportedAccount {
    #[serde(flatten)]
    pub account: Account,
    pub period: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<u64>,
}
