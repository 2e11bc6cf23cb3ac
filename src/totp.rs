// totp.rs
// HOTP/TOTP engine (RFC 4226 / RFC 6238): Base32 secret -> HMAC -> dynamic truncation.
// Codes are computed fresh on every call; nothing is cached.

use chrono::Utc;
use hmac::{Hmac, Mac, digest::KeyInit};
use rand::RngCore;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::base32;
use crate::error::{Base32Error, OtpError};
use crate::models::{Algorithm, ImportedAccount, OtpType};

pub const MIN_SECRET_BYTES: usize = 16; // 128 bits (mandatory minimum)
pub const DEFAULT_SECRET_BYTES: usize = 20; // 160 bits (recommended)
pub const DEFAULT_PERIOD: u64 = 30;
pub const DEFAULT_DIGITS: u32 = 6;
pub const DEFAULT_WINDOW: u64 = 1;

/// Decodes a Base32 secret into HMAC key bytes. Empty keys are rejected.
pub fn base32_to_key(secret: &str) -> Result<Vec<u8>, OtpError> {
    let key = base32::decode(secret)?;
    if key.is_empty() {
        return Err(Base32Error::Empty.into());
    }
    Ok(key)
}

fn sign<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError> {
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|e| OtpError::Crypto(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_digest(algorithm: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>, OtpError> {
    match algorithm {
        Algorithm::Sha1 | Algorithm::Unspecified => sign::<Hmac<Sha1>>(key, message),
        Algorithm::Sha256 => sign::<Hmac<Sha256>>(key, message),
        Algorithm::Sha512 => sign::<Hmac<Sha512>>(key, message),
        Algorithm::Md5 | Algorithm::Other(_) => Err(OtpError::UnsupportedAlgorithm(algorithm)),
    }
}

fn check_digits(digits: u32) -> Result<u32, OtpError> {
    if (6..=8).contains(&digits) {
        Ok(digits)
    } else {
        Err(OtpError::InvalidDigits(digits))
    }
}

/// RFC 4226 HOTP with HMAC-SHA1.
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> Result<String, OtpError> {
    hotp_with(Algorithm::Sha1, key, counter, digits)
}

/// HOTP over the given HMAC algorithm. The truncation offset comes from the
/// low nibble of the last digest byte.
pub fn hotp_with(
    algorithm: Algorithm,
    key: &[u8],
    counter: u64,
    digits: u32,
) -> Result<String, OtpError> {
    let digits = check_digits(digits)?;
    let mac = hmac_digest(algorithm, key, &counter.to_be_bytes())?;

    let last = mac
        .last()
        .ok_or_else(|| OtpError::Crypto("empty digest".to_string()))?;
    let offset = (last & 0x0F) as usize;
    let window: [u8; 4] = mac
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| OtpError::Crypto("digest too short for truncation".to_string()))?;
    let binary = u32::from_be_bytes(window) & 0x7FFF_FFFF;

    let code = u64::from(binary) % 10u64.pow(digits);
    Ok(format!("{code:0width$}", width = digits as usize))
}

/// Time step containing `unix_seconds`.
pub fn counter_at(unix_seconds: u64, period: u64) -> Result<u64, OtpError> {
    if period == 0 {
        return Err(OtpError::InvalidPeriod);
    }
    Ok(unix_seconds / period)
}

/// Seconds left before the code for `unix_seconds` rolls over.
pub fn remaining_seconds(unix_seconds: u64, period: u64) -> u64 {
    if period == 0 {
        return 0;
    }
    period - unix_seconds % period
}

pub fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// SHA-1 TOTP for an explicit clock.
pub fn totp_at(secret: &str, unix_seconds: u64, period: u64, digits: u32) -> Result<String, OtpError> {
    let key = base32_to_key(secret)?;
    hotp(&key, counter_at(unix_seconds, period)?, digits)
}

/// SHA-1 TOTP for the current system time.
pub fn totp(secret: &str, period: u64, digits: u32) -> Result<String, OtpError> {
    totp_at(secret, now_unix(), period, digits)
}

/// Accepts `token` if it matches the step containing `unix_seconds` or any of
/// the `window` steps on either side. Every step is compared at `digits`
/// width. Whitespace inside the token is ignored.
pub fn verify_totp_at(
    token: &str,
    secret: &str,
    unix_seconds: u64,
    period: u64,
    digits: u32,
    window: u64,
) -> Result<bool, OtpError> {
    let key = base32_to_key(secret)?;
    verify_key_at(Algorithm::Sha1, &key, token, unix_seconds, period, digits, window)
}

pub fn verify_totp(
    token: &str,
    secret: &str,
    period: u64,
    digits: u32,
    window: u64,
) -> Result<bool, OtpError> {
    verify_totp_at(token, secret, now_unix(), period, digits, window)
}

fn verify_key_at(
    algorithm: Algorithm,
    key: &[u8],
    token: &str,
    unix_seconds: u64,
    period: u64,
    digits: u32,
    window: u64,
) -> Result<bool, OtpError> {
    let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    let current = counter_at(unix_seconds, period)?;

    if hotp_with(algorithm, key, current, digits)? == token {
        return Ok(true);
    }
    for i in 1..=window {
        let neighbours = [current.checked_sub(i), current.checked_add(i)];
        for counter in neighbours.into_iter().flatten() {
            if hotp_with(algorithm, key, counter, digits)? == token {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Groups a 6-digit code as `"123 456"`; other widths are returned unchanged.
pub fn format_token(code: &str) -> String {
    if code.len() == 6 {
        format!("{} {}", &code[..3], &code[3..])
    } else {
        code.to_string()
    }
}

/// Generate a random Base32 (NOPAD) secret of `bytes` length.
pub fn generate_base32_secret_n(bytes: usize) -> String {
    let n = bytes.max(MIN_SECRET_BYTES);
    let mut buf = vec![0u8; n];
    let mut rng = rand::rng(); // rand 0.9: thread-local RNG
    rng.fill_bytes(&mut buf);
    base32::encode(&buf).trim_end_matches('=').to_string()
}

/// A secret bound to its algorithm, width and period.
#[derive(Debug, Clone)]
pub struct OtpGenerator {
    key: Vec<u8>,
    pub algorithm: Algorithm,
    pub digits: u32,
    pub period: u64,
}

impl OtpGenerator {
    pub fn new(secret: &str, algorithm: Algorithm, digits: u32, period: u64) -> Result<Self, OtpError> {
        if period == 0 {
            return Err(OtpError::InvalidPeriod);
        }
        if matches!(algorithm, Algorithm::Md5 | Algorithm::Other(_)) {
            return Err(OtpError::UnsupportedAlgorithm(algorithm));
        }
        Ok(Self {
            key: base32_to_key(secret)?,
            algorithm,
            digits: check_digits(digits)?,
            period,
        })
    }

    pub fn for_account(imported: &ImportedAccount) -> Result<Self, OtpError> {
        let account = &imported.account;
        if let OtpType::Other(_) = account.otp_type {
            return Err(OtpError::UnsupportedType(account.otp_type));
        }
        Self::new(&account.secret, account.algorithm, account.digits, imported.period)
    }

    pub fn hotp(&self, counter: u64) -> Result<String, OtpError> {
        hotp_with(self.algorithm, &self.key, counter, self.digits)
    }

    pub fn totp_at(&self, unix_seconds: u64) -> Result<String, OtpError> {
        self.hotp(counter_at(unix_seconds, self.period)?)
    }

    pub fn totp_now(&self) -> Result<String, OtpError> {
        self.totp_at(now_unix())
    }

    pub fn verify_at(&self, token: &str, unix_seconds: u64, window: u64) -> Result<bool, OtpError> {
        verify_key_at(self.algorithm, &self.key, token, unix_seconds, self.period, self.digits, window)
    }

    /// Code to display for an imported account: TOTP for time-based entries,
    /// HOTP at the stored counter otherwise.
    pub fn current_code(&self, imported: &ImportedAccount, unix_seconds: u64) -> Result<String, OtpError> {
        match imported.account.otp_type {
            OtpType::Hotp => self.hotp(imported.counter.unwrap_or(0)),
            _ => self.totp_at(unix_seconds),
        }
    }
}
