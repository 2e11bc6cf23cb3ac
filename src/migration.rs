// migration.rs
// Decoder and encoder for `otpauth-migration://offline?data=...` payloads.
//
// Decoding is fault-tolerant: malformed bytes are skipped and logged, never
// returned as errors. Submessage order is preserved end to end.

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD},
};
use tracing::{debug, warn};
use url::{Url, form_urlencoded};

use crate::base32;
use crate::error::{AccountError, Base32Error, UriError};
use crate::models::{
    Account, Algorithm, DigitCount, ImportedAccount, MigrationPayload, OtpParameter, OtpType,
};
use crate::totp::DEFAULT_PERIOD;
use crate::wire::{self, WireValue, read_field};

pub const MIGRATION_SCHEME: &str = "otpauth-migration";
pub const MIGRATION_HOST: &str = "offline";
pub const UNKNOWN_ACCOUNT: &str = "Unknown Account";
pub const UNKNOWN_ISSUER: &str = "Unknown";
const MAX_STORAGE_NAME: usize = 50;

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// What to do with a submessage that has no secret bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSecretPolicy {
    /// Drop the account and report it.
    #[default]
    Reject,
    /// Invent a deterministic Base32 string from the display name. The codes it
    /// produces are meaningless; only for matching previously stored data.
    Placeholder,
}

/// Decodes one `OtpParameters` submessage. Unknown fields and fields whose wire
/// type does not match are skipped.
pub fn decode_otp_parameter(bytes: &[u8]) -> OtpParameter {
    let mut params = OtpParameter::default();
    let mut offset = 0;

    while offset < bytes.len() {
        let field = read_field(bytes, offset);
        offset = field.next_offset.max(offset + 1);

        match (field.field_number, field.value) {
            (1, WireValue::Bytes(b)) => params.secret = Some(b.to_vec()),
            (2, WireValue::Bytes(b)) => params.name = Some(decode_text(b)),
            (3, WireValue::Bytes(b)) => params.issuer = Some(decode_text(b)),
            (4, WireValue::Varint(v)) => params.algorithm = Algorithm::from_wire(v),
            (5, WireValue::Varint(v)) => params.digits = DigitCount::from_wire(v),
            (6, WireValue::Varint(v)) => params.otp_type = OtpType::from_wire(v),
            (7, WireValue::Varint(v)) => params.counter = Some(v as i64),
            (n @ 1..=7, _) => {
                warn!(field = n, wire_type = field.wire_type, "otp parameter field has unexpected wire type")
            }
            (n, _) => debug!(field = n, "skipping unknown otp parameter field"),
        }
    }
    params
}

/// Decodes a whole migration payload. Never fails; the worst case is an
/// empty parameter list.
pub fn decode_migration_payload(buf: &[u8]) -> MigrationPayload {
    let mut payload = MigrationPayload::default();
    let mut offset = 0;

    while offset < buf.len() {
        let field = read_field(buf, offset);
        offset = field.next_offset.max(offset + 1);

        match (field.field_number, field.value) {
            (1, WireValue::Bytes(b)) => {
                let params = decode_otp_parameter(b);
                debug!(index = payload.otp_parameters.len(), len = b.len(), "decoded otp parameters");
                payload.otp_parameters.push(params);
            }
            (2, WireValue::Varint(v)) => payload.version = Some(v),
            (3, WireValue::Varint(v)) => payload.batch_size = Some(v),
            (4, WireValue::Varint(v)) => payload.batch_index = Some(v),
            (5, WireValue::Varint(v)) => payload.batch_id = Some(v),
            (n, _) => debug!(field = n, wire_type = field.wire_type, "skipping migration field"),
        }
    }
    payload
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            warn!(error = %e, "text field is not utf-8, reading as latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Removes C0 and C1 control characters, keeping everything else verbatim.
pub fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F..=0x9F))
        .collect()
}

fn clean(s: Option<&str>) -> Option<String> {
    let cleaned = strip_control_chars(s?.trim());
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

impl OtpParameter {
    /// Name shown to the user: name, else issuer, else a fixed fallback.
    pub fn display_name(&self) -> String {
        clean(self.name.as_deref())
            .or_else(|| clean(self.issuer.as_deref()))
            .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string())
    }

    /// Normalizes into an [`Account`].
    pub fn to_account(&self, policy: MissingSecretPolicy) -> Result<Account, AccountError> {
        let name = self.display_name();
        let secret = match self.secret.as_deref() {
            Some(bytes) if !bytes.is_empty() => base32::encode(bytes),
            _ => match policy {
                MissingSecretPolicy::Reject => return Err(AccountError::MissingSecret { name }),
                MissingSecretPolicy::Placeholder => placeholder_secret(&name),
            },
        };
        let issuer = self
            .issuer
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_ISSUER)
            .to_string();

        Ok(Account {
            name,
            issuer,
            secret,
            otp_type: match self.otp_type {
                OtpType::Unspecified => OtpType::Totp,
                t => t,
            },
            algorithm: match self.algorithm {
                Algorithm::Unspecified => Algorithm::Sha1,
                a => a,
            },
            digits: self.digits.width(),
        })
    }

    /// Inverse of [`OtpParameter::to_account`] for export.
    pub fn from_account(account: &Account, counter: Option<i64>) -> Result<Self, Base32Error> {
        let secret = base32::decode(&account.secret)?;
        if secret.is_empty() {
            return Err(Base32Error::Empty);
        }
        Ok(OtpParameter {
            secret: Some(secret),
            name: Some(account.name.clone()),
            issuer: Some(account.issuer.clone()),
            algorithm: account.algorithm,
            digits: DigitCount::from_width(account.digits),
            otp_type: account.otp_type,
            counter,
        })
    }
}

/// Deterministic 32-character Base32 string derived from `identifier`, using a
/// 31-multiplier rolling hash over UTF-16 code units.
pub fn placeholder_secret(identifier: &str) -> String {
    const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
    let hash = identifier
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit)));
    (0..32i64)
        .map(|i| ALPHABET[((i64::from(hash) + i).abs() % 32) as usize] as char)
        .collect()
}

impl MigrationPayload {
    /// Normalizes every parameter in order, logging and dropping the ones the
    /// policy rejects.
    pub fn accounts(&self, policy: MissingSecretPolicy) -> Vec<Account> {
        self.imported_accounts(policy)
            .into_iter()
            .map(|imported| imported.account)
            .collect()
    }

    pub fn imported_accounts(&self, policy: MissingSecretPolicy) -> Vec<ImportedAccount> {
        self.otp_parameters
            .iter()
            .enumerate()
            .filter_map(|(index, params)| match params.to_account(policy) {
                Ok(account) => Some(ImportedAccount {
                    counter: match account.otp_type {
                        OtpType::Hotp => Some(params.counter.unwrap_or(0).max(0) as u64),
                        _ => None,
                    },
                    account,
                    period: DEFAULT_PERIOD,
                }),
                Err(e) => {
                    warn!(index, error = %e, "skipping migrated account");
                    None
                }
            })
            .collect()
    }
}

/// Serializes a payload in field order; absent optionals are omitted.
pub fn encode_migration_payload(payload: &MigrationPayload) -> Vec<u8> {
    let mut out = Vec::new();
    for params in &payload.otp_parameters {
        wire::write_bytes_field(1, &encode_otp_parameter(params), &mut out);
    }
    let meta = [
        (2, payload.version),
        (3, payload.batch_size),
        (4, payload.batch_index),
        (5, payload.batch_id),
    ];
    for (field, value) in meta {
        if let Some(v) = value {
            wire::write_varint_field(field, v, &mut out);
        }
    }
    out
}

pub fn encode_otp_parameter(params: &OtpParameter) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(secret) = &params.secret {
        wire::write_bytes_field(1, secret, &mut out);
    }
    if let Some(name) = &params.name {
        wire::write_bytes_field(2, name.as_bytes(), &mut out);
    }
    if let Some(issuer) = &params.issuer {
        wire::write_bytes_field(3, issuer.as_bytes(), &mut out);
    }
    wire::write_varint_field(4, params.algorithm.to_wire(), &mut out);
    wire::write_varint_field(5, params.digits.to_wire(), &mut out);
    wire::write_varint_field(6, params.otp_type.to_wire(), &mut out);
    if let Some(counter) = params.counter {
        wire::write_varint_field(7, counter as u64, &mut out);
    }
    out
}

/// Parses `otpauth-migration://offline?data=<base64>` and decodes the payload.
pub fn parse_migration_uri(uri: &str) -> Result<MigrationPayload, UriError> {
    let url = Url::parse(uri.trim()).map_err(|e| UriError::Malformed(e.to_string()))?;
    if url.scheme() != MIGRATION_SCHEME {
        return Err(UriError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = url.host_str().unwrap_or_default();
    if host != MIGRATION_HOST {
        return Err(UriError::UnexpectedHost {
            expected: MIGRATION_HOST,
            found: host.to_string(),
        });
    }

    let data = url
        .query_pairs()
        .find(|(key, _)| key == "data")
        .map(|(_, value)| value.replace(' ', "+"))
        .ok_or(UriError::MissingParameter("data"))?;

    let bytes = LENIENT_STANDARD
        .decode(data.trim())
        .or_else(|_| LENIENT_URL_SAFE.decode(data.trim()))
        .map_err(|e| UriError::Base64(e.to_string()))?;
    debug!(len = bytes.len(), "decoded migration data");

    Ok(decode_migration_payload(&bytes))
}

pub fn build_migration_uri(payload: &MigrationPayload) -> String {
    let data = STANDARD.encode(encode_migration_payload(payload));
    let encoded: String = form_urlencoded::byte_serialize(data.as_bytes()).collect();
    format!("{MIGRATION_SCHEME}://{MIGRATION_HOST}?data={encoded}")
}

/// Key under which a bulk-imported account is stored: cleaned name capped at
/// 50 characters, suffixed with its position in the batch.
pub fn storage_key(name: &str, index: usize) -> String {
    let cleaned: String = strip_control_chars(name).trim().chars().take(MAX_STORAGE_NAME).collect();
    let base = if cleaned.is_empty() {
        format!("Migrated account {}", index + 1)
    } else {
        cleaned
    };
    format!("{base}_{index}")
}
