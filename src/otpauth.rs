// otpauth.rs
// Single-account `otpauth://totp/...` and `otpauth://hotp/...` URIs: parsing,
// canonical rebuilding, and label splitting. No binary decoding involved.

use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::{Url, form_urlencoded};

use crate::base32;
use crate::error::{Base32Error, UriError};
use crate::migration::{UNKNOWN_ACCOUNT, UNKNOWN_ISSUER, strip_control_chars};
use crate::models::{Account, Algorithm, ImportedAccount, OtpType};
use crate::totp::{DEFAULT_DIGITS, DEFAULT_PERIOD};

pub const OTPAUTH_SCHEME: &str = "otpauth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpAuthUri {
    pub otp_type: OtpType,
    /// Decoded label, usually `issuer:account`.
    pub label: String,
    pub issuer: Option<String>,
    /// Canonical padded upper-case Base32.
    pub secret: String,
    pub algorithm: Algorithm,
    pub digits: u32,
    pub period: u64,
    pub counter: Option<u64>,
}

/// Issuer/name pair recovered from a free-form account label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelParts {
    pub issuer: Option<String>,
    pub name: String,
    pub display_name: String,
}

pub fn parse_otpauth_uri(uri: &str) -> Result<OtpAuthUri, UriError> {
    let url = Url::parse(uri.trim()).map_err(|e| UriError::Malformed(e.to_string()))?;
    if url.scheme() != OTPAUTH_SCHEME {
        return Err(UriError::UnsupportedScheme(url.scheme().to_string()));
    }
    let otp_type = match url.host_str().map(str::to_ascii_lowercase).as_deref() {
        Some("totp") => OtpType::Totp,
        Some("hotp") => OtpType::Hotp,
        other => return Err(UriError::UnsupportedType(other.unwrap_or_default().to_string())),
    };

    let label = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_ACCOUNT.to_string());

    let mut secret = None;
    let mut issuer = None;
    let mut algorithm = Algorithm::Sha1;
    let mut digits = DEFAULT_DIGITS;
    let mut period = DEFAULT_PERIOD;
    let mut counter = None;

    for (key, value) in url.query_pairs() {
        let value = value.trim();
        match key.to_ascii_lowercase().as_str() {
            "secret" => secret = Some(value.to_string()),
            "issuer" if !value.is_empty() => issuer = Some(value.to_string()),
            "algorithm" => {
                algorithm = Algorithm::from_name(value).ok_or_else(|| invalid("algorithm", value))?
            }
            "digits" => {
                digits = value
                    .parse()
                    .ok()
                    .filter(|d| matches!(*d, 6 | 8))
                    .ok_or_else(|| invalid("digits", value))?
            }
            "period" => {
                period = value
                    .parse()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(|| invalid("period", value))?
            }
            "counter" => counter = Some(value.parse().map_err(|_| invalid("counter", value))?),
            _ => {}
        }
    }

    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(UriError::MissingParameter("secret"))?;
    let key = base32::decode_strict(&secret)?;
    if key.is_empty() {
        return Err(Base32Error::Empty.into());
    }
    let secret = base32::encode(&key);

    Ok(OtpAuthUri {
        otp_type,
        label,
        issuer,
        secret,
        algorithm,
        digits,
        period,
        counter: match otp_type {
            OtpType::Hotp => Some(counter.unwrap_or(0)),
            _ => None,
        },
    })
}

fn invalid(name: &'static str, value: &str) -> UriError {
    UriError::InvalidParameter {
        name,
        value: value.to_string(),
    }
}

impl OtpAuthUri {
    pub fn to_imported_account(&self) -> ImportedAccount {
        let parts = split_label(&self.label, self.issuer.as_deref());
        let name = strip_control_chars(&self.label).trim().to_string();
        ImportedAccount {
            account: Account {
                name: if name.is_empty() { UNKNOWN_ACCOUNT.to_string() } else { name },
                issuer: parts.issuer.unwrap_or_else(|| UNKNOWN_ISSUER.to_string()),
                secret: self.secret.clone(),
                otp_type: self.otp_type,
                algorithm: self.algorithm,
                digits: self.digits,
            },
            period: self.period,
            counter: self.counter,
        }
    }

    pub fn from_imported_account(imported: &ImportedAccount) -> Self {
        let account = &imported.account;
        OtpAuthUri {
            otp_type: account.otp_type,
            label: account.name.clone(),
            issuer: Some(account.issuer.clone()).filter(|i| !i.is_empty() && i != UNKNOWN_ISSUER),
            secret: account.secret.clone(),
            algorithm: account.algorithm,
            digits: account.digits,
            period: imported.period,
            counter: imported.counter,
        }
    }

    /// Canonical URI: issuer-prefixed label, unpadded secret, explicit parameters.
    pub fn to_uri(&self) -> String {
        let kind = match self.otp_type {
            OtpType::Hotp => "hotp",
            _ => "totp",
        };
        let label = match &self.issuer {
            Some(issuer) if !self.label.starts_with(&format!("{issuer}:")) => {
                format!("{}:{}", encode(issuer), encode(&self.label))
            }
            _ => match self.label.split_once(':') {
                Some((prefix, rest)) => format!("{}:{}", encode(prefix), encode(rest)),
                None => encode(&self.label),
            },
        };

        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("secret", self.secret.trim_end_matches('='));
        if let Some(issuer) = &self.issuer {
            query.append_pair("issuer", issuer);
        }
        query.append_pair("algorithm", self.algorithm.as_str());
        query.append_pair("digits", &self.digits.to_string());
        match self.otp_type {
            OtpType::Hotp => {
                query.append_pair("counter", &self.counter.unwrap_or(0).to_string());
            }
            _ => {
                query.append_pair("period", &self.period.to_string());
            }
        }
        format!("{OTPAUTH_SCHEME}://{kind}/{label}?{}", query.finish())
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

/// Splits labels of the forms `issuer(name)`, `issuer:name` and `user@domain`
/// (read as `domain(user)`). A trailing `_<n>` storage suffix is ignored. When
/// an issuer is already known it wins and only the name is extracted.
pub fn split_label(label: &str, issuer_hint: Option<&str>) -> LabelParts {
    let clean = strip_index_suffix(label.trim());

    if let Some(issuer) = issuer_hint.map(str::trim).filter(|s| !s.is_empty()) {
        let name = match clean.split_once(':') {
            Some((_, rest)) if !rest.contains(':') => rest.trim(),
            _ => clean,
        };
        return LabelParts {
            issuer: Some(issuer.to_string()),
            name: name.to_string(),
            display_name: format!("{issuer}({name})"),
        };
    }

    if let Some((issuer, name)) = split_parenthesized(clean) {
        return LabelParts {
            issuer: Some(issuer.to_string()),
            name: name.to_string(),
            display_name: clean.to_string(),
        };
    }
    if let Some((issuer, name)) = clean.split_once(':').filter(|(i, n)| !i.is_empty() && !n.is_empty()) {
        return LabelParts {
            issuer: Some(issuer.to_string()),
            name: name.to_string(),
            display_name: format!("{issuer}({name})"),
        };
    }
    if let Some((user, domain)) = clean.split_once('@').filter(|(u, d)| !u.is_empty() && !d.is_empty()) {
        return LabelParts {
            issuer: Some(domain.to_string()),
            name: user.to_string(),
            display_name: format!("{domain}({user})"),
        };
    }

    LabelParts {
        issuer: None,
        name: clean.to_string(),
        display_name: clean.to_string(),
    }
}

fn strip_index_suffix(label: &str) -> &str {
    match label.rsplit_once('_') {
        Some((head, digits)) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => label,
    }
}

fn split_parenthesized(label: &str) -> Option<(&str, &str)> {
    let body = label.strip_suffix(')')?;
    let (issuer, name) = body.split_once('(')?;
    if issuer.is_empty() || name.is_empty() || name.contains(')') {
        return None;
    }
    Some((issuer, name))
}
