// lib.rs
// Extracts OTP accounts from migration and otpauth URIs and computes HOTP/TOTP codes.

pub mod base32;
pub mod config;
pub mod error;
pub mod import;
pub mod migration;
pub mod models;
pub mod otpauth;
pub mod totp;
pub mod watch;
pub mod wire;

pub use error::{AccountError, Base32Error, OtpError, UriError};
pub use import::import_uri;
pub use migration::{MissingSecretPolicy, decode_migration_payload, parse_migration_uri};
pub use models::{Account, ImportedAccount, MigrationPayload, OtpParameter};
pub use totp::{OtpGenerator, hotp, totp, totp_at, verify_totp, verify_totp_at};
