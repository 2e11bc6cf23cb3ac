// import.rs
// Entry point for scanned or pasted text: routes migration URIs to the binary
// decoder and single-account URIs to the query-string parser.

use tracing::info;

use crate::error::UriError;
use crate::migration::{MIGRATION_SCHEME, MissingSecretPolicy, parse_migration_uri};
use crate::models::ImportedAccount;
use crate::otpauth::{OTPAUTH_SCHEME, parse_otpauth_uri};

/// Imports every account carried by `text`, in payload order.
pub fn import_uri(text: &str, policy: MissingSecretPolicy) -> Result<Vec<ImportedAccount>, UriError> {
    let text = text.trim();
    let scheme = text
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .ok_or_else(|| UriError::Malformed("missing scheme".to_string()))?;

    match scheme.as_str() {
        MIGRATION_SCHEME => {
            let payload = parse_migration_uri(text)?;
            let accounts = payload.imported_accounts(policy);
            info!(
                decoded = payload.otp_parameters.len(),
                imported = accounts.len(),
                batch_index = payload.batch_index,
                batch_size = payload.batch_size,
                "imported migration payload"
            );
            Ok(accounts)
        }
        OTPAUTH_SCHEME => Ok(vec![parse_otpauth_uri(text)?.to_imported_account()]),
        other => Err(UriError::UnsupportedScheme(other.to_string())),
    }
}
