#[path = "common/mod.rs"]
mod common;

use common::{ParamBuilder, RFC_SECRET, RFC_SECRET_B32, account, bytes_field, migration_uri, payload, varint_field};
use otpimport::{
    AccountError, Base32Error, MissingSecretPolicy, OtpError, OtpGenerator, UriError,
    decode_migration_payload, parse_migration_uri,
    migration::{
        build_migration_uri, decode_otp_parameter, encode_migration_payload, encode_otp_parameter,
        placeholder_secret, storage_key,
    },
    models::{Algorithm, DigitCount, ImportedAccount, MigrationPayload, OtpParameter, OtpType},
};

#[test]
fn decodes_accounts_in_encounter_order() {
    let buf = payload(&[
        account("alice@a.example", "A", b"secret-a-bytes"),
        account("bob@b.example", "B", b"secret-b-bytes"),
        account("carol@c.example", "C", b"secret-c-bytes"),
    ]);
    let accounts = decode_migration_payload(&buf).accounts(MissingSecretPolicy::Reject);
    let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["alice@a.example", "bob@b.example", "carol@c.example"]);
    assert_eq!(accounts[1].issuer, "B");
}

#[test]
fn normalizes_a_complete_entry() {
    let buf = account("Example:alice@google.com", "Example", RFC_SECRET);
    let accounts = decode_migration_payload(&buf).accounts(MissingSecretPolicy::Reject);
    assert_eq!(accounts.len(), 1);
    let a = &accounts[0];
    assert_eq!(a.name, "Example:alice@google.com");
    assert_eq!(a.issuer, "Example");
    assert_eq!(a.secret, RFC_SECRET_B32);
    assert_eq!(a.algorithm, Algorithm::Sha1);
    assert_eq!(a.otp_type, OtpType::Totp);
    assert_eq!(a.digits, 6);
}

#[test]
fn reads_batch_metadata() {
    let buf = payload(&[
        account("a", "A", b"0123456789"),
        varint_field(2, 1),
        varint_field(3, 4),
        varint_field(4, 2),
        varint_field(5, 987654321),
    ]);
    let decoded = decode_migration_payload(&buf);
    assert_eq!(decoded.version, Some(1));
    assert_eq!(decoded.batch_size, Some(4));
    assert_eq!(decoded.batch_index, Some(2));
    assert_eq!(decoded.batch_id, Some(987654321));
}

#[test]
fn metadata_with_wrong_wire_type_is_ignored() {
    let buf = payload(&[bytes_field(2, b"x"), varint_field(1, 7), account("a", "A", b"0123456789")]);
    let decoded = decode_migration_payload(&buf);
    assert_eq!(decoded.version, None);
    assert_eq!(decoded.otp_parameters.len(), 1);
}

#[test]
fn unknown_fields_between_entries_do_not_break_decoding() {
    let buf = payload(&[
        account("first", "One", b"0123456789"),
        varint_field(9, 42),
        bytes_field(12, b"opaque extension"),
        vec![0x0D, 1, 2, 3, 4], // field 1 as fixed32
        vec![0x19, 1, 2, 3, 4, 5, 6, 7, 8], // field 3 as fixed64
        account("second", "Two", b"abcdefghij"),
    ]);
    let accounts = decode_migration_payload(&buf).accounts(MissingSecretPolicy::Reject);
    let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["first", "second"]);
}

#[test]
fn reserved_wire_types_are_resynchronized() {
    let buf = payload(&[
        account("first", "One", b"0123456789"),
        vec![0x0F, 0x07, 0x06], // field 1 wire type 7 followed by junk
        account("second", "Two", b"abcdefghij"),
    ]);
    let accounts = decode_migration_payload(&buf).accounts(MissingSecretPolicy::Reject);
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[1].name, "second");
}

#[test]
fn digits_mapping() {
    let eight = ParamBuilder::new().secret(b"0123456789").name("x").digits(2).as_entry();
    let six = ParamBuilder::new().secret(b"0123456789").name("x").digits(1).as_entry();
    let unspecified = ParamBuilder::new().secret(b"0123456789").name("x").digits(0).as_entry();
    let absent = ParamBuilder::new().secret(b"0123456789").name("x").as_entry();
    let odd = ParamBuilder::new().secret(b"0123456789").name("x").digits(9).as_entry();

    let widths: Vec<u32> = [eight, six, unspecified, absent, odd]
        .iter()
        .map(|buf| decode_migration_payload(buf).accounts(MissingSecretPolicy::Reject)[0].digits)
        .collect();
    // only SIX means six digits; an absent field decodes as SIX
    assert_eq!(widths, [8, 6, 8, 6, 8]);
}

#[test]
fn unknown_enum_values_are_kept_and_refused_by_the_engine() {
    let params = decode_otp_parameter(
        &ParamBuilder::new()
            .secret(RFC_SECRET)
            .name("future")
            .algorithm(7)
            .digits(9)
            .otp_type(5)
            .build(),
    );
    assert_eq!(params.algorithm, Algorithm::Other(7));
    assert_eq!(params.digits, DigitCount::Other(9));
    assert_eq!(params.otp_type, OtpType::Other(5));
    assert_eq!(encode_otp_parameter(&params), ParamBuilder::new()
        .secret(RFC_SECRET)
        .name("future")
        .algorithm(7)
        .digits(9)
        .otp_type(5)
        .build());

    let account = params.to_account(MissingSecretPolicy::Reject).unwrap();
    assert_eq!(account.algorithm, Algorithm::Other(7));
    assert_eq!(account.otp_type, OtpType::Other(5));
    let imported = ImportedAccount {
        account,
        period: 30,
        counter: None,
    };
    assert_eq!(
        OtpGenerator::for_account(&imported).unwrap_err(),
        OtpError::UnsupportedType(OtpType::Other(5))
    );

    let mut totp_only = imported.clone();
    totp_only.account.otp_type = OtpType::Totp;
    assert_eq!(
        OtpGenerator::for_account(&totp_only).unwrap_err(),
        OtpError::UnsupportedAlgorithm(Algorithm::Other(7))
    );
}

#[test]
fn export_refuses_accounts_without_secret_bytes() {
    let mut exported = decode_migration_payload(&account("a", "A", b"0123456789"))
        .accounts(MissingSecretPolicy::Reject)
        .remove(0);
    assert!(OtpParameter::from_account(&exported, None).is_ok());
    exported.secret = "====".to_string();
    assert_eq!(OtpParameter::from_account(&exported, None), Err(Base32Error::Empty));
}

#[test]
fn hotp_entries_keep_their_counter() {
    let buf = ParamBuilder::new()
        .secret(RFC_SECRET)
        .name("counter-based")
        .otp_type(1)
        .counter(5)
        .as_entry();
    let imported = decode_migration_payload(&buf).imported_accounts(MissingSecretPolicy::Reject);
    assert_eq!(imported[0].account.otp_type, OtpType::Hotp);
    assert_eq!(imported[0].counter, Some(5));
    assert_eq!(imported[0].period, 30);
}

#[test]
fn enum_fields_pass_through_and_default() {
    let params = decode_otp_parameter(
        &ParamBuilder::new()
            .secret(b"k")
            .algorithm(3)
            .otp_type(0)
            .counter(u64::MAX)
            .build(),
    );
    assert_eq!(params.algorithm, Algorithm::Sha512);
    assert_eq!(params.otp_type, OtpType::Unspecified);
    assert_eq!(params.counter, Some(-1));
    assert_eq!(params.digits, DigitCount::Six);

    let account = params.to_account(MissingSecretPolicy::Reject).unwrap();
    assert_eq!(account.otp_type, OtpType::Totp);
    assert_eq!(account.algorithm, Algorithm::Sha512);

    let unspecified_algo = decode_otp_parameter(&ParamBuilder::new().secret(b"k").algorithm(0).build());
    assert_eq!(
        unspecified_algo.to_account(MissingSecretPolicy::Reject).unwrap().algorithm,
        Algorithm::Sha1
    );
}

#[test]
fn display_name_falls_back_to_issuer_then_constant() {
    let issuer_only = ParamBuilder::new().secret(b"k").name("   ").issuer(" GitHub ").as_entry();
    let nothing = ParamBuilder::new().secret(b"k").as_entry();
    let a = &decode_migration_payload(&issuer_only).accounts(MissingSecretPolicy::Reject)[0];
    assert_eq!(a.name, "GitHub");
    assert_eq!(a.issuer, "GitHub");
    let b = &decode_migration_payload(&nothing).accounts(MissingSecretPolicy::Reject)[0];
    assert_eq!(b.name, "Unknown Account");
    assert_eq!(b.issuer, "Unknown");
}

#[test]
fn control_characters_are_stripped_but_punctuation_kept() {
    let buf = ParamBuilder::new()
        .secret(b"k")
        .name("\u{1}Jump\u{7f}Server:yang (ops)\u{85}\n")
        .as_entry();
    let a = &decode_migration_payload(&buf).accounts(MissingSecretPolicy::Reject)[0];
    assert_eq!(a.name, "JumpServer:yang (ops)");
}

#[test]
fn non_utf8_names_fall_back_to_latin1() {
    let buf = ParamBuilder::new().secret(b"k").raw_name(&[b'c', 0xE9, b'l']).as_entry();
    let a = &decode_migration_payload(&buf).accounts(MissingSecretPolicy::Reject)[0];
    assert_eq!(a.name, "c\u{e9}l");
}

#[test]
fn missing_secret_is_rejected_by_default() {
    let buf = payload(&[
        ParamBuilder::new().name("no secret").issuer("X").as_entry(),
        ParamBuilder::new().secret(b"").name("empty secret").as_entry(),
        account("ok", "Y", b"0123456789"),
    ]);
    let decoded = decode_migration_payload(&buf);
    assert_eq!(decoded.otp_parameters.len(), 3);
    assert_eq!(
        decoded.otp_parameters[0].to_account(MissingSecretPolicy::Reject),
        Err(AccountError::MissingSecret {
            name: "no secret".to_string()
        })
    );
    let accounts = decoded.accounts(MissingSecretPolicy::Reject);
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "ok");
}

#[test]
fn placeholder_policy_is_deterministic() {
    let buf = ParamBuilder::new().name("legacy").as_entry();
    let decoded = decode_migration_payload(&buf);
    let first = decoded.accounts(MissingSecretPolicy::Placeholder);
    let second = decoded.accounts(MissingSecretPolicy::Placeholder);
    assert_eq!(first[0].secret, second[0].secret);
    assert_eq!(first[0].secret, placeholder_secret("legacy"));
    assert_eq!(first[0].secret.len(), 32);
    // "a" hashes to 97: symbols start at (97 % 32) = 1
    assert!(placeholder_secret("a").starts_with("BCDEF"));
}

#[test]
fn truncated_entry_keeps_what_was_readable() {
    let mut buf = account("truncated", "T", b"0123456789");
    buf.truncate(buf.len() - 8);
    let decoded = decode_migration_payload(&buf);
    assert_eq!(decoded.otp_parameters.len(), 1);
    assert_eq!(decoded.otp_parameters[0].secret.as_deref(), Some(&b"0123456789"[..]));
}

#[test]
fn garbage_yields_empty_payload() {
    assert_eq!(decode_migration_payload(&[]), MigrationPayload::default());
    let decoded = decode_migration_payload(&[0xFF; 64]);
    assert!(decoded.otp_parameters.is_empty());
}

#[test]
fn slightly_corrupted_real_world_payload() {
    // The submessage length is four bytes short, so digits and type spill into
    // the outer message where they land on batch_id and an unknown field.
    let uri = "otpauth-migration://offline?data=CjEKCkhlbGxvId6tvu8SGEV4YW1wbGU6YWxpY2VAZ29vZ2xlLmNvbRoHRXhhbXBsZSABKAEwAhABGAEgACgA";
    let decoded = parse_migration_uri(uri).unwrap();
    assert_eq!(decoded.version, Some(1));
    assert_eq!(decoded.batch_size, Some(1));
    assert_eq!(decoded.batch_index, Some(0));
    assert_eq!(decoded.batch_id, Some(0));

    let accounts = decoded.accounts(MissingSecretPolicy::Reject);
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "Example:alice@google.com");
    assert_eq!(accounts[0].issuer, "Example");
    assert_eq!(accounts[0].secret, "JBSWY3DPEHPK3PXP");
}

#[test]
fn parses_percent_encoded_and_raw_base64() {
    let buf = account("a", "A", &[0xFB, 0xFF, 0xBE, 0x00, 0x01]);
    let encoded = migration_uri(&buf);
    assert_eq!(parse_migration_uri(&encoded).unwrap().otp_parameters.len(), 1);

    // a '+' left raw in the query must not turn into a space
    let raw = encoded.replace("%2B", "+").replace("%2F", "/").replace("%3D", "=");
    assert_eq!(
        parse_migration_uri(&raw).unwrap(),
        parse_migration_uri(&encoded).unwrap()
    );
}

#[test]
fn rejects_malformed_migration_uris() {
    assert!(matches!(
        parse_migration_uri("otpauth-migration://online?data=AAAA"),
        Err(UriError::UnexpectedHost { .. })
    ));
    assert!(matches!(
        parse_migration_uri("otpauth-migration://offline?foo=bar"),
        Err(UriError::MissingParameter("data"))
    ));
    assert!(matches!(
        parse_migration_uri("otpauth-migration://offline?data=%%%%"),
        Err(UriError::Base64(_))
    ));
    assert!(matches!(
        parse_migration_uri("otpauth://totp/x?secret=AAAA"),
        Err(UriError::UnsupportedScheme(_))
    ));
}

#[test]
fn encoder_output_decodes_back() {
    let payload = MigrationPayload {
        otp_parameters: vec![
            OtpParameter {
                secret: Some(RFC_SECRET.to_vec()),
                name: Some("alice".to_string()),
                issuer: Some("Example".to_string()),
                algorithm: Algorithm::Sha256,
                digits: DigitCount::Eight,
                otp_type: OtpType::Hotp,
                counter: Some(12),
            },
            OtpParameter {
                secret: Some(b"another-secret".to_vec()),
                name: Some("bob".to_string()),
                issuer: None,
                ..OtpParameter::default()
            },
        ],
        version: Some(1),
        batch_size: Some(1),
        batch_index: Some(0),
        batch_id: Some(77),
    };
    assert_eq!(decode_migration_payload(&encode_migration_payload(&payload)), payload);
    assert_eq!(parse_migration_uri(&build_migration_uri(&payload)).unwrap(), payload);
}

#[test]
fn storage_keys() {
    assert_eq!(storage_key("GitHub:alice", 0), "GitHub:alice_0");
    assert_eq!(storage_key("\u{1}\u{2}", 3), "Migrated account 4_3");
    let long = "x".repeat(80);
    assert_eq!(storage_key(&long, 1), format!("{}_1", "x".repeat(50)));
}

mod fuzz {
    use super::*;
    use otpimport::{base32, wire};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn arbitrary_bytes_always_terminate(buf in proptest::collection::vec(any::<u8>(), 0..512)) {
            let decoded = decode_migration_payload(&buf);
            // every entry consumes at least its two-byte header
            prop_assert!(decoded.otp_parameters.len() <= buf.len() / 2 + 1);
            let _ = decoded.accounts(MissingSecretPolicy::Placeholder);
        }

        #[test]
        fn every_field_read_advances(buf in proptest::collection::vec(any::<u8>(), 1..256), start in 0usize..256) {
            let offset = start % buf.len();
            prop_assert!(wire::read_field(&buf, offset).next_offset > offset);
        }

        #[test]
        fn varints_below_2_pow_35_survive(n in 0u64..(1u64 << 35)) {
            let mut out = Vec::new();
            wire::write_varint(n, &mut out);
            prop_assert_eq!(&out, &common::varint(n));
            prop_assert_eq!(wire::read_varint(&out, 0), (n, out.len()));
        }

        #[test]
        fn base32_matches_reference_codec(bytes in proptest::collection::vec(any::<u8>(), 0..=64)) {
            let encoded = base32::encode(&bytes);
            prop_assert_eq!(&encoded, &data_encoding::BASE32.encode(&bytes));
            prop_assert_eq!(base32::decode(&encoded).unwrap(), bytes.clone());
            prop_assert_eq!(base32::decode(&encoded.to_lowercase()).unwrap(), bytes);
        }
    }
}
