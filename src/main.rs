// main.rs
// Command-line front end: loads `.env`, sets up logging, and dispatches subcommands.
//
// Subcommands:
// - decode <URI>             -> imported accounts as JSON
// - code --secret <B32>      -> current TOTP (or HOTP with --counter)
// - verify --secret <B32> T  -> exit 0 when the token is accepted
// - export <FILE>            -> otpauth-migration URI for a JSON account list
// - watch <URI>              -> live codes with countdown until Ctrl-C
// - secret [--bytes N]       -> fresh Base32 secret (and otpauth URI with --account)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::{fs, io, process::ExitCode};
use tracing_subscriber::EnvFilter;

use otpimport::{
    config::Settings,
    import_uri,
    migration::{MissingSecretPolicy, build_migration_uri},
    models::{Algorithm, ImportedAccount, MigrationPayload, OtpParameter, OtpType},
    otpauth::OtpAuthUri,
    totp::{DEFAULT_SECRET_BYTES, MIN_SECRET_BYTES, OtpGenerator, generate_base32_secret_n, now_unix},
    watch,
};

#[derive(Parser, Debug)]
#[command(version, about = "Import OTP accounts from migration URIs and compute their codes")]
struct Cli {
    /// Keep accounts without a secret by inventing a placeholder (codes will be wrong).
    #[arg(long, global = true)]
    placeholder_secrets: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode an otpauth-migration:// or otpauth:// URI.
    Decode {
        uri: String,
        #[arg(long)]
        show_secrets: bool,
    },
    /// Print the current code for a Base32 secret.
    Code {
        #[arg(long)]
        secret: String,
        #[arg(long)]
        digits: Option<u32>,
        #[arg(long)]
        period: Option<u64>,
        #[arg(long, default_value = "SHA1")]
        algorithm: String,
        /// Produce an HOTP code for this counter instead of a TOTP code.
        #[arg(long)]
        counter: Option<u64>,
    },
    /// Check a token against the current time step and its neighbours.
    Verify {
        #[arg(long)]
        secret: String,
        token: String,
        #[arg(long)]
        window: Option<u64>,
        #[arg(long)]
        digits: Option<u32>,
        #[arg(long)]
        period: Option<u64>,
    },
    /// Build a migration URI from a JSON array of accounts.
    Export { file: String },
    /// Show live codes for every account in a URI.
    Watch { uri: String },
    /// Generate a random Base32 secret. Nothing is stored.
    Secret {
        #[arg(long, default_value_t = DEFAULT_SECRET_BYTES)]
        bytes: usize,
        /// Also print an otpauth URI for this account name.
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        issuer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse(), settings).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<ExitCode> {
    let policy = if cli.placeholder_secrets {
        MissingSecretPolicy::Placeholder
    } else {
        settings.missing_secret
    };

    match cli.command {
        Command::Decode { uri, show_secrets } => {
            let mut accounts = import_uri(&uri, policy)?;
            if !show_secrets {
                for imported in &mut accounts {
                    imported.account.secret = "********".to_string();
                }
            }
            println!("{}", serde_json::to_string_pretty(&accounts)?);
        }
        Command::Code {
            secret,
            digits,
            period,
            algorithm,
            counter,
        } => {
            let algorithm = Algorithm::from_name(&algorithm)
                .with_context(|| format!("unknown algorithm {algorithm:?}"))?;
            let generator = OtpGenerator::new(
                &secret,
                algorithm,
                digits.unwrap_or(settings.digits),
                period.unwrap_or(settings.period),
            )?;
            let code = match counter {
                Some(counter) => generator.hotp(counter)?,
                None => generator.totp_now()?,
            };
            println!("{code}");
        }
        Command::Verify {
            secret,
            token,
            window,
            digits,
            period,
        } => {
            let generator = OtpGenerator::new(
                &secret,
                Algorithm::Sha1,
                digits.unwrap_or(settings.digits),
                period.unwrap_or(settings.period),
            )?;
            let ok = generator.verify_at(&token, now_unix(), window.unwrap_or(settings.window))?;
            println!("{}", if ok { "valid" } else { "invalid" });
            if !ok {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Export { file } => {
            let json = fs::read_to_string(&file).with_context(|| format!("reading {file}"))?;
            let accounts: Vec<ImportedAccount> =
                serde_json::from_str(&json).with_context(|| format!("parsing {file}"))?;
            let otp_parameters = accounts
                .iter()
                .map(|imported| {
                    OtpParameter::from_account(&imported.account, imported.counter.map(|c| c as i64))
                        .with_context(|| format!("account {:?} has an invalid secret", imported.account.name))
                })
                .collect::<Result<Vec<_>>>()?;
            let payload = MigrationPayload {
                otp_parameters,
                version: Some(1),
                batch_size: Some(1),
                batch_index: Some(0),
                batch_id: None,
            };
            println!("{}", build_migration_uri(&payload));
        }
        Command::Watch { uri } => {
            let accounts = import_uri(&uri, policy)?;
            let shutdown = async {
                tokio::signal::ctrl_c().await.ok();
            };
            watch::run(accounts, io::stdout(), None, shutdown).await?;
        }
        Command::Secret {
            bytes,
            account,
            issuer,
        } => {
            let bytes = bytes.max(MIN_SECRET_BYTES);
            let secret = generate_base32_secret_n(bytes);

            let mut body = serde_json::Map::new();
            body.insert("secret".to_string(), serde_json::Value::String(secret.clone()));
            body.insert("bytes".to_string(), serde_json::Value::Number((bytes as u64).into()));
            if let Some(label) = account {
                let uri = OtpAuthUri {
                    otp_type: OtpType::Totp,
                    label,
                    issuer,
                    secret,
                    algorithm: Algorithm::Sha1,
                    digits: settings.digits,
                    period: settings.period,
                    counter: None,
                };
                body.insert("uri".to_string(), serde_json::Value::String(uri.to_uri()));
            }
            println!("{}", serde_json::to_string_pretty(&serde_json::Value::Object(body))?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
