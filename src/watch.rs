// watch.rs
// Live code display: recomputes every account's code once per second.

use anyhow::Result;
use std::{future::Future, io::Write, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::warn;

use crate::models::ImportedAccount;
use crate::totp::{OtpGenerator, format_token, now_unix, remaining_seconds};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    pub label: String,
    pub code: String,
    /// Seconds until rollover; `None` for counter-based accounts.
    pub remaining: Option<u64>,
}

/// Accounts paired with a ready generator. Accounts whose secret or
/// parameters cannot drive the engine are logged and left out.
pub fn prepare(accounts: Vec<ImportedAccount>) -> Vec<(ImportedAccount, OtpGenerator)> {
    accounts
        .into_iter()
        .filter_map(|imported| match OtpGenerator::for_account(&imported) {
            Ok(generator) => Some((imported, generator)),
            Err(e) => {
                warn!(name = %imported.account.name, error = %e, "cannot generate codes for account");
                None
            }
        })
        .collect()
}

pub fn snapshot(entries: &[(ImportedAccount, OtpGenerator)], unix_seconds: u64) -> Vec<CodeLine> {
    entries
        .iter()
        .filter_map(|(imported, generator)| {
            let code = match generator.current_code(imported, unix_seconds) {
                Ok(code) => code,
                Err(e) => {
                    warn!(name = %imported.account.name, error = %e, "code generation failed");
                    return None;
                }
            };
            let remaining = match imported.counter {
                Some(_) => None,
                None => Some(remaining_seconds(unix_seconds, generator.period)),
            };
            Some(CodeLine {
                label: format!("{} ({})", imported.account.name, imported.account.issuer),
                code: format_token(&code),
                remaining,
            })
        })
        .collect()
}

pub fn render(lines: &[CodeLine], out: &mut impl Write) -> std::io::Result<()> {
    for line in lines {
        match line.remaining {
            Some(secs) => writeln!(out, "{:<40} {:>9}  {:>2}s", line.label, line.code, secs)?,
            None => writeln!(out, "{:<40} {:>9}", line.label, line.code)?,
        }
    }
    writeln!(out)?;
    out.flush()
}

/// Prints a fresh snapshot every second until `shutdown` resolves or
/// `max_ticks` snapshots have been written.
pub async fn run<W: Write>(
    accounts: Vec<ImportedAccount>,
    mut out: W,
    max_ticks: Option<u64>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let entries = prepare(accounts);
    if entries.is_empty() {
        anyhow::bail!("no account can produce codes");
    }

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                render(&snapshot(&entries, now_unix()), &mut out)?;
                ticks += 1;
                if max_ticks.is_some_and(|max| ticks >= max) {
                    break;
                }
            }
        }
    }
    Ok(())
}
