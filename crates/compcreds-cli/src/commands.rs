use std::{collections::BTreeMap, io::Write, sync::Arc};

use color_eyre::Result;
use compcreds::{CompCredStore, CompCredentials};
use compcreds_core::storage::SecureStorage;
use tracing::info;

use crate::cli::CredCommand;

/// Root path the health check writes under, kept apart from real credentials.
pub const HEALTH_KEY_PATH: &str = "compcreds-health";

/// Execute a credential subcommand, writing human-readable output to `out`.
/// Secrets are always printed through the redacted rendering.
pub async fn handle<S, W>(cmd: CredCommand, store: &CompCredStore<S>, out: &mut W) -> Result<()>
where
    S: SecureStorage + ?Sized,
    W: Write,
{
    match cmd {
        CredCommand::Get { xname } => {
            let cred = store.get_comp_cred(&xname).await?;
            writeln!(out, "{cred}")?;
        }
        CredCommand::GetMany { xnames } => {
            // Results are keyed by the xname inside each record, which may
            // differ from the name that was requested.
            let found: BTreeMap<_, _> = store.get_comp_creds(&xnames).await.into_iter().collect();
            for cred in found.values() {
                writeln!(out, "{cred}")?;
            }
            for xname in xnames.iter().filter(|x| !found.contains_key(*x)) {
                writeln!(out, "Xname: {xname}, unavailable")?;
            }
        }
        CredCommand::List => {
            let all: BTreeMap<_, _> = store.get_all_comp_creds().await?.into_iter().collect();
            if all.is_empty() {
                writeln!(out, "No credentials stored under {}.", store.key_path())?;
                return Ok(());
            }
            for cred in all.values() {
                writeln!(out, "{cred}")?;
            }
        }
        CredCommand::Store(args) => {
            let cred = args.into_credentials();
            store.store_comp_cred(&cred).await?;
            info!(xname = %cred.xname, "stored component credentials");
            writeln!(
                out,
                "Stored credentials for {} under {}.",
                cred.xname,
                store.key_path()
            )?;
        }
    }
    Ok(())
}

/// Round-trips a canary credential through the storage backend.
pub async fn run_health<S: SecureStorage + ?Sized>(storage: Arc<S>) -> Result<()> {
    let store = CompCredStore::new(HEALTH_KEY_PATH, storage);
    let canary = CompCredentials::new("canary", "localhost/health", "health", "ok");

    store.store_comp_cred(&canary).await?;
    let round_trip = store.get_comp_cred(&canary.xname).await?;
    if round_trip != canary {
        color_eyre::eyre::bail!("storage round-trip failed");
    }

    let all = store.get_all_comp_creds().await?;
    if !all.contains_key(&canary.xname) {
        color_eyre::eyre::bail!("storage enumeration did not return the canary record");
    }
    Ok(())
}
