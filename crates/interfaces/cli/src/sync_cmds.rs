use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use cachesync_config::AppConfig;
use cachesync_store::{HistoryEntry, LocalCache, is_reserved_key, millis_to_datetime};
use cachesync_sync::{SyncEngine, store_credentials, stored_credentials};

pub(crate) async fn run_profile_show(engine: &SyncEngine) -> Result<()> {
    match engine.profile().load_profile().await {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("no profile stored yet"),
    }
    Ok(())
}

pub(crate) async fn run_profile_set(engine: &SyncEngine, pairs: &[String]) -> Result<()> {
    let mut record = engine.profile().load_profile().await.unwrap_or_default();
    for pair in pairs {
        let (key, value) = parse_field(pair)?;
        record.set(key, value);
    }
    engine.profile().save_profile(&record).await;
    println!("profile updated ({} fields)", record.fields.len());
    Ok(())
}

pub(crate) async fn run_history_add(engine: &SyncEngine, raw: &str) {
    let id = engine.history().append(parse_value(raw)).await;
    if id.is_local() {
        println!("recorded {id} (pending upload)");
    } else {
        println!("recorded {id}");
    }
}

pub(crate) async fn run_history_list(engine: &SyncEngine, local_only: bool) {
    let window = if local_only {
        engine.history().window()
    } else {
        engine.history().fetch().await
    };
    if window.is_empty() {
        println!("history is empty");
        return;
    }
    println!("── recent history ───────────────────────────────────");
    for entry in &window {
        println!("{}", format_entry(entry));
    }
    println!("  ({} of {} entries)", window.len(), engine.history().limit());
}

pub(crate) async fn run_history_sync(engine: &SyncEngine) {
    if !engine.remote().is_configured() {
        println!("remote not configured; nothing to sync");
        return;
    }
    let before = engine.history().pending().len();
    let window = engine.history().fetch().await;
    let after = engine.history().pending().len();
    println!("uploaded {} of {before} pending entries", before.saturating_sub(after));
    println!("window now holds {} entries", window.len());
}

pub(crate) fn run_history_pending(engine: &SyncEngine) {
    let pending = engine.history().pending();
    if pending.is_empty() {
        println!("no pending entries");
        return;
    }
    for entry in &pending {
        println!("{}", format_entry(entry));
    }
    println!("  ({} pending)", pending.len());
}

pub(crate) fn run_remote_connect(cache: &LocalCache, path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials from {}", path.display()))?;
    let credentials = store_credentials(cache, &raw)
        .with_context(|| format!("{} does not hold usable credentials", path.display()))?;
    println!("remote credentials stored for project {}", credentials.project_id);
    Ok(())
}

pub(crate) fn run_remote_status(engine: &SyncEngine, cache: &LocalCache, config: &AppConfig) {
    println!("cachesync remote");
    println!("- client id: {}", engine.client_id());
    println!("- enabled in config: {}", config.remote.enabled);
    match stored_credentials(cache) {
        Some(credentials) => {
            println!("- project: {}", credentials.project_id);
            println!(
                "- base url: {}",
                credentials.base_url.as_deref().unwrap_or(&config.remote.base_url)
            );
        }
        None => println!("- credentials: none stored"),
    }
    println!("- configured this session: {}", engine.remote().is_configured());
}

/// Summarise remote failures that were swallowed during the command.
pub(crate) fn report_failures(engine: &SyncEngine) {
    let failures = engine.policy().failures();
    if failures.is_empty() {
        return;
    }
    eprintln!("remote unavailable for {} operation(s); local data is intact", failures.len());
    for failure in &failures {
        eprintln!("  {}: {}", failure.op, failure.message);
    }
}

fn parse_field(pair: &str) -> Result<(String, Value)> {
    let Some((key, value)) = pair.split_once('=') else {
        bail!("expected KEY=VALUE, got {pair:?}");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty key in {pair:?}");
    }
    if is_reserved_key(key) {
        bail!("`{key}` is maintained by cachesync and cannot be set");
    }
    Ok((key.to_string(), parse_value(value)))
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn format_entry(entry: &HistoryEntry) -> String {
    let at = millis_to_datetime(entry.timestamp).format("%Y-%m-%d %H:%M:%S");
    format!("  {at}  {:<24} {}", entry.id.as_str(), entry.payload)
}
