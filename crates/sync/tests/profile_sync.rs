mod common;

use serde_json::json;

use cachesync_remote::RemoteStore;
use cachesync_store::ProfileRecord;
use cachesync_sync::SyncOp;

use common::{FlakyRemote, disk, offline, online};

fn profile(name: &str) -> ProfileRecord {
    let mut record = ProfileRecord::default();
    record.set("name", json!(name));
    record
}

#[tokio::test]
async fn save_writes_locally_and_mirrors_remotely() {
    let disk = disk();
    let remote = FlakyRemote::new();
    let engine = online(&disk, &remote);

    engine.profile().save_profile(&profile("Ada")).await;

    let mirrored = remote.backend.profile(&engine.client_id()).unwrap();
    assert_eq!(mirrored.get("name"), Some(&json!("Ada")));
    // Local copy is readable without the remote.
    let local_only = offline(&disk);
    assert_eq!(
        local_only.profile().load_profile().await.unwrap().get("name"),
        Some(&json!("Ada"))
    );
}

#[tokio::test]
async fn remote_profile_wins_over_local() {
    let disk = disk();
    let remote = FlakyRemote::new();
    let engine = online(&disk, &remote);

    // Local has L, remote has R written by another device.
    offline(&disk).profile().save_profile(&profile("local")).await;
    remote
        .backend
        .put_profile(&engine.client_id(), &profile("remote"))
        .await
        .unwrap();

    let loaded = engine.profile().load_profile().await.unwrap();
    assert_eq!(loaded.get("name"), Some(&json!("remote")));

    // The cache now holds R as well.
    let cached = offline(&disk).profile().load_profile().await.unwrap();
    assert_eq!(cached.get("name"), Some(&json!("remote")));
}

#[tokio::test]
async fn cloud_wins_even_when_local_is_newer() {
    let disk = disk();
    let remote = FlakyRemote::new();
    let engine = online(&disk, &remote);

    remote
        .backend
        .put_profile(&engine.client_id(), &profile("older-remote"))
        .await
        .unwrap();
    let mut newer = profile("newer-local");
    newer.last_updated += chrono::Duration::days(1);
    offline(&disk).profile().save_profile(&newer).await;

    let loaded = engine.profile().load_profile().await.unwrap();
    assert_eq!(loaded.get("name"), Some(&json!("older-remote")));
}

#[tokio::test]
async fn empty_remote_is_bootstrapped_from_local() {
    let disk = disk();
    let remote = FlakyRemote::new();
    let engine = online(&disk, &remote);
    offline(&disk).profile().save_profile(&profile("seed")).await;
    assert!(remote.backend.profile(&engine.client_id()).is_none());

    let first = engine.profile().load_profile().await.unwrap();
    assert_eq!(first.get("name"), Some(&json!("seed")));
    let uploaded = remote.backend.profile(&engine.client_id()).unwrap();
    assert_eq!(uploaded.get("name"), Some(&json!("seed")));

    // Remote now equals local; a second load returns the same fields.
    let second = engine.profile().load_profile().await.unwrap();
    assert_eq!(second.fields, first.fields);
}

#[tokio::test]
async fn nothing_anywhere_loads_as_none() {
    let disk = disk();
    let remote = FlakyRemote::new();
    let engine = online(&disk, &remote);
    assert!(engine.profile().load_profile().await.is_none());
    assert!(remote.backend.profile(&engine.client_id()).is_none());
}

#[tokio::test]
async fn unconfigured_remote_is_local_only() {
    let disk = disk();
    let engine = offline(&disk);
    assert!(engine.profile().load_profile().await.is_none());

    engine.profile().save_profile(&profile("solo")).await;
    let loaded = engine.profile().load_profile().await.unwrap();
    assert_eq!(loaded.get("name"), Some(&json!("solo")));
    assert!(engine.policy().failures().is_empty());
}

#[tokio::test]
async fn remote_outage_falls_back_to_local() {
    let disk = disk();
    let remote = FlakyRemote::new();
    remote.set_offline(true);
    let engine = online(&disk, &remote);

    engine.profile().save_profile(&profile("offline-save")).await;
    let loaded = engine.profile().load_profile().await.unwrap();
    assert_eq!(loaded.get("name"), Some(&json!("offline-save")));

    assert_eq!(engine.policy().failure_count(SyncOp::PutProfile), 1);
    assert_eq!(engine.policy().failure_count(SyncOp::GetProfile), 1);
}

#[tokio::test]
async fn profile_with_reserved_key_reloads_after_save() {
    let disk = disk();
    let engine = offline(&disk);

    let mut record = profile("Ada");
    assert!(!record.set("last_updated", json!("yesterday")));
    record.fields.insert("last_updated".into(), json!("yesterday"));
    engine.profile().save_profile(&record).await;

    let loaded = engine
        .profile()
        .load_profile()
        .await
        .expect("saved profile reloads");
    assert_eq!(loaded.get("name"), Some(&json!("Ada")));
    assert_eq!(loaded.last_updated, record.last_updated);
}

#[tokio::test]
async fn profile_with_reserved_key_mirrors_to_remote() {
    let disk = disk();
    let remote = FlakyRemote::new();
    let engine = online(&disk, &remote);

    let mut record = profile("Ada");
    record.fields.insert("last_updated".into(), json!("yesterday"));
    engine.profile().save_profile(&record).await;

    let mirrored = remote.backend.profile(&engine.client_id()).unwrap();
    assert!(!mirrored.fields.contains_key("last_updated"));

    let loaded = engine.profile().load_profile().await.unwrap();
    assert_eq!(loaded.get("name"), Some(&json!("Ada")));
    assert!(engine.policy().failures().is_empty());
}
