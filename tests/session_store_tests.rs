//! Integration tests for SessionStore

use chrono::{Duration, Utc};
use kinfin_client::api::BatchStatusEntry;
use kinfin_client::session::{Session, SessionMeta, SessionStatus, SessionStore, TaxonRecord};

fn sample_config() -> Vec<TaxonRecord> {
    vec![
        TaxonRecord::new("GCA_000001", "nematoda", "plant"),
        TaxonRecord::new("GCA_000002", "nematoda", "animal"),
        TaxonRecord::new("GCA_000003", "outgroup", "free_living"),
    ]
}

fn sample_session(id: &str) -> Session {
    Session::new(id, format!("run {id}"), sample_config())
}

#[test]
fn test_create_and_get() {
    let mut store = SessionStore::new();
    store.create(sample_session("abc123"));

    let session = store.get("abc123").expect("session missing");
    assert_eq!(session.name, "run abc123");
    assert_eq!(session.status, SessionStatus::Submitted);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_duplicate_create_keeps_single_entry() {
    let mut store = SessionStore::new();
    store.create(sample_session("abc123"));

    let mut replacement = sample_session("abc123");
    replacement.name = "renamed on resubmit".to_string();
    store.create(replacement);

    // last write wins, never two entries for one id
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("abc123").unwrap().name, "renamed on resubmit");
}

#[test]
fn test_rename_unknown_id_is_noop() {
    let mut store = SessionStore::new();
    store.create(sample_session("abc123"));
    let before: Vec<Session> = store.list().into_iter().cloned().collect();

    store.rename("nope", "new name");

    let after: Vec<Session> = store.list().into_iter().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn test_rename_known_id() {
    let mut store = SessionStore::new();
    store.create(sample_session("abc123"));

    store.rename("abc123", "wasp analysis");
    assert_eq!(store.get("abc123").unwrap().name, "wasp analysis");
}

#[test]
fn test_delete_is_noop_when_absent() {
    let mut store = SessionStore::new();
    store.create(sample_session("abc123"));

    store.delete("missing");
    assert_eq!(store.len(), 1);

    store.delete("abc123");
    assert!(store.is_empty());
}

#[test]
fn test_update_meta_merges_fields() {
    let mut store = SessionStore::new();
    store.create(sample_session("abc123"));

    let expiry = Utc::now() + Duration::days(7);
    store.update_meta(
        "abc123",
        SessionMeta {
            status: Some(SessionStatus::Polling),
            expiry_date: Some(expiry),
        },
    );

    let session = store.get("abc123").unwrap();
    assert_eq!(session.status, SessionStatus::Polling);
    assert_eq!(session.expiry_date, Some(expiry));
    // untouched fields survive the merge
    assert_eq!(session.config, sample_config());
}

#[test]
fn test_update_meta_unknown_id_is_noop() {
    let mut store = SessionStore::new();
    store.update_meta("ghost", SessionMeta::status(SessionStatus::Complete));
    assert!(store.is_empty());
}

#[test]
fn test_update_meta_refuses_backward_transition() {
    let mut store = SessionStore::new();
    store.create(sample_session("abc123"));
    store.update_meta("abc123", SessionMeta::status(SessionStatus::Polling));
    store.update_meta("abc123", SessionMeta::status(SessionStatus::Complete));

    // a completed run never reverts to polling
    store.update_meta("abc123", SessionMeta::status(SessionStatus::Polling));
    assert_eq!(store.get("abc123").unwrap().status, SessionStatus::Complete);
}

#[test]
fn test_batch_refresh_sets_only_completed_sessions() {
    let mut store = SessionStore::new();
    store.create(sample_session("a"));
    store.create(sample_session("b"));

    store.apply_batch_status(&[
        BatchStatusEntry {
            session_id: "a".to_string(),
            status: "completed".to_string(),
            expiry_date: None,
        },
        BatchStatusEntry {
            session_id: "b".to_string(),
            status: "pending".to_string(),
            expiry_date: None,
        },
    ]);

    assert!(store.get("a").unwrap().status.is_complete());
    assert!(!store.get("b").unwrap().status.is_complete());
    // everything else is left alone
    assert_eq!(store.get("b").unwrap().name, "run b");
    assert_eq!(store.get("b").unwrap().config, sample_config());
}

#[test]
fn test_batch_refresh_detects_expiry() {
    let mut store = SessionStore::new();
    store.create(sample_session("old"));

    store.apply_batch_status(&[BatchStatusEntry {
        session_id: "old".to_string(),
        status: "completed".to_string(),
        expiry_date: Some(Utc::now() - Duration::days(1)),
    }]);

    assert_eq!(store.get("old").unwrap().status, SessionStatus::Expired);
}

#[test]
fn test_batch_refresh_completes_runs_in_any_unfinished_state() {
    // the server can finish a run while nothing local is watching it
    let mut store = SessionStore::new();
    for (id, status) in [
        ("queued", SessionStatus::Submitted),
        ("crashed", SessionStatus::Failed),
        ("stale", SessionStatus::TimedOut),
    ] {
        let mut session = sample_session(id);
        session.status = status;
        store.create(session);
    }

    let entries: Vec<BatchStatusEntry> = ["queued", "crashed", "stale"]
        .iter()
        .map(|id| BatchStatusEntry {
            session_id: id.to_string(),
            status: "completed".to_string(),
            expiry_date: None,
        })
        .collect();
    store.apply_batch_status(&entries);

    for id in ["queued", "crashed", "stale"] {
        assert_eq!(store.get(id).unwrap().status, SessionStatus::Complete);
    }
}

#[test]
fn test_batch_refresh_ignores_unknown_sessions() {
    let mut store = SessionStore::new();
    store.apply_batch_status(&[BatchStatusEntry {
        session_id: "unknown".to_string(),
        status: "completed".to_string(),
        expiry_date: None,
    }]);
    assert!(store.is_empty());
}

#[test]
fn test_config_round_trip_preserves_order() {
    let mut store = SessionStore::new();
    let config = sample_config();
    store.create(Session::new("abc123", "ordered", config.clone()));

    let read_back = &store.get("abc123").unwrap().config;
    assert_eq!(read_back.len(), 3);
    assert_eq!(*read_back, config);
}

#[tokio::test]
async fn test_persistence_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sessions.json");

    let mut store = SessionStore::with_storage(&path);
    store.create(sample_session("abc123"));
    store.update_meta("abc123", SessionMeta::status(SessionStatus::Polling));
    store.save()?;

    let reloaded = SessionStore::load(&path)?;
    assert_eq!(reloaded.len(), 1);
    let session = reloaded.get("abc123").expect("session lost on reload");
    assert_eq!(session.status, SessionStatus::Polling);
    assert_eq!(session.config, sample_config());
    Ok(())
}

#[tokio::test]
async fn test_mutations_survive_a_dropped_runtime_when_saved_explicitly() -> anyhow::Result<()> {
    // background snapshots ride on spawned tasks, which die with the
    // runtime; an explicit save before shutdown must be enough on its own
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("sessions.json");

    let mut store = SessionStore::with_storage(&path);
    store.create(sample_session("keep"));
    store.create(sample_session("discard"));
    store.rename("keep", "kept run");
    store.delete("discard");
    store.save()?;
    drop(store);

    let reloaded = SessionStore::load(&path)?;
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get("keep").expect("session lost").name, "kept run");
    assert!(reloaded.get("discard").is_none());
    Ok(())
}

#[test]
fn test_load_missing_file_starts_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SessionStore::load(dir.path().join("nothing-here.json"))?;
    assert!(store.is_empty());
    Ok(())
}

mod id_uniqueness {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Create(u8),
        Rename(u8),
        Delete(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..5).prop_map(Op::Create),
            (0u8..5).prop_map(Op::Rename),
            (0u8..5).prop_map(Op::Delete),
        ]
    }

    proptest! {
        /// Any sequence of store operations keeps one entry per id
        #[test]
        fn store_never_holds_duplicate_ids(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut store = SessionStore::new();
            let mut live = std::collections::HashSet::new();

            for op in ops {
                match op {
                    Op::Create(n) => {
                        let id = format!("session-{n}");
                        store.create(sample_session(&id));
                        live.insert(id);
                    }
                    Op::Rename(n) => store.rename(&format!("session-{n}"), "renamed"),
                    Op::Delete(n) => {
                        let id = format!("session-{n}");
                        store.delete(&id);
                        live.remove(&id);
                    }
                }
                prop_assert_eq!(store.len(), live.len());
            }

            let ids = store.session_ids();
            let distinct: std::collections::HashSet<_> = ids.iter().collect();
            prop_assert_eq!(ids.len(), distinct.len());
        }
    }
}
