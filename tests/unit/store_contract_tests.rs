// ============================
// tests/unit/store_contract_tests.rs
// ============================
//! The same behaviour checks run against every `SessionStore` backend.

use chrono::{Duration as ChronoDuration, Utc};
use sessiongate_backend::auth::provider::ProviderSession;
use sessiongate_backend::auth::{ClientInfo, Session};
use sessiongate_backend::storage::{FlatFileSessionStore, MemorySessionStore, SessionStore};
use std::time::Duration;
use tempfile::TempDir;

const TTL: Duration = Duration::from_secs(300);

fn session_for(user_id: &str) -> Session {
    Session::new(
        user_id.to_string(),
        ProviderSession {
            access_token: format!("pa-{user_id}"),
            refresh_token: format!("pr-{user_id}"),
            expires_in: Some(3600),
        },
        ClientInfo {
            ip: Some("192.0.2.1".into()),
            user_agent: Some("contract-test".into()),
        },
    )
}

fn backends() -> (Vec<(&'static str, Box<dyn SessionStore>)>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let file = FlatFileSessionStore::new(temp_dir.path()).unwrap();
    (
        vec![
            ("memory", Box::new(MemorySessionStore::new())),
            ("file", Box::new(file)),
        ],
        temp_dir,
    )
}

#[tokio::test]
async fn test_read_your_writes_and_delete() {
    let (stores, _temp_dir) = backends();
    for (name, store) in stores {
        let session = session_for("alice");
        store.set(&session.session_id, &session, TTL).await.unwrap();
        assert_eq!(
            store.get(&session.session_id).await.unwrap().as_ref(),
            Some(&session),
            "{name}"
        );

        store.delete(&session.session_id).await.unwrap();
        assert!(store.get(&session.session_id).await.unwrap().is_none(), "{name}");
        store.delete(&session.session_id).await.unwrap();
        assert!(store.get("never-written").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_set_replaces_whole_record() {
    let (stores, _temp_dir) = backends();
    for (name, store) in stores {
        let mut session = session_for("alice");
        store.set(&session.session_id, &session, TTL).await.unwrap();

        session.provider_access_token = "rotated".into();
        store.set(&session.session_id, &session, TTL).await.unwrap();

        let loaded = store.get(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.provider_access_token, "rotated", "{name}");
    }
}

#[tokio::test]
async fn test_replace_never_revives_deleted_records() {
    let (stores, _temp_dir) = backends();
    for (name, store) in stores {
        let mut session = session_for("alice");
        assert!(!store.replace(&session.session_id, &session, TTL).await.unwrap(), "{name}");
        assert!(store.get(&session.session_id).await.unwrap().is_none(), "{name}");

        store.set(&session.session_id, &session, TTL).await.unwrap();
        session.provider_refresh_token = "rotated".into();
        assert!(store.replace(&session.session_id, &session, TTL).await.unwrap(), "{name}");

        store.delete(&session.session_id).await.unwrap();
        assert!(!store.replace(&session.session_id, &session, TTL).await.unwrap(), "{name}");
        assert!(store.get(&session.session_id).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_touch_only_moves_activity() {
    let (stores, _temp_dir) = backends();
    for (name, store) in stores {
        let session = session_for("alice");
        store.set(&session.session_id, &session, TTL).await.unwrap();

        let at = Utc::now() + ChronoDuration::seconds(30);
        assert!(store.touch(&session.session_id, at, TTL).await.unwrap(), "{name}");
        let loaded = store.get(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.last_activity, at, "{name}");
        assert_eq!(loaded.created_at, session.created_at, "{name}");
        assert_eq!(loaded.csrf_token, session.csrf_token, "{name}");
        assert_eq!(loaded.ip, session.ip, "{name}");

        store.delete(&session.session_id).await.unwrap();
        assert!(!store.touch(&session.session_id, at, TTL).await.unwrap(), "{name}");
        assert!(store.get(&session.session_id).await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn test_expired_records_are_invisible() {
    let (stores, _temp_dir) = backends();
    for (name, store) in stores {
        let session = session_for("alice");
        store
            .set(&session.session_id, &session, Duration::ZERO)
            .await
            .unwrap();
        assert!(store.get(&session.session_id).await.unwrap().is_none(), "{name}");
        assert!(store.list_by_user("alice").await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn test_list_by_user() {
    let (stores, _temp_dir) = backends();
    for (name, store) in stores {
        for user in ["alice", "alice", "bob"] {
            let session = session_for(user);
            store.set(&session.session_id, &session, TTL).await.unwrap();
        }
        let alice = store.list_by_user("alice").await.unwrap();
        assert_eq!(alice.len(), 2, "{name}");
        assert!(alice.iter().all(|s| s.user_id == "alice"), "{name}");
        assert!(store.list_by_user("carol").await.unwrap().is_empty(), "{name}");
        assert!(store.health_check().await.is_ok(), "{name}");
    }
}
