//! Whole-sequence properties: local state converges on the remote's.

use std::time::Duration;

use optimistic_store::{InMemoryRemote, RemoteError, RemoteOp};
use serde_json::json;

use crate::support::*;

#[tokio::test]
async fn successful_sequences_match_the_remote_listing() {
    let remote = InMemoryRemote::new().with_id_prefix("srv-");
    let (store, notifier) = store(&remote);
    store.load().await.unwrap();

    let mut created = Vec::new();
    for name in ["Loft", "Cabin", "Studio", "Villa"] {
        created.push(store.create(&json!({ "name": name, "beds": 1 })).await.unwrap());
    }
    store.update(created[1].id.clone(), &json!({ "beds": 4 })).await.unwrap();
    store.delete(created[0].id.clone()).await.unwrap();
    store.update(created[3].id.clone(), &json!({ "name": "Villa Sol" })).await.unwrap();
    store.create(&json!({ "name": "Hut" })).await.unwrap();
    store.delete(created[2].id.clone()).await.unwrap();

    assert_eq!(store.entities(), remote_records(&remote));
    assert_eq!(names(&store), vec!["Cabin", "Villa Sol", "Hut"]);
    assert!(notifier.is_empty());

    // A fresh load agrees with what the store built incrementally.
    let built = store.entities();
    store.load().await.unwrap();
    assert_eq!(store.entities(), built);
}

#[tokio::test]
async fn concurrent_successes_converge() {
    let remote = seeded_remote().with_latency(Duration::from_millis(5));
    let (store, _) = store(&remote);
    store.load().await.unwrap();

    let mut handles = Vec::new();
    for n in 1..=3 {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.update(id(n), &json!({ "round": 1 })).await.map(|_| ())
        }));
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.create(&json!({ "name": format!("new-{n}") })).await.map(|_| ())
        }));
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.update(id(n), &json!({ "round": 2 })).await.map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.pending_count(), 0);
    assert_eq!(store.entities(), remote_records(&remote));
    for entity in store.entities().iter().take(3) {
        assert_eq!(entity.get("round"), Some(&json!(2)));
    }
}

#[tokio::test]
async fn each_single_failure_restores_the_previous_collection() {
    let remote = seeded_remote();
    let (store, notifier) = store(&remote);
    store.load().await.unwrap();

    let cases = [
        (RemoteOp::Create, RemoteError::Timeout),
        (RemoteOp::Update, RemoteError::Validation("bad".into())),
        (RemoteOp::Delete, RemoteError::NotFound("listings/2".into())),
    ];
    for (op, error) in cases {
        let before = store.entities();
        remote.fail_next(op, error);
        let result = match op {
            RemoteOp::Create => store.create(&json!({ "name": "D" })).await.map(|_| ()),
            RemoteOp::Update => store.update(id(2), &json!({ "name": "B2" })).await.map(|_| ()),
            RemoteOp::Delete => store.delete(id(2)).await,
            RemoteOp::List => unreachable!(),
        };
        assert!(result.is_err());
        assert_eq!(store.entities(), before, "after failed {:?}", op);
    }
    assert_eq!(notifier.len(), 3);
    assert_eq!(store.entities(), remote_records(&remote));
}
