use std::collections::HashSet;
use std::sync::Arc;

use optimistic_store::{
    EntityId, InMemoryRemote, RemoteError, RemoteOp, RequiredFields, Severity, StoreError,
    StoreStatus,
};
use serde_json::json;

use crate::support::*;

#[tokio::test]
async fn create_shows_a_local_entity_then_adopts_the_server_id() {
    let remote = InMemoryRemote::new()
        .with_id_prefix("srv-")
        .with_next_id(7)
        .gated();
    let (store, notifier) = store(&remote);
    remote.release(1);
    store.load().await.unwrap();
    assert!(store.is_empty());

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.create(&json!({ "name": "X" })).await }
    });
    wait_pending(&store, 1).await;

    let optimistic = store.entities();
    assert_eq!(optimistic.len(), 1);
    assert!(optimistic[0].id.is_local());
    assert_eq!(optimistic[0].get("name"), Some(&json!("X")));
    assert_eq!(store.status(), StoreStatus::Mutating);

    remote.release(1);
    let created = pending.await.unwrap().unwrap();

    assert_eq!(created, record(json!({ "id": "srv-7", "name": "X" })));
    assert_eq!(store.entities(), vec![record(json!({ "id": "srv-7", "name": "X" }))]);
    assert_eq!(store.status(), StoreStatus::Ready);
    assert!(notifier.is_empty());
}

#[tokio::test]
async fn created_entity_lands_where_its_placeholder_was() {
    let (remote, store, _) = loaded_gated().await;

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.create(&json!({ "name": "X" })).await }
    });
    wait_pending(&store, 1).await;
    wait_calls(&remote, RemoteOp::Create, 1).await;
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.create(&json!({ "name": "Y" })).await }
    });
    wait_pending(&store, 2).await;
    wait_calls(&remote, RemoteOp::Create, 2).await;
    assert_eq!(names(&store), vec!["A", "B", "C", "X", "Y"]);

    remote.release(1);
    first.await.unwrap().unwrap();
    assert_eq!(names(&store), vec!["A", "B", "C", "X", "Y"]);
    assert!(!store.entities()[3].id.is_local());
    assert!(store.entities()[4].id.is_local());

    remote.release(1);
    second.await.unwrap().unwrap();
    assert_eq!(store.entities(), remote_records(&remote));
}

#[tokio::test]
async fn ids_stay_unique_through_every_create_transition() {
    let (remote, store, _) = loaded_gated().await;
    let mut rx = store.subscribe();

    let watcher = tokio::spawn(async move {
        let mut seen = 0;
        while rx.changed().await.is_ok() {
            let snapshot = rx.borrow_and_update().clone();
            let ids: HashSet<EntityId> = snapshot.entities.iter().map(|r| r.id.clone()).collect();
            assert_eq!(ids.len(), snapshot.entities.len(), "duplicate id in {:?}", snapshot.entities);
            seen += 1;
            if snapshot.pending == 0 && snapshot.entities.len() == 6 {
                break;
            }
        }
        seen
    });

    let creates: Vec<_> = ["X", "Y", "Z"]
        .into_iter()
        .map(|name| {
            let store = store.clone();
            tokio::spawn(async move { store.create(&json!({ "name": name })).await })
        })
        .collect();
    wait_pending(&store, 3).await;
    remote.release(3);
    for create in creates {
        create.await.unwrap().unwrap();
    }

    assert!(watcher.await.unwrap() > 0);
    assert_eq!(store.entities(), remote_records(&remote));
}

#[tokio::test]
async fn failed_create_removes_the_placeholder_and_notifies_once() {
    let remote = seeded_remote();
    let (store, notifier) = store(&remote);
    store.load().await.unwrap();
    let before = store.entities();
    remote.fail_next(
        RemoteOp::Create,
        RemoteError::Validation("name already taken".into()),
    );

    let err = store.create(&json!({ "name": "A" })).await.unwrap_err();

    assert_eq!(
        err,
        StoreError::Remote(RemoteError::Validation("name already taken".into()))
    );
    assert_eq!(store.entities(), before);
    assert_eq!(store.pending_count(), 0);

    let notes = notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Error);
    assert_eq!(notes[0].title, "Could not create listings");
    assert!(notes[0].message.contains("name already taken"));
}

#[tokio::test]
async fn client_supplied_ids_are_ignored() {
    let remote = seeded_remote();
    let (store, _) = store(&remote);
    store.load().await.unwrap();

    let created = store.create(&json!({ "id": 2, "name": "D" })).await.unwrap();

    assert_eq!(created.id, id(4));
    let sent = &remote.calls()[1];
    assert_eq!(sent.op, RemoteOp::Create);
    assert!(sent.body.as_ref().unwrap().get("id").is_none());
}

#[tokio::test]
async fn invalid_drafts_never_reach_the_remote() {
    let remote = seeded_remote();
    let notifier = optimistic_store::BufferNotifier::new();
    let store = builder(&remote, &notifier)
        .validator(Arc::new(RequiredFields::new(["name", "city"])))
        .build();
    store.load().await.unwrap();
    let before = store.snapshot();

    let err = store.create(&json!({ "name": "D" })).await.unwrap_err();

    assert_eq!(err, StoreError::Validation("missing required fields: city".into()));
    assert_eq!(store.snapshot(), before);
    assert_eq!(count_calls(&remote, RemoteOp::Create), 0);
    assert_eq!(notifier.len(), 1);
}

#[tokio::test]
async fn non_object_payloads_are_rejected() {
    let remote = seeded_remote();
    let (store, notifier) = store(&remote);
    store.load().await.unwrap();

    let err = store.create(&json!(["not", "an", "object"])).await.unwrap_err();

    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(count_calls(&remote, RemoteOp::Create), 0);
    assert_eq!(notifier.len(), 1);
}

#[tokio::test]
async fn success_notifications_are_opt_in() {
    let remote = seeded_remote();
    let notifier = optimistic_store::BufferNotifier::new();
    let store = builder(&remote, &notifier).notify_success(true).build();
    store.load().await.unwrap();

    store.create(&json!({ "name": "D" })).await.unwrap();

    let notes = notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Success);
    assert_eq!(notes[0].title, "Created listings");
}
