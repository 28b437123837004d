use optimistic_store::{CollectionRemote, EntityId, HttpRemote, RemoteError};
use serde_json::json;

use crate::support::*;

fn fields(value: serde_json::Value) -> optimistic_store::Fields {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn health_check() {
    let base = start_server(optimistic_store::mock::MockServer::new(backend())).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["collections"], json!(["listings"]));
}

#[tokio::test]
async fn crud_round_trip() {
    let backend = backend();
    let base = start_server(optimistic_store::mock::MockServer::new(backend.clone())).await;
    let remote = HttpRemote::new(&base).unwrap();

    let listed = remote.list("listings").await.unwrap();
    assert_eq!(listed.len(), 2);

    let created = remote
        .create("listings", &fields(json!({ "title": "Cabin" })))
        .await
        .unwrap();
    assert_eq!(created, json!({ "id": 3, "title": "Cabin" }));

    let updated = remote
        .update(
            "listings",
            &EntityId::Int(3),
            &fields(json!({ "id": 3, "title": "Lake cabin" })),
        )
        .await
        .unwrap();
    assert_eq!(updated["title"], "Lake cabin");

    remote.delete("listings", &EntityId::Int(1)).await.unwrap();
    assert_eq!(backend.list_now("listings").len(), 2);
}

#[tokio::test]
async fn string_ids_travel_in_the_path() {
    let backend = optimistic_store::InMemoryRemote::new().with_id_prefix("srv-");
    let base = start_server(optimistic_store::mock::MockServer::new(backend.clone())).await;
    let remote = HttpRemote::new(&format!("{base}/")).unwrap();

    let created = remote
        .create("guests", &fields(json!({ "name": "Ada" })))
        .await
        .unwrap();
    assert_eq!(created["id"], "srv-1");

    remote
        .delete("guests", &EntityId::from("srv-1"))
        .await
        .unwrap();
    assert!(backend.list_now("guests").is_empty());
}

#[tokio::test]
async fn numeric_looking_string_ids_stay_addressable() {
    let backend = optimistic_store::InMemoryRemote::new();
    backend.seed(
        "guests",
        [
            json!({ "id": "1700000000000", "name": "Ada" }),
            json!({ "id": "007", "name": "Bond" }),
        ],
    );
    let base = start_server(optimistic_store::mock::MockServer::new(backend.clone())).await;
    let remote = HttpRemote::new(&base).unwrap();

    let updated = remote
        .update(
            "guests",
            &EntityId::from("007"),
            &fields(json!({ "id": "007", "name": "James" })),
        )
        .await
        .unwrap();
    assert_eq!(updated, json!({ "id": "007", "name": "James" }));

    remote
        .delete("guests", &EntityId::from("1700000000000"))
        .await
        .unwrap();
    assert_eq!(backend.list_now("guests"), vec![updated]);
}

#[tokio::test]
async fn statuses_map_onto_remote_errors() {
    let backend = backend();
    let base = start_server(optimistic_store::mock::MockServer::new(backend.clone())).await;
    let remote = HttpRemote::new(&base).unwrap();

    let err = remote.delete("listings", &EntityId::Int(99)).await.unwrap_err();
    assert_eq!(err, RemoteError::NotFound("listings/99".into()));

    backend.fail_next(
        optimistic_store::RemoteOp::Create,
        RemoteError::Validation("title is required".into()),
    );
    let err = remote
        .create("listings", &fields(json!({})))
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::Validation("title is required".into()));

    backend.fail_next(
        optimistic_store::RemoteOp::List,
        RemoteError::Rejected {
            status: 503,
            message: "maintenance".into(),
        },
    );
    let err = remote.list("listings").await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::Rejected {
            status: 503,
            message: "maintenance".into()
        }
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = HttpRemote::new(&format!("http://{addr}")).unwrap();
    let err = remote.list("listings").await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
}
