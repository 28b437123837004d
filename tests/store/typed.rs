//! Typed dashboard resources through the same store.

use std::sync::Arc;

use optimistic_store::dashboard::{Booking, BookingStatus, Dashboard, Listing};
use optimistic_store::{
    BufferNotifier, ClientConfig, CollectionStore, EntityId, InMemoryRemote, Resource,
    StoreError,
};
use serde_json::json;

fn backend() -> InMemoryRemote {
    let remote = InMemoryRemote::new();
    remote.seed(
        Listing::COLLECTION,
        [
            json!({ "id": 1, "title": "Harbour loft", "nightlyRate": 180.0, "active": true }),
            json!({ "id": 2, "title": "Garden studio", "amenities": ["wifi"] }),
        ],
    );
    remote.seed(
        Booking::COLLECTION,
        [json!({
            "id": 10,
            "listingId": 1,
            "guestId": 5,
            "checkIn": "2024-06-01",
            "checkOut": "2024-06-04"
        })],
    );
    remote
}

#[tokio::test]
async fn typed_updates_keep_unmodelled_fields() {
    let remote = backend();
    let store = CollectionStore::<Listing>::for_resource(Arc::new(remote.clone()));
    store.load().await.unwrap();

    let updated = store
        .update(EntityId::Int(2), &json!({ "nightlyRate": 95.0 }))
        .await
        .unwrap();

    assert_eq!(updated.nightly_rate, Some(95.0));
    assert_eq!(updated.extra.get("amenities"), Some(&json!(["wifi"])));
    assert_eq!(
        remote.list_now("listings")[1]["amenities"],
        json!(["wifi"])
    );
}

#[tokio::test]
async fn null_in_a_patch_clears_an_optional_field() {
    let remote = InMemoryRemote::new();
    remote.seed(
        Listing::COLLECTION,
        [json!({ "id": 1, "title": "Loft", "description": "old" })],
    );
    let notifier = BufferNotifier::new();
    let store = CollectionStore::<Listing>::builder(Arc::new(remote.clone()), Listing::COLLECTION)
        .notifier(Arc::new(notifier.clone()))
        .build();
    store.load().await.unwrap();

    let updated = store
        .update(1, &json!({ "description": null }))
        .await
        .unwrap();

    assert_eq!(updated.description, None);
    assert_eq!(store.get(&EntityId::Int(1)).unwrap().description, None);
    let stored = &remote.list_now(Listing::COLLECTION)[0];
    assert_eq!(stored["description"], json!(null));
    assert_eq!(stored["title"], json!("Loft"));
    assert!(notifier.is_empty());
}

#[tokio::test]
async fn drafts_that_cannot_form_the_type_are_rejected_locally() {
    let remote = backend();
    let notifier = BufferNotifier::new();
    let store = CollectionStore::<Listing>::builder(Arc::new(remote.clone()), Listing::COLLECTION)
        .notifier(Arc::new(notifier.clone()))
        .build();
    store.load().await.unwrap();

    let err = store.create(&json!({ "nightlyRate": 10.0 })).await.unwrap_err();

    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.len(), 2);
    assert_eq!(notifier.len(), 1);
}

#[tokio::test]
async fn dashboard_loads_every_collection_with_required_field_rules() {
    let remote = backend();
    let notifier = BufferNotifier::new();
    let dashboard = Dashboard::new(
        Arc::new(remote.clone()),
        Arc::new(notifier.clone()),
        &ClientConfig::new("http://unused"),
    );

    dashboard.load_all().await.unwrap();
    assert_eq!(dashboard.listings.len(), 2);
    assert_eq!(dashboard.bookings.entities()[0].status, BookingStatus::Pending);
    assert!(dashboard.guests.is_empty());

    let err = dashboard
        .bookings
        .create(&json!({ "listingId": 1, "guestId": 5, "checkIn": "2024-07-01" }))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Validation("missing required fields: checkOut".into()));

    let booking = dashboard
        .bookings
        .update(EntityId::Int(10), &json!({ "status": "confirmed" }))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);

    dashboard.dispose();
    assert!(dashboard.units.is_disposed());
}
