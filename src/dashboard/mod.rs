//! Property-management resources served by the dashboard backend.
//!
//! Each type is bound to its REST collection with `#[derive(Resource)]`.
//! Fields the client does not model are kept in `extra`, so they survive
//! merges and are sent back on update.

mod resources;

use std::sync::Arc;

use tracing::info;

use crate::config::ClientConfig;
use crate::entity::{Entity, Resource};
use crate::error::StoreError;
use crate::notify::Notifier;
use crate::remote::CollectionRemote;
use crate::store::CollectionStore;
use crate::validate::RequiredFields;

pub use resources::{
    Booking, BookingStatus, Checklist, ChecklistItem, Guest, Listing, RoomType, Unit, User,
};

/// Fields a create must carry for `collection`. Unknown collections require
/// nothing.
pub fn required_fields(collection: &str) -> RequiredFields {
    let fields: &[&str] = match collection {
        Listing::COLLECTION => &["title"],
        Booking::COLLECTION => &["listingId", "guestId", "checkIn", "checkOut"],
        Guest::COLLECTION => &["name"],
        User::COLLECTION => &["email"],
        RoomType::COLLECTION => &["name"],
        Unit::COLLECTION => &["name", "roomTypeId"],
        Checklist::COLLECTION => &["title"],
        _ => &[],
    };
    RequiredFields::new(fields.iter().copied())
}

/// One store per dashboard resource, sharing a remote and a notifier.
#[derive(Clone)]
pub struct Dashboard {
    pub listings: CollectionStore<Listing>,
    pub bookings: CollectionStore<Booking>,
    pub guests: CollectionStore<Guest>,
    pub users: CollectionStore<User>,
    pub room_types: CollectionStore<RoomType>,
    pub units: CollectionStore<Unit>,
    pub checklists: CollectionStore<Checklist>,
}

impl Dashboard {
    pub fn new(
        remote: Arc<dyn CollectionRemote>,
        notifier: Arc<dyn Notifier>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            listings: store(&remote, &notifier, config),
            bookings: store(&remote, &notifier, config),
            guests: store(&remote, &notifier, config),
            users: store(&remote, &notifier, config),
            room_types: store(&remote, &notifier, config),
            units: store(&remote, &notifier, config),
            checklists: store(&remote, &notifier, config),
        }
    }

    /// Load every collection concurrently. All loads run to completion; the
    /// first failure is returned.
    pub async fn load_all(&self) -> Result<(), StoreError> {
        let (listings, bookings, guests, users, room_types, units, checklists) = tokio::join!(
            self.listings.load(),
            self.bookings.load(),
            self.guests.load(),
            self.users.load(),
            self.room_types.load(),
            self.units.load(),
            self.checklists.load(),
        );
        listings?;
        bookings?;
        guests?;
        users?;
        room_types?;
        units?;
        checklists?;
        info!("dashboard loaded");
        Ok(())
    }

    pub fn dispose(&self) {
        self.listings.dispose();
        self.bookings.dispose();
        self.guests.dispose();
        self.users.dispose();
        self.room_types.dispose();
        self.units.dispose();
        self.checklists.dispose();
    }
}

fn store<T: Resource>(
    remote: &Arc<dyn CollectionRemote>,
    notifier: &Arc<dyn Notifier>,
    config: &ClientConfig,
) -> CollectionStore<T> {
    CollectionStore::builder(Arc::clone(remote), T::COLLECTION)
        .notifier(Arc::clone(notifier))
        .validator(Arc::new(required_fields(T::COLLECTION)))
        .config(config)
        .build()
}

/// Whether `entity` is still a client-side placeholder.
pub fn is_unsaved<T: Entity>(entity: &T) -> bool {
    entity.id().is_local()
}
