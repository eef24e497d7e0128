//! Session-backed snapshot storage for cart and favorites.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_sessions::Session;

use bazaar_core::cart::CartState;
use bazaar_core::favorites::Favorites;
use bazaar_core::store::SnapshotStore;

use crate::models::session_keys;

/// A [`SnapshotStore`] slot stored under one key of the visitor's session.
///
/// The session row is written by the session layer after the response,
/// so each save is a full overwrite of the key.
#[derive(Debug, Clone)]
pub struct SessionSnapshotStore<T> {
    session: Session,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SessionSnapshotStore<T> {
    /// Slot under `key` in `session`.
    #[must_use]
    pub const fn new(session: Session, key: &'static str) -> Self {
        Self {
            session,
            key,
            _marker: PhantomData,
        }
    }
}

impl SessionSnapshotStore<CartState> {
    /// The visitor's cart slot.
    #[must_use]
    pub const fn cart(session: Session) -> Self {
        Self::new(session, session_keys::CART)
    }
}

impl SessionSnapshotStore<Favorites> {
    /// The visitor's favorites slot.
    #[must_use]
    pub const fn favorites(session: Session) -> Self {
        Self::new(session, session_keys::FAVORITES)
    }
}

impl<T> SnapshotStore<T> for SessionSnapshotStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    type Error = tower_sessions::session::Error;

    async fn load(&self) -> Result<Option<T>, Self::Error> {
        self.session.get::<T>(self.key).await
    }

    async fn save(&self, snapshot: &T) -> Result<(), Self::Error> {
        self.session.insert(self.key, snapshot).await
    }

    async fn discard(&self) -> Result<(), Self::Error> {
        self.session.remove_value(self.key).await.map(|_| ())
    }
}
