// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use async_trait::async_trait;
use avs_data_model::Clock;
use rand_core::RngCore;
use serde_json::Value;
use thiserror::Error;
use ulid::Ulid;

/// A [`SessionStore`] gives access to the values stored for one visitor
/// session.
///
/// Changes are only persisted when [`SessionStore::save`] is called. Dropping
/// the store without saving discards them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The error type returned by the store
    type Error;

    /// The ID of the session this store is bound to
    fn id(&self) -> Ulid;

    /// Get the value stored under a key
    ///
    /// Returns `None` if nothing is stored under this key
    ///
    /// # Parameters
    ///
    /// * `key`: The key to lookup
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying store fails
    async fn get(&mut self, key: &str) -> Result<Option<Value>, Self::Error>;

    /// Store a value under a key, replacing any previous value
    ///
    /// # Parameters
    ///
    /// * `key`: The key to write
    /// * `value`: The value to store
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying store fails
    async fn set(&mut self, key: &str, value: Value) -> Result<(), Self::Error>;

    /// Remove the value stored under a key, if any
    ///
    /// # Parameters
    ///
    /// * `key`: The key to remove
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the underlying store fails
    async fn remove(&mut self, key: &str) -> Result<(), Self::Error>;

    /// Persist the changes made through this store, and release the session
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the changes could not be persisted
    async fn save(self: Box<Self>) -> Result<(), Self::Error>;
}

/// A type-erased [`SessionStore`]
pub type BoxSessionStore = Box<dyn SessionStore<Error = SessionStoreError> + Send + Sync + 'static>;

/// Opens [`SessionStore`]s for visitor sessions
#[async_trait]
pub trait SessionStoreFactory: Send + Sync {
    /// Open the store of an existing session.
    ///
    /// The session is held exclusively until the returned store is dropped:
    /// opening the same session again waits for it to be released.
    ///
    /// Returns `None` if the session is unknown or expired
    ///
    /// # Parameters
    ///
    /// * `clock`: The clock used to check for expiration
    /// * `id`: The ID of the session to open
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    async fn open(
        &self,
        clock: &dyn Clock,
        id: Ulid,
    ) -> Result<Option<BoxSessionStore>, SessionStoreError>;

    /// Start a new, empty session
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator used to generate the session ID
    /// * `clock`: The clock used to generate timestamps
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    async fn start(
        &self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
    ) -> Result<BoxSessionStore, SessionStoreError>;
}

/// A type-erased [`SessionStoreFactory`]
pub type BoxSessionStoreFactory = Box<dyn SessionStoreFactory + 'static>;

/// An opaque, type-erased error
#[derive(Debug, Error)]
#[error(transparent)]
pub struct SessionStoreError {
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl SessionStoreError {
    /// Construct a [`SessionStoreError`] from any error kind
    pub fn from_error<E>(value: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            source: Box::new(value),
        }
    }
}
