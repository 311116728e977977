// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! An in-memory implementation of the session store

use std::{
    collections::{BTreeMap, HashMap},
    convert::Infallible,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use avs_data_model::Clock;
use chrono::{DateTime, Duration, Utc};
use rand_core::RngCore;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::{BoxSessionStore, SessionStore, SessionStoreError, SessionStoreFactory};

/// How often expired sessions are looked for
const PURGE_INTERVAL: Duration = Duration::minutes(1);

#[derive(Debug, Default)]
struct Record {
    values: BTreeMap<String, Value>,

    /// `None` until the session was saved once
    expires_at: Option<DateTime<Utc>>,
}

impl Record {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at > now)
    }
}

type SharedRecord = Arc<AsyncMutex<Record>>;

#[derive(Debug)]
struct Inner {
    ttl: Duration,
    records: Mutex<HashMap<Ulid, SharedRecord>>,
    last_purge: Mutex<Option<DateTime<Utc>>>,
}

/// A [`SessionStoreFactory`] keeping sessions in memory.
///
/// Sessions idle for longer than the configured TTL are forgotten. Cloning
/// the factory gives another handle to the same sessions.
#[derive(Debug, Clone)]
pub struct MemorySessionStoreFactory {
    inner: Arc<Inner>,
}

impl MemorySessionStoreFactory {
    /// Create a new factory, expiring sessions after `ttl` without activity
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                records: Mutex::new(HashMap::new()),
                last_purge: Mutex::new(None),
            }),
        }
    }

    /// Box the factory
    #[must_use]
    pub fn boxed(self) -> crate::BoxSessionStoreFactory {
        Box::new(self)
    }

    /// The number of sessions currently held in memory
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session is held in memory
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget the sessions which are expired or were never saved.
    ///
    /// Sessions currently opened are kept. Returns the number of sessions
    /// removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut records = self
            .inner
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let before = records.len();
        records.retain(|_, record| {
            // Someone else holds a handle on this record, it is about to be used
            if Arc::strong_count(record) > 1 {
                return true;
            }

            match record.try_lock() {
                Ok(record) => record.is_live(now),
                Err(_) => true,
            }
        });

        before - records.len()
    }

    /// Run [`Self::purge_expired`] if it didn't run recently
    fn maybe_purge(&self, now: DateTime<Utc>) {
        {
            let mut last_purge = self
                .inner
                .last_purge
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if last_purge.is_some_and(|last| now - last < PURGE_INTERVAL) {
                return;
            }

            *last_purge = Some(now);
        }

        let purged = self.purge_expired(now);
        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
    }

    async fn acquire(
        &self,
        id: Ulid,
        record: SharedRecord,
        now: DateTime<Utc>,
    ) -> MemorySessionStore {
        let guard = record.lock_owned().await;
        let values = guard.values.clone();

        MemorySessionStore {
            id,
            guard,
            values,
            expires_at: now + self.inner.ttl,
        }
    }
}

#[async_trait]
impl SessionStoreFactory for MemorySessionStoreFactory {
    async fn open(
        &self,
        clock: &dyn Clock,
        id: Ulid,
    ) -> Result<Option<BoxSessionStore>, SessionStoreError> {
        let now = clock.now();
        self.maybe_purge(now);

        let record = self
            .inner
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();

        let Some(record) = record else {
            return Ok(None);
        };

        let store = self.acquire(id, record, now).await;

        // The session may have expired while we were waiting for the lock
        if !store.guard.is_live(now) {
            return Ok(None);
        }

        Ok(Some(Box::new(MapInfallible(store))))
    }

    async fn start(
        &self,
        rng: &mut (dyn RngCore + Send),
        clock: &dyn Clock,
    ) -> Result<BoxSessionStore, SessionStoreError> {
        let now = clock.now();
        self.maybe_purge(now);

        let id = Ulid::from_datetime_with_source(now.into(), rng);
        let record = SharedRecord::default();
        self.inner
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&record));

        let store = self.acquire(id, record, now).await;
        Ok(Box::new(MapInfallible(store)))
    }
}

/// A handle on a session held in memory.
///
/// Holds the lock on the session record, and works on a copy of its values
/// which is written back on save.
pub struct MemorySessionStore {
    id: Ulid,
    guard: OwnedMutexGuard<Record>,
    values: BTreeMap<String, Value>,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    type Error = Infallible;

    fn id(&self) -> Ulid {
        self.id
    }

    async fn get(&mut self, key: &str) -> Result<Option<Value>, Self::Error> {
        Ok(self.values.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        self.values.remove(key);
        Ok(())
    }

    async fn save(self: Box<Self>) -> Result<(), Self::Error> {
        let Self {
            mut guard,
            values,
            expires_at,
            ..
        } = *self;

        guard.values = values;
        guard.expires_at = Some(expires_at);
        Ok(())
    }
}

/// Adapts an infallible store to the type-erased [`SessionStoreError`]
struct MapInfallible<S>(S);

#[async_trait]
impl<S> SessionStore for MapInfallible<S>
where
    S: SessionStore<Error = Infallible> + 'static,
{
    type Error = SessionStoreError;

    fn id(&self) -> Ulid {
        self.0.id()
    }

    async fn get(&mut self, key: &str) -> Result<Option<Value>, Self::Error> {
        let Ok(value) = self.0.get(key).await;
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: Value) -> Result<(), Self::Error> {
        let Ok(()) = self.0.set(key, value).await;
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<(), Self::Error> {
        let Ok(()) = self.0.remove(key).await;
        Ok(())
    }

    async fn save(self: Box<Self>) -> Result<(), Self::Error> {
        let Ok(()) = Box::new(self.0).save().await;
        Ok(())
    }
}
