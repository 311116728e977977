// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Age gate state kept in a visitor session

use avs_data_model::{Clock, Frequency, GateState, PassMarker, should_prompt};
use rand_core::RngCore;
use serde::{Serialize, de::DeserializeOwned};
use ulid::Ulid;

use crate::{BoxSessionStore, SessionStoreError};

const STATE_KEY: &str = "avs.state";
const TOKENS_KEY: &str = "avs.tokens";
const LAST_PASS_KEY: &str = "avs.last_pass";

/// Maximum number of unconsumed tokens kept in a session. Issuing more drops
/// the oldest ones.
pub const MAX_OUTSTANDING_TOKENS: usize = 64;

/// Number of random bytes in a verification token
const TOKEN_BYTES: usize = 16;

/// The age gate view over a visitor session.
///
/// Holds the session exclusively: changes are persisted by [`Self::save`] and
/// discarded if it is dropped instead.
pub struct GateSession {
    store: BoxSessionStore,
}

impl GateSession {
    /// Wrap a session store
    #[must_use]
    pub fn new(store: BoxSessionStore) -> Self {
        Self { store }
    }

    /// The ID of the underlying session
    #[must_use]
    pub fn id(&self) -> Ulid {
        self.store.id()
    }

    /// Read a value, treating values of the wrong shape as absent
    async fn read<T: DeserializeOwned>(
        &mut self,
        key: &str,
    ) -> Result<Option<T>, SessionStoreError> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_value(value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(
                    error = &e as &dyn std::error::Error,
                    key,
                    "Ignoring malformed session value"
                );
                Ok(None)
            }
        }
    }

    async fn write<T: Serialize + Sync>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), SessionStoreError> {
        let value = serde_json::to_value(value).map_err(SessionStoreError::from_error)?;
        self.store.set(key, value).await
    }

    async fn tokens(&mut self) -> Result<Vec<String>, SessionStoreError> {
        Ok(self.read(TOKENS_KEY).await?.unwrap_or_default())
    }

    /// Issue a new single-use verification token bound to this session
    ///
    /// # Parameters
    ///
    /// * `rng`: The random number generator used to generate the token
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn issue_token(
        &mut self,
        rng: &mut (dyn RngCore + Send),
    ) -> Result<String, SessionStoreError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let mut tokens = self.tokens().await?;
        tokens.push(token.clone());
        if tokens.len() > MAX_OUTSTANDING_TOKENS {
            let excess = tokens.len() - MAX_OUTSTANDING_TOKENS;
            tokens.drain(..excess);
        }

        self.write(TOKENS_KEY, &tokens).await?;
        Ok(token)
    }

    /// Consume a verification token.
    ///
    /// Returns `true` and forgets the token if it was issued to this session
    /// and not consumed yet, `false` without changing anything otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn consume_token(&mut self, token: &str) -> Result<bool, SessionStoreError> {
        let mut tokens = self.tokens().await?;
        let Some(position) = tokens.iter().position(|candidate| candidate == token) else {
            return Ok(false);
        };

        tokens.remove(position);
        self.write(TOKENS_KEY, &tokens).await?;
        Ok(true)
    }

    /// The outcome recorded in this session, if any
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn state(&mut self) -> Result<Option<GateState>, SessionStoreError> {
        self.read(STATE_KEY).await
    }

    /// The marker of the period in which this session last passed, if any
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn last_pass_marker(&mut self) -> Result<Option<String>, SessionStoreError> {
        self.read(LAST_PASS_KEY).await
    }

    /// Record that the visitor passed the gate.
    ///
    /// Under the daily and weekly frequencies, also records the current period
    /// so that the visitor isn't prompted again until it ends.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn mark_passed(
        &mut self,
        clock: &dyn Clock,
        frequency: Frequency,
    ) -> Result<(), SessionStoreError> {
        self.write(STATE_KEY, &GateState::Passed).await?;

        match PassMarker::current(frequency, clock.now()) {
            Some(marker) => self.write(LAST_PASS_KEY, &marker.to_string()).await,
            None => self.store.remove(LAST_PASS_KEY).await,
        }
    }

    /// Record that the visitor was denied by the gate.
    ///
    /// This forgets when the visitor last passed.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn mark_denied(&mut self) -> Result<(), SessionStoreError> {
        self.write(STATE_KEY, &GateState::Denied).await?;
        self.store.remove(LAST_PASS_KEY).await
    }

    /// Record an outcome, see [`Self::mark_passed`] and [`Self::mark_denied`]
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn record(
        &mut self,
        clock: &dyn Clock,
        frequency: Frequency,
        state: GateState,
    ) -> Result<(), SessionStoreError> {
        match state {
            GateState::Passed => self.mark_passed(clock, frequency).await,
            GateState::Denied => self.mark_denied().await,
        }
    }

    /// Whether this session should be shown the gate under the given
    /// frequency
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn should_prompt(
        &mut self,
        clock: &dyn Clock,
        frequency: Frequency,
    ) -> Result<bool, SessionStoreError> {
        let passed = self.state().await?.is_some_and(GateState::is_passed);
        let marker = self.last_pass_marker().await?;
        Ok(should_prompt(
            frequency,
            passed,
            marker.as_deref(),
            clock.now(),
        ))
    }

    /// Forget everything the gate recorded in this session
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the underlying store fails
    pub async fn clear(&mut self) -> Result<(), SessionStoreError> {
        self.store.remove(STATE_KEY).await?;
        self.store.remove(TOKENS_KEY).await?;
        self.store.remove(LAST_PASS_KEY).await
    }

    /// Persist the changes and release the session
    ///
    /// # Errors
    ///
    /// Returns a [`SessionStoreError`] if the changes could not be persisted
    pub async fn save(self) -> Result<(), SessionStoreError> {
        self.store.save().await
    }
}
