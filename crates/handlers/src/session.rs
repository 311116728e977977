// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Utilities to find the visitor session from its cookie

use avs_axum_utils::{
    SessionInfo, SessionInfoExt,
    cookies::{CookieEncodeError, CookieJar},
};
use avs_data_model::Clock;
use avs_storage::{BoxSessionStoreFactory, GateSession, SessionStoreError};
use rand::RngCore;
use thiserror::Error;

/// How the session cookie is sent to visitors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCookieOptions {
    /// Whether the cookie outlives the browser session
    pub permanent: bool,
}

impl Default for SessionCookieOptions {
    fn default() -> Self {
        Self { permanent: true }
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
pub enum SessionLoadError {
    Store(#[from] SessionStoreError),
    Cookie(#[from] CookieEncodeError),
}

/// Open the session named by the session cookie, if it is still alive
pub async fn open_session(
    factory: &BoxSessionStoreFactory,
    clock: &dyn Clock,
    cookie_jar: &CookieJar,
) -> Result<Option<GateSession>, SessionStoreError> {
    let Some(session_id) = cookie_jar.session_info().current_session_id() else {
        return Ok(None);
    };

    let store = factory.open(clock, session_id).await?;
    Ok(store.map(GateSession::new))
}

/// Open the session named by the session cookie, or start a new one if there
/// is none, and point the cookie to it
pub async fn load_or_start_session(
    factory: &BoxSessionStoreFactory,
    clock: &dyn Clock,
    rng: &mut (dyn RngCore + Send),
    cookie_jar: CookieJar,
    options: SessionCookieOptions,
) -> Result<(GateSession, CookieJar), SessionLoadError> {
    let session = match open_session(factory, clock, &cookie_jar).await? {
        Some(session) => session,
        None => {
            let store = factory.start(rng, clock).await?;
            let session = GateSession::new(store);
            tracing::debug!(session.id = %session.id(), "Started a new visitor session");
            session
        }
    };

    // Always refresh the cookie, so that a permanent one keeps living as long
    // as the visitor comes back
    let session_info = SessionInfo::from_session_id(session.id());
    let cookie_jar = cookie_jar.update_session_info(&session_info, options.permanent)?;

    Ok((session, cookie_jar))
}
