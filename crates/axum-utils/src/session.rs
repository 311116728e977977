// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::cookies::{CookieEncodeError, CookieJar};

/// Name of the cookie holding the visitor session
pub const SESSION_COOKIE_NAME: &str = "avs-session";

/// An encrypted cookie to save the visitor session ID
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    current: Option<Ulid>,
}

impl SessionInfo {
    /// Forge the cookie from a session ID
    #[must_use]
    pub fn from_session_id(id: Ulid) -> Self {
        Self { current: Some(id) }
    }

    /// Get the current session ID, if any
    #[must_use]
    pub fn current_session_id(&self) -> Option<Ulid> {
        self.current
    }
}

pub trait SessionInfoExt: Sized {
    /// Read the session cookie, falling back to an empty one if it is absent
    /// or unreadable
    #[must_use]
    fn session_info(&self) -> SessionInfo;

    /// Write the session cookie
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie could not be encoded
    fn update_session_info(
        self,
        info: &SessionInfo,
        permanent: bool,
    ) -> Result<Self, CookieEncodeError>;
}

impl SessionInfoExt for CookieJar {
    fn session_info(&self) -> SessionInfo {
        match self.load(SESSION_COOKIE_NAME) {
            Ok(Some(info)) => info,
            Ok(None) => SessionInfo::default(),
            Err(e) => {
                tracing::warn!(
                    error = &e as &dyn std::error::Error,
                    "Failed to load session cookie"
                );
                SessionInfo::default()
            }
        }
    }

    fn update_session_info(
        self,
        info: &SessionInfo,
        permanent: bool,
    ) -> Result<Self, CookieEncodeError> {
        self.save(SESSION_COOKIE_NAME, info, permanent)
    }
}
