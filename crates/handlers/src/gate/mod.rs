// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Endpoints called by the age gate modal

use serde::Serialize;

pub mod settings;
pub mod token;
pub mod verify;

/// The only message shown to clients on internal failures
pub(crate) const SERVER_ERROR: &str = "server error";

/// The body of failed responses
#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    ok: bool,
    error: String,
}

impl ErrorResponse {
    /// A response carrying the given message
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: message.into(),
        }
    }

    /// A response carrying the message of the given error
    pub(crate) fn from_error(error: &impl std::error::Error) -> Self {
        Self::new(error.to_string())
    }

    /// The response sent on internal failures
    pub(crate) fn server_error() -> Self {
        Self::new(SERVER_ERROR)
    }
}
