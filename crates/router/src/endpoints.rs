// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use serde::{Deserialize, Serialize};

pub use crate::traits::*;

/// `GET /health`
#[derive(Default, Debug, Clone)]
pub struct Healthcheck;

impl SimpleRoute for Healthcheck {
    const PATH: &'static str = "/health";
}

/// `GET /token`
#[derive(Default, Debug, Clone)]
pub struct Token;

impl SimpleRoute for Token {
    const PATH: &'static str = "/token";
}

/// `POST /verify`
#[derive(Default, Debug, Clone)]
pub struct Verify;

impl SimpleRoute for Verify {
    const PATH: &'static str = "/verify";
}

/// `GET /settings`
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct GateSettings {
    /// Path of the page the visitor is on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl GateSettings {
    /// Settings for the page at the given path
    #[must_use]
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The path of the page, if any
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl Route for GateSettings {
    type Query = Self;

    fn route() -> &'static str {
        "/settings"
    }

    fn query(&self) -> Option<&Self::Query> {
        Some(self)
    }
}
