// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Utility to build URLs

use crate::traits::Route;

/// Builds the URLs of the routes, as seen by the browser
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct UrlBuilder {
    prefix: String,
}

impl UrlBuilder {
    /// Create a new [`UrlBuilder`], for routes served under the given prefix
    #[must_use]
    pub fn new(prefix: Option<&str>) -> Self {
        let prefix = prefix.unwrap_or_default().trim_end_matches('/').to_owned();
        Self { prefix }
    }

    /// Path prefix under which the routes are served
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        if self.prefix.is_empty() {
            None
        } else {
            Some(&self.prefix)
        }
    }

    /// URL for the given route, relative to the root of the site
    #[must_use]
    pub fn relative_url_for<U>(&self, destination: &U) -> String
    where
        U: Route,
    {
        format!("{}{}", self.prefix, destination.path_and_query())
    }

    /// URL for the health check
    #[must_use]
    pub fn healthcheck(&self) -> String {
        self.relative_url_for(&crate::endpoints::Healthcheck)
    }

    /// URL issuing verification tokens
    #[must_use]
    pub fn token(&self) -> String {
        self.relative_url_for(&crate::endpoints::Token)
    }

    /// URL checking the answers of visitors
    #[must_use]
    pub fn verify(&self) -> String {
        self.relative_url_for(&crate::endpoints::Verify)
    }
}
