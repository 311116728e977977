// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Private (encrypted) cookie jar, integrating with axum

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use http::{HeaderMap, request::Parts};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use url::Url;

/// Failed to store a payload in a cookie
#[derive(Debug, Error)]
#[error("could not encode cookie")]
pub struct CookieEncodeError(#[from] serde_json::Error);

/// Failed to read a payload from a cookie
#[derive(Debug, Error)]
#[error("could not decode cookie")]
pub struct CookieDecodeError(#[from] serde_json::Error);

/// Manages cookie options and the key used to encrypt cookies
#[derive(Clone)]
pub struct CookieManager {
    options: CookieOption,
    key: Key,
}

impl CookieManager {
    /// Create a new [`CookieManager`], scoping cookies to the given base URL
    #[must_use]
    pub const fn new(base_url: Url, key: Key) -> Self {
        let options = CookieOption::new(base_url);
        Self { options, key }
    }

    /// Create a new [`CookieManager`] with a key derived from the given secret
    ///
    /// # Panics
    ///
    /// Panics if the secret is shorter than 32 bytes
    #[must_use]
    pub fn derive_from(base_url: Url, secret: &[u8]) -> Self {
        let key = Key::derive_from(secret);
        Self::new(base_url, key)
    }

    /// An empty cookie jar
    #[must_use]
    pub fn cookie_jar(&self) -> CookieJar {
        CookieJar {
            inner: PrivateCookieJar::new(self.key.clone()),
            options: self.options.clone(),
        }
    }

    /// The cookie jar of a request
    #[must_use]
    pub fn cookie_jar_from_headers(&self, headers: &HeaderMap) -> CookieJar {
        CookieJar {
            inner: PrivateCookieJar::from_headers(headers, self.key.clone()),
            options: self.options.clone(),
        }
    }
}

impl<S> FromRequestParts<S> for CookieJar
where
    CookieManager: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookie_manager = CookieManager::from_ref(state);
        Ok(cookie_manager.cookie_jar_from_headers(&parts.headers))
    }
}

#[derive(Debug, Clone)]
struct CookieOption {
    base_url: Url,
}

impl CookieOption {
    const fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    fn path(&self) -> &str {
        self.base_url.path()
    }

    fn apply<'a>(&self, mut cookie: Cookie<'a>) -> Cookie<'a> {
        cookie.set_http_only(true);
        cookie.set_secure(self.secure());
        cookie.set_path(self.path().to_owned());
        cookie.set_same_site(SameSite::Lax);
        cookie
    }
}

/// A cookie jar which encrypts its cookies, with payloads stored as JSON
pub struct CookieJar {
    inner: PrivateCookieJar<Key>,
    options: CookieOption,
}

impl CookieJar {
    /// Save the given payload in a cookie.
    ///
    /// Permanent cookies outlive the browser session.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload could not be serialized
    pub fn save<T: Serialize>(
        mut self,
        key: &str,
        payload: &T,
        permanent: bool,
    ) -> Result<Self, CookieEncodeError> {
        let serialized = serde_json::to_string(payload)?;

        let cookie = Cookie::new(key.to_owned(), serialized);
        let mut cookie = self.options.apply(cookie);

        if permanent {
            cookie.make_permanent();
        }

        self.inner = self.inner.add(cookie);

        Ok(self)
    }

    /// Load and deserialize the payload of a cookie.
    ///
    /// Returns `None` if the cookie is absent, or can't be decrypted with the
    /// current key.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie content could not be deserialized
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CookieDecodeError> {
        let Some(cookie) = self.inner.get(key) else {
            return Ok(None);
        };

        let decoded = serde_json::from_str(cookie.value())?;
        Ok(Some(decoded))
    }
}

impl IntoResponseParts for CookieJar {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.inner.into_response_parts(res)
    }
}
