// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    ConfigurationSection,
    util::{ConfigError, field_error},
};

const DEFAULT_PORT: u16 = 8080;

fn default_listen() -> SocketAddr {
    SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), DEFAULT_PORT)
}

fn default_public_base() -> Url {
    "http://[::]:8080/".parse().unwrap()
}

/// Configuration of the HTTP server
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HttpConfig {
    /// Socket address to listen on. Defaults to `[::]:8080`.
    #[serde(default = "default_listen")]
    #[schemars(with = "String")]
    pub listen: SocketAddr,

    /// Public URL base from where the service is reachable. Used to scope the
    /// session cookie.
    #[serde(default = "default_public_base")]
    pub public_base: Url,

    /// Path prefix under which all the routes are served, for example
    /// `/age-gate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_base: default_public_base(),
            prefix: None,
        }
    }
}

impl ConfigurationSection for HttpConfig {
    const PATH: Option<&'static str> = Some("http");

    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        if !self.public_base.path().ends_with('/') {
            return Err(field_error::<Self>(
                figment,
                "public_base",
                "The public base URL must end with a slash",
            )
            .into());
        }

        let invalid_prefix = self
            .prefix
            .as_deref()
            .is_some_and(|prefix| !prefix.starts_with('/') || prefix.ends_with('/'));
        if invalid_prefix {
            return Err(field_error::<Self>(
                figment,
                "prefix",
                "The prefix must start with a slash and not end with one",
            )
            .into());
        }

        Ok(())
    }
}
