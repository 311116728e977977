// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod gate;
mod http;
mod secrets;
mod session;

pub use self::{
    gate::{
        DateFormat as GateDateFormat, Frequency as GateFrequency, GateConfig,
        PathMode as GatePathMode, PathsConfig as GatePathsConfig,
        RedirectsConfig as GateRedirectsConfig, StringsConfig as GateStringsConfig,
        VerificationMethod as GateVerificationMethod,
    },
    http::HttpConfig,
    secrets::SecretsConfig,
    session::SessionConfig,
};
use crate::util::{ConfigError, ConfigurationSection};

/// Application configuration root
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RootConfig {
    /// Configuration of the HTTP server
    #[serde(default)]
    pub http: HttpConfig,

    /// Configuration of the age gate
    #[serde(default)]
    pub gate: GateConfig,

    /// Configuration of the visitor sessions
    #[serde(default, skip_serializing_if = "SessionConfig::is_default")]
    pub session: SessionConfig,

    /// Application secrets
    pub secrets: SecretsConfig,
}

impl ConfigurationSection for RootConfig {
    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        self.http.validate(figment)?;
        self.gate.validate(figment)?;
        self.session.validate(figment)?;
        self.secrets.validate(figment)?;

        Ok(())
    }
}

impl RootConfig {
    /// Generate a new configuration with random secrets
    #[must_use]
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            http: HttpConfig::default(),
            gate: GateConfig::default(),
            session: SessionConfig::default(),
            secrets: SecretsConfig::generate(rng),
        }
    }

    /// Configuration used in tests
    #[must_use]
    pub fn test() -> Self {
        Self {
            http: HttpConfig::default(),
            gate: GateConfig::default(),
            session: SessionConfig::default(),
            secrets: SecretsConfig::test(),
        }
    }
}
