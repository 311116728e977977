// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{
    ConfigurationSection,
    util::{ConfigError, field_error},
};

fn default_ttl() -> Duration {
    Duration::days(30)
}

fn is_default_ttl(value: &Duration) -> bool {
    *value == default_ttl()
}

const fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_default_true(value: &bool) -> bool {
    *value == default_true()
}

/// Configuration of the visitor sessions
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// Time in seconds after which an idle session is forgotten. Defaults to
    /// 30 days.
    #[schemars(with = "u64", range(min = 60))]
    #[serde(default = "default_ttl", skip_serializing_if = "is_default_ttl")]
    #[serde_as(as = "serde_with::DurationSeconds<i64>")]
    pub ttl: Duration,

    /// Whether the session cookie outlives the browser session. Defaults to
    /// `true`.
    #[serde(default = "default_true", skip_serializing_if = "is_default_true")]
    pub persistent_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            persistent_cookie: default_true(),
        }
    }
}

impl SessionConfig {
    pub(crate) fn is_default(&self) -> bool {
        is_default_ttl(&self.ttl) && is_default_true(&self.persistent_cookie)
    }
}

impl ConfigurationSection for SessionConfig {
    const PATH: Option<&'static str> = Some("session");

    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        if self.ttl < Duration::minutes(1) {
            return Err(field_error::<Self>(
                figment,
                "ttl",
                "The session TTL must be at least 60 seconds",
            )
            .into());
        }

        Ok(())
    }
}
