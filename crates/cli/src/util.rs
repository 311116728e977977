// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use anyhow::Context;
use avs_axum_utils::CookieManager;
use avs_config::{
    GateConfig as GateConfigSection, GateDateFormat, GateFrequency, GatePathMode,
    GateStringsConfig, GateVerificationMethod, HttpConfig, SecretsConfig, SessionConfig,
};
use avs_data_model::{
    DateFormat, Frequency, GateConfig, GateStrings, PathMode, PathTargeting, Redirects,
    VerificationMethod,
};
use avs_handlers::SessionCookieOptions;
use avs_router::UrlBuilder;
use avs_storage::MemorySessionStoreFactory;
use tracing::warn;

fn date_format_from_config(date_format: GateDateFormat) -> DateFormat {
    match date_format {
        GateDateFormat::Mdy => DateFormat::Mdy,
        GateDateFormat::Dmy => DateFormat::Dmy,
        GateDateFormat::Unknown => {
            warn!("Unknown `gate.date_format` value, falling back to `mdy`");
            DateFormat::Mdy
        }
    }
}

fn frequency_from_config(frequency: GateFrequency) -> Frequency {
    match frequency {
        GateFrequency::Never => Frequency::Never,
        GateFrequency::Session => Frequency::Session,
        GateFrequency::Daily => Frequency::Daily,
        GateFrequency::Weekly => Frequency::Weekly,
        GateFrequency::Always => Frequency::Always,
        GateFrequency::Unknown => {
            warn!("Unknown `gate.frequency` value, falling back to `always`");
            Frequency::Always
        }
    }
}

fn redirect_from_config(target: Option<&str>) -> Option<String> {
    target
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(ToOwned::to_owned)
}

fn strings_from_config(config: &GateStringsConfig) -> GateStrings {
    let defaults = GateStrings::default();
    let pick = |value: &Option<String>, default: String| value.clone().unwrap_or(default);

    GateStrings {
        modal_title: pick(&config.modal_title, defaults.modal_title),
        message_confirm: pick(&config.message_confirm, defaults.message_confirm),
        confirm_button: pick(&config.confirm_button, defaults.confirm_button),
        deny_button: pick(&config.deny_button, defaults.deny_button),
        denied_message: pick(&config.denied_message, defaults.denied_message),
        question_text: pick(&config.question_text, defaults.question_text),
        yes_button: pick(&config.yes_button, defaults.yes_button),
        no_button: pick(&config.no_button, defaults.no_button),
        dob_instruction: pick(&config.dob_instruction, defaults.dob_instruction),
        dob_verify_button: pick(&config.dob_verify_button, defaults.dob_verify_button),
        dob_invalid_message: pick(&config.dob_invalid_message, defaults.dob_invalid_message),
    }
}

/// Build the gate settings used by the request handlers out of the `gate`
/// configuration section.
///
/// This logs warnings about values which are ignored.
///
/// # Errors
///
/// Returns an error if the path patterns can't be compiled
pub fn gate_config_from_config(config: &GateConfigSection) -> anyhow::Result<GateConfig> {
    let method = match config.method {
        GateVerificationMethod::Question => VerificationMethod::Question,
        GateVerificationMethod::Dob => VerificationMethod::Dob,
    };

    let mode = match config.paths.mode {
        GatePathMode::Include => PathMode::Include,
        GatePathMode::Exclude => PathMode::Exclude,
    };

    let targeting = PathTargeting::new(mode, &config.paths.patterns)
        .context("could not compile the `gate.paths.patterns`")?;

    if targeting.mode() == PathMode::Include && config.paths.patterns.is_empty() {
        warn!("`gate.paths.mode` is `include` but no pattern is set, the gate will never show");
    }

    Ok(GateConfig {
        enabled: config.enabled,
        method,
        min_age: config.min_age,
        date_format: date_format_from_config(config.date_format),
        frequency: frequency_from_config(config.frequency),
        redirects: Redirects {
            success: redirect_from_config(config.redirects.success.as_deref()),
            failure: redirect_from_config(config.redirects.failure.as_deref()),
        },
        targeting,
        strings: strings_from_config(&config.strings),
    })
}

#[must_use]
pub fn session_store_factory_from_config(config: &SessionConfig) -> MemorySessionStoreFactory {
    MemorySessionStoreFactory::new(config.ttl)
}

#[must_use]
pub fn session_cookie_options_from_config(config: &SessionConfig) -> SessionCookieOptions {
    SessionCookieOptions {
        permanent: config.persistent_cookie,
    }
}

#[must_use]
pub fn cookie_manager_from_config(http: &HttpConfig, secrets: &SecretsConfig) -> CookieManager {
    CookieManager::derive_from(http.public_base.clone(), &secrets.encryption)
}

#[must_use]
pub fn url_builder_from_config(config: &HttpConfig) -> UrlBuilder {
    UrlBuilder::new(config.prefix.as_deref())
}

#[cfg(test)]
mod tests {
    use avs_config::{GatePathsConfig, GateRedirectsConfig};

    use super::*;

    #[test]
    fn test_defaults() {
        let config = gate_config_from_config(&GateConfigSection::default()).unwrap();

        assert!(config.enabled);
        assert_eq!(config.method, VerificationMethod::Question);
        assert_eq!(config.min_age, 18);
        assert_eq!(config.date_format, DateFormat::Mdy);
        assert_eq!(config.frequency, Frequency::Always);
        assert_eq!(config.redirects, Redirects::default());
        assert_eq!(config.strings, GateStrings::default());
        assert!(config.targeting.applies_to("/anything"));
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let config = gate_config_from_config(&GateConfigSection {
            date_format: GateDateFormat::Unknown,
            frequency: GateFrequency::Unknown,
            ..GateConfigSection::default()
        })
        .unwrap();

        assert_eq!(config.date_format, DateFormat::Mdy);
        assert_eq!(config.frequency, Frequency::Always);
    }

    #[test]
    fn test_overrides() {
        let config = gate_config_from_config(&GateConfigSection {
            method: GateVerificationMethod::Dob,
            date_format: GateDateFormat::Dmy,
            frequency: GateFrequency::Weekly,
            redirects: GateRedirectsConfig {
                success: Some("/welcome".to_owned()),
                failure: Some("https://example.org/".to_owned()),
            },
            paths: GatePathsConfig {
                mode: GatePathMode::Include,
                patterns: vec!["<front>".to_owned(), "shop/*".to_owned()],
            },
            strings: GateStringsConfig {
                yes_button: Some("Oui".to_owned()),
                ..GateStringsConfig::default()
            },
            ..GateConfigSection::default()
        })
        .unwrap();

        assert_eq!(config.method, VerificationMethod::Dob);
        assert_eq!(config.date_format, DateFormat::Dmy);
        assert_eq!(config.frequency, Frequency::Weekly);
        assert_eq!(config.redirects.success.as_deref(), Some("/welcome"));
        assert_eq!(
            config.redirects.failure.as_deref(),
            Some("https://example.org/")
        );
        assert!(config.targeting.applies_to("/"));
        assert!(config.targeting.applies_to("/shop/wine"));
        assert!(!config.targeting.applies_to("/about"));
        assert_eq!(config.strings.yes_button, "Oui");
        assert_eq!(config.strings.no_button, "No");
    }

    #[test]
    fn test_redirects_are_trimmed() {
        let config = gate_config_from_config(&GateConfigSection {
            redirects: GateRedirectsConfig {
                success: Some("  HTTPS://example.org/welcome ".to_owned()),
                failure: Some("   ".to_owned()),
            },
            ..GateConfigSection::default()
        })
        .unwrap();

        assert_eq!(
            config.redirects.success.as_deref(),
            Some("HTTPS://example.org/welcome")
        );
        assert_eq!(config.redirects.failure, None);
    }
}
