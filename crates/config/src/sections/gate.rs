// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    ConfigurationSection,
    util::{ConfigError, field_error},
};

const fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_default_true(value: &bool) -> bool {
    *value == default_true()
}

const fn default_min_age() -> u32 {
    18
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_default_min_age(value: &u32) -> bool {
    *value == default_min_age()
}

/// How visitors prove their age
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    /// Ask a Yes/No question
    #[default]
    Question,

    /// Ask for a date of birth
    Dob,
}

/// Field ordering of typed dates of birth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `MM/DD/YYYY`
    #[default]
    Mdy,

    /// `DD/MM/YYYY`
    Dmy,

    /// Any other value, treated as `mdy`
    #[serde(other)]
    #[schemars(skip)]
    Unknown,
}

/// How often a visitor who passed the gate has to verify again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// The gate is never shown
    Never,

    /// Once per session
    Session,

    /// Once per calendar day
    Daily,

    /// Once per ISO week
    Weekly,

    /// On every page load
    #[default]
    Always,

    /// Any other value, treated as `always`
    #[serde(other)]
    #[schemars(skip)]
    Unknown,
}

/// Whether the path patterns list the gated pages or the ungated ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Only the listed pages are gated
    Include,

    /// All pages except the listed ones are gated
    #[default]
    Exclude,
}

/// Where to send visitors once they answered the gate
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RedirectsConfig {
    /// Internal path (starting with `/`) or absolute URL to send visitors to
    /// after passing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,

    /// Internal path (starting with `/`) or absolute URL to send visitors to
    /// after being denied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RedirectsConfig {
    pub(crate) fn is_default(&self) -> bool {
        self.success.is_none() && self.failure.is_none()
    }
}

/// An empty target means no redirect. Surrounding whitespace is ignored and
/// the URL scheme is matched case-insensitively.
fn is_valid_redirect(target: &str) -> bool {
    let target = target.trim();
    let has_scheme = |scheme: &str| {
        target
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    };

    target.is_empty() || target.starts_with('/') || has_scheme("http://") || has_scheme("https://")
}

/// Which pages show the gate
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PathsConfig {
    /// Whether the patterns list the gated pages (`include`) or the pages
    /// without the gate (`exclude`). Defaults to `exclude`.
    #[serde(default)]
    pub mode: PathMode,

    /// Page paths, one per entry. `*` matches any run of characters and
    /// `<front>` matches the front page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl PathsConfig {
    pub(crate) fn is_default(&self) -> bool {
        self.mode == PathMode::default() && self.patterns.is_empty()
    }
}

/// Texts shown in the gate modal. Unset ones use English defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StringsConfig {
    /// Title of the modal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_title: Option<String>,

    /// Text shown above the buttons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_confirm: Option<String>,

    /// Label of the button to enter the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_button: Option<String>,

    /// Label of the button to leave the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_button: Option<String>,

    /// Text shown to denied visitors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denied_message: Option<String>,

    /// The Yes/No question. `[age]` is replaced by the minimum age.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_text: Option<String>,

    /// Label of the Yes button
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yes_button: Option<String>,

    /// Label of the No button
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_button: Option<String>,

    /// Text above the date of birth field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob_instruction: Option<String>,

    /// Label of the button submitting the date of birth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob_verify_button: Option<String>,

    /// Text shown when the date of birth can't be understood
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob_invalid_message: Option<String>,
}

impl StringsConfig {
    pub(crate) fn is_default(&self) -> bool {
        self.modal_title.is_none()
            && self.message_confirm.is_none()
            && self.confirm_button.is_none()
            && self.deny_button.is_none()
            && self.denied_message.is_none()
            && self.question_text.is_none()
            && self.yes_button.is_none()
            && self.no_button.is_none()
            && self.dob_instruction.is_none()
            && self.dob_verify_button.is_none()
            && self.dob_invalid_message.is_none()
    }
}

/// Configuration of the age gate
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GateConfig {
    /// Whether the gate is shown at all. Defaults to `true`.
    #[serde(default = "default_true", skip_serializing_if = "is_default_true")]
    pub enabled: bool,

    /// How visitors prove their age. Defaults to `question`.
    #[serde(default)]
    pub method: VerificationMethod,

    /// Minimum age in years to pass the gate. Defaults to 18.
    #[serde(default = "default_min_age", skip_serializing_if = "is_default_min_age")]
    pub min_age: u32,

    /// Field ordering of typed dates of birth, `mdy` or `dmy`. Defaults to
    /// `mdy`.
    #[serde(default)]
    pub date_format: DateFormat,

    /// How often visitors have to verify again. Defaults to `always`.
    #[serde(default)]
    pub frequency: Frequency,

    /// Where to send visitors once they answered
    #[serde(default, skip_serializing_if = "RedirectsConfig::is_default")]
    pub redirects: RedirectsConfig,

    /// Which pages show the gate
    #[serde(default, skip_serializing_if = "PathsConfig::is_default")]
    pub paths: PathsConfig,

    /// Texts shown in the modal
    #[serde(default, skip_serializing_if = "StringsConfig::is_default")]
    pub strings: StringsConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            method: VerificationMethod::default(),
            min_age: default_min_age(),
            date_format: DateFormat::default(),
            frequency: Frequency::default(),
            redirects: RedirectsConfig::default(),
            paths: PathsConfig::default(),
            strings: StringsConfig::default(),
        }
    }
}

impl ConfigurationSection for GateConfig {
    const PATH: Option<&'static str> = Some("gate");

    fn validate(&self, figment: &figment::Figment) -> Result<(), ConfigError> {
        let redirects = [
            ("redirects.success", &self.redirects.success),
            ("redirects.failure", &self.redirects.failure),
        ];

        for (field, target) in redirects {
            let Some(target) = target else { continue };

            if !is_valid_redirect(target) {
                return Err(field_error::<Self>(
                    figment,
                    field,
                    format!("Redirect target {target:?} must start with `/`, `http://` or `https://`"),
                )
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use figment::{
        Figment, Jail,
        providers::{Env, Format, Yaml},
    };

    use super::*;
    use crate::ConfigurationSectionExt;

    #[test]
    fn load_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    gate:
                      method: dob
                      min_age: 21
                      date_format: dmy
                      frequency: weekly
                      redirects:
                        success: /welcome
                      paths:
                        mode: include
                        patterns:
                          - <front>
                          - /shop/*
                      strings:
                        yes_button: Oui
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = GateConfig::extract(&figment).unwrap();

            assert!(config.enabled);
            assert_eq!(config.method, VerificationMethod::Dob);
            assert_eq!(config.min_age, 21);
            assert_eq!(config.date_format, DateFormat::Dmy);
            assert_eq!(config.frequency, Frequency::Weekly);
            assert_eq!(config.redirects.success.as_deref(), Some("/welcome"));
            assert_eq!(config.redirects.failure, None);
            assert_eq!(config.paths.mode, PathMode::Include);
            assert_eq!(config.paths.patterns, ["<front>", "/shop/*"]);
            assert_eq!(config.strings.yes_button.as_deref(), Some("Oui"));
            assert_eq!(config.strings.no_button, None);

            Ok(())
        });
    }

    #[test]
    fn load_defaults() {
        Jail::expect_with(|_jail| {
            let config = GateConfig::extract_or_default(&Figment::new()).unwrap();

            assert!(config.enabled);
            assert_eq!(config.method, VerificationMethod::Question);
            assert_eq!(config.min_age, 18);
            assert_eq!(config.date_format, DateFormat::Mdy);
            assert_eq!(config.frequency, Frequency::Always);
            assert!(config.redirects.is_default());
            assert!(config.paths.is_default());
            assert!(config.strings.is_default());

            Ok(())
        });
    }

    #[test]
    fn unknown_values_are_kept_apart() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    gate:
                      date_format: ymd
                      frequency: hourly
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = GateConfig::extract(&figment).unwrap();

            assert_eq!(config.date_format, DateFormat::Unknown);
            assert_eq!(config.frequency, Frequency::Unknown);

            Ok(())
        });
    }

    #[test]
    fn load_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("AVS_GATE__MIN_AGE", "21");
            jail.set_env("AVS_GATE__FREQUENCY", "daily");

            let figment = Figment::new().merge(Env::prefixed("AVS_").split("__"));
            let config = GateConfig::extract(&figment).unwrap();

            assert_eq!(config.min_age, 21);
            assert_eq!(config.frequency, Frequency::Daily);

            Ok(())
        });
    }

    #[test]
    fn reject_invalid_redirect() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r"
                    gate:
                      redirects:
                        failure: javascript:alert(1)
                ",
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let error = GateConfig::extract(&figment).unwrap_err();
            assert!(error.to_string().contains("javascript:alert(1)"));

            Ok(())
        });
    }

    #[test]
    fn accept_loose_redirects() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
                    gate:
                      redirects:
                        success: "  HTTPS://example.org/welcome "
                        failure: ""
                "#,
            )?;

            let figment = Figment::new().merge(Yaml::file("config.yaml"));
            let config = GateConfig::extract(&figment).unwrap();
            assert_eq!(
                config.redirects.success.as_deref(),
                Some("  HTTPS://example.org/welcome ")
            );
            assert_eq!(config.redirects.failure.as_deref(), Some(""));

            Ok(())
        });
    }

    #[test]
    fn redirect_targets() {
        assert!(is_valid_redirect("/welcome"));
        assert!(is_valid_redirect(" /welcome"));
        assert!(is_valid_redirect("Http://example.org/"));
        assert!(is_valid_redirect("HTTPS://example.org/"));
        assert!(is_valid_redirect("   "));
        assert!(!is_valid_redirect("ftp://example.org/"));
        assert!(!is_valid_redirect("welcome"));
        assert!(!is_valid_redirect("http"));
    }
}
