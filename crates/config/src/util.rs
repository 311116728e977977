// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use figment::Figment;
use serde::de::DeserializeOwned;

/// Error returned when loading or validating a configuration section
pub type ConfigError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A part of the configuration which can be loaded on its own.
///
/// Sections which live under a key of the configuration file set
/// [`Self::PATH`].
pub trait ConfigurationSection: Sized + DeserializeOwned {
    /// Where this section lives relative to the root.
    const PATH: Option<&'static str> = None;

    /// Check the loaded values for problems the type system can't express
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    fn validate(&self, _figment: &Figment) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Load and validate this section.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is missing, could not be parsed, or is
    /// invalid
    fn extract(figment: &Figment) -> Result<Self, ConfigError> {
        let this: Self = match Self::PATH {
            Some(path) => figment.extract_inner(path)?,
            None => figment.extract()?,
        };

        this.validate(figment)?;
        Ok(this)
    }
}

/// Loading of sections which have sensible defaults
pub trait ConfigurationSectionExt: ConfigurationSection + Default {
    /// Load and validate this section, falling back to the default values if
    /// it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the section could not be parsed, or is invalid
    fn extract_or_default(figment: &Figment) -> Result<Self, ConfigError> {
        let this: Self = match Self::PATH {
            Some(path) if !figment.contains(path) => return Ok(Self::default()),
            Some(path) => figment.extract_inner(path)?,
            None => figment.extract()?,
        };

        this.validate(figment)?;
        Ok(this)
    }
}

impl<T: ConfigurationSection + Default> ConfigurationSectionExt for T {}

/// Build an error pointing at a field of the section `S`, annotated with
/// where the section was loaded from
pub(crate) fn field_error<S: ConfigurationSection>(
    figment: &Figment,
    field: &str,
    message: impl std::fmt::Display,
) -> figment::Error {
    let mut error = figment::Error::from(message.to_string());
    let mut path = Vec::new();
    if let Some(section) = S::PATH {
        error.metadata = figment.find_metadata(section).cloned();
        path.push(section.to_owned());
    }
    path.push(field.to_owned());
    error.path = path;
    error.profile = Some(figment::Profile::Default);
    error
}
