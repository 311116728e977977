// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Matches a canonical `YYYY-MM-DD` date, accepted regardless of the
/// configured field ordering
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").unwrap());

/// Earliest birth year accepted from free-form input
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// Latest birth year accepted from free-form input
pub const MAX_BIRTH_YEAR: i32 = 2100;

/// Field ordering of a free-form date of birth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `MM/DD/YYYY`
    #[default]
    Mdy,

    /// `DD/MM/YYYY`
    Dmy,
}

impl DateFormat {
    /// The placeholder shown to visitors for this ordering
    #[must_use]
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Mdy => "MM/DD/YYYY",
            Self::Dmy => "DD/MM/YYYY",
        }
    }
}

/// Failed to normalize a date of birth
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DobError {
    /// The input doesn't have exactly eight digits
    #[error("date of birth must contain exactly 8 digits")]
    InvalidFormat,

    /// The digits don't form a real calendar date in the accepted range
    #[error("date of birth is not a valid calendar date")]
    InvalidDate,
}

/// Normalize a date of birth typed by a visitor into a calendar date.
///
/// Accepts, for the `mdy` ordering, `09/23/1980`, `09-23-1980` or `09231980`;
/// for the `dmy` ordering, `23/09/1980`, `23.09.1980` or `23091980`. Any
/// non-digit character is ignored, so separators can be mixed freely.
///
/// A canonical `1980-09-23` is always accepted, whatever the ordering. Its
/// calendar is validated, but not the birth year range.
///
/// # Errors
///
/// Returns [`DobError::InvalidFormat`] if the input doesn't hold exactly eight
/// digits, and [`DobError::InvalidDate`] if those digits don't name a real
/// date between [`MIN_BIRTH_YEAR`] and [`MAX_BIRTH_YEAR`].
pub fn normalize_dob(raw: &str, format: DateFormat) -> Result<NaiveDate, DobError> {
    let raw = raw.trim();

    if let Some(captures) = ISO_DATE.captures(raw) {
        let year: i32 = captures[1].parse().map_err(|_| DobError::InvalidDate)?;
        let month: u32 = captures[2].parse().map_err(|_| DobError::InvalidDate)?;
        let day: u32 = captures[3].parse().map_err(|_| DobError::InvalidDate)?;
        if year < 1 {
            return Err(DobError::InvalidDate);
        }

        return NaiveDate::from_ymd_opt(year, month, day).ok_or(DobError::InvalidDate);
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 8 {
        return Err(DobError::InvalidFormat);
    }

    // All characters are ASCII digits, so slicing by byte offsets is safe
    let (first, second, year) = (&digits[0..2], &digits[2..4], &digits[4..8]);
    let (month, day) = match format {
        DateFormat::Mdy => (first, second),
        DateFormat::Dmy => (second, first),
    };

    let month: u32 = month.parse().map_err(|_| DobError::InvalidDate)?;
    let day: u32 = day.parse().map_err(|_| DobError::InvalidDate)?;
    let year: i32 = year.parse().map_err(|_| DobError::InvalidDate)?;

    if !(1..=12).contains(&month)
        || !(1..=31).contains(&day)
        || !(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&year)
    {
        return Err(DobError::InvalidDate);
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or(DobError::InvalidDate)
}
