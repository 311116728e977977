// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How often a visitor who passed the gate has to verify again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
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
}

impl Frequency {
    /// The name of this frequency, as used in the configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Session => "session",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Always => "always",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The period in which a session last passed the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMarker {
    /// A calendar day, formatted as `YYYY-MM-DD`
    Day(NaiveDate),

    /// An ISO week, formatted as `YYYY-WW` using the ISO week-numbering year
    Week {
        /// The ISO week-numbering year
        year: i32,
        /// The week number, from 1 to 53
        week: u32,
    },
}

impl PassMarker {
    /// The marker to record for a pass happening at `now`.
    ///
    /// Returns `None` for frequencies which don't need a time-bound marker.
    #[must_use]
    pub fn current(frequency: Frequency, now: DateTime<Utc>) -> Option<Self> {
        match frequency {
            Frequency::Daily => Some(Self::Day(now.date_naive())),
            Frequency::Weekly => {
                let week = now.iso_week();
                Some(Self::Week {
                    year: week.year(),
                    week: week.week(),
                })
            }
            Frequency::Never | Frequency::Session | Frequency::Always => None,
        }
    }
}

impl fmt::Display for PassMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Week { year, week } => write!(f, "{year:04}-{week:02}"),
        }
    }
}

/// The pass marker could not be parsed
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid pass marker")]
pub struct InvalidPassMarker;

impl FromStr for PassMarker {
    type Err = InvalidPassMarker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.len() {
            10 => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Self::Day)
                .map_err(|_| InvalidPassMarker),
            7 => {
                let (year, week) = s.split_once('-').ok_or(InvalidPassMarker)?;
                let year = year.parse().map_err(|_| InvalidPassMarker)?;
                let week = week.parse().map_err(|_| InvalidPassMarker)?;
                if !(1..=53).contains(&week) {
                    return Err(InvalidPassMarker);
                }
                Ok(Self::Week { year, week })
            }
            _ => Err(InvalidPassMarker),
        }
    }
}

/// Decide whether the gate should be shown to a visitor.
///
/// `passed_this_session` tells whether the visitor's current session is in
/// the passed state, `last_pass_marker` is the marker recorded when it last
/// passed, if any.
#[must_use]
pub fn should_prompt(
    frequency: Frequency,
    passed_this_session: bool,
    last_pass_marker: Option<&str>,
    now: DateTime<Utc>,
) -> bool {
    match frequency {
        Frequency::Never => false,
        Frequency::Always => true,
        Frequency::Session => !passed_this_session,
        Frequency::Daily | Frequency::Weekly => {
            let Some(current) = PassMarker::current(frequency, now) else {
                return true;
            };

            let Some(last) = last_pass_marker else {
                return true;
            };

            last.parse::<PassMarker>().ok() != Some(current)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_marker_format() {
        let now = at(2024, 6, 1);
        assert_eq!(
            PassMarker::current(Frequency::Daily, now).unwrap().to_string(),
            "2024-06-01"
        );
        assert_eq!(
            PassMarker::current(Frequency::Weekly, now)
                .unwrap()
                .to_string(),
            "2024-22"
        );
        assert_eq!(PassMarker::current(Frequency::Session, now), None);
        assert_eq!(PassMarker::current(Frequency::Never, now), None);
        assert_eq!(PassMarker::current(Frequency::Always, now), None);
    }

    #[test]
    fn test_weekly_marker_uses_iso_year() {
        // The 30th of December 2024 is in the first week of 2025
        assert_eq!(
            PassMarker::current(Frequency::Weekly, at(2024, 12, 30))
                .unwrap()
                .to_string(),
            "2025-01"
        );

        // The 1st of January 2021 is in the last week of 2020
        assert_eq!(
            PassMarker::current(Frequency::Weekly, at(2021, 1, 1))
                .unwrap()
                .to_string(),
            "2020-53"
        );
    }

    #[test]
    fn test_marker_parse() {
        assert_eq!(
            "2024-06-01".parse(),
            Ok(PassMarker::Day(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()))
        );
        assert_eq!(
            "2024-22".parse(),
            Ok(PassMarker::Week {
                year: 2024,
                week: 22
            })
        );
        assert_eq!("2024-54".parse::<PassMarker>(), Err(InvalidPassMarker));
        assert_eq!("2024-02-30".parse::<PassMarker>(), Err(InvalidPassMarker));
        assert_eq!("yesterday".parse::<PassMarker>(), Err(InvalidPassMarker));
    }

    #[test]
    fn test_never_and_always() {
        let now = at(2024, 6, 1);
        assert!(!should_prompt(Frequency::Never, false, None, now));
        assert!(!should_prompt(Frequency::Never, true, Some("2024-06-01"), now));
        assert!(should_prompt(Frequency::Always, false, None, now));
        assert!(should_prompt(Frequency::Always, true, Some("2024-06-01"), now));
    }

    #[test]
    fn test_session() {
        let now = at(2024, 6, 1);
        assert!(should_prompt(Frequency::Session, false, None, now));
        assert!(!should_prompt(Frequency::Session, true, None, now));
        // No time component
        let much_later = now + Duration::try_days(400).unwrap();
        assert!(!should_prompt(Frequency::Session, true, None, much_later));
    }

    #[test]
    fn test_daily() {
        let now = at(2024, 6, 1);
        assert!(!should_prompt(Frequency::Daily, true, Some("2024-06-01"), now));
        assert!(should_prompt(Frequency::Daily, true, Some("2024-05-31"), now));
        assert!(should_prompt(Frequency::Daily, true, None, now));
        assert!(should_prompt(Frequency::Daily, true, Some("garbage"), now));
        // A weekly marker doesn't satisfy the daily frequency
        assert!(should_prompt(Frequency::Daily, true, Some("2024-22"), now));
    }

    #[test]
    fn test_weekly() {
        // Saturday 1st of June 2024 is in week 22, which started on Monday 27th of May
        let now = at(2024, 6, 1);
        assert!(!should_prompt(Frequency::Weekly, true, Some("2024-22"), now));
        assert!(should_prompt(Frequency::Weekly, true, Some("2024-21"), now));
        assert!(should_prompt(Frequency::Weekly, true, Some("2023-22"), now));
        assert!(should_prompt(Frequency::Weekly, true, None, now));

        let next_monday = at(2024, 6, 3);
        assert!(should_prompt(
            Frequency::Weekly,
            true,
            Some("2024-22"),
            next_monday
        ));
    }
}
