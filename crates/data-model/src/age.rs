// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use chrono::{Datelike, NaiveDate};

/// Compute the age in whole years of someone born on `dob`, as of `today`.
///
/// A birthday not yet reached this year doesn't count. Someone born on the
/// 29th of February turns one year older on the 1st of March in non-leap
/// years. Dates of birth in the future give an age of zero.
#[must_use]
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }

    u32::try_from(years).unwrap_or(0)
}
