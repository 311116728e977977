// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![allow(clippy::module_name_repetitions)]

mod age;
pub mod clock;
mod dob;
mod frequency;
mod gate;
mod targeting;
pub(crate) mod utils;

pub use ulid::Ulid;

pub use self::{
    age::age_on,
    clock::{Clock, SystemClock},
    dob::{DateFormat, DobError, MAX_BIRTH_YEAR, MIN_BIRTH_YEAR, normalize_dob},
    frequency::{Frequency, InvalidPassMarker, PassMarker, should_prompt},
    gate::{GateConfig, GateState, GateStrings, Redirects, VerificationMethod},
    targeting::{FRONT_PAGE, PathMode, PathTargeting},
    utils::{BoxClock, BoxRng},
};
