// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(clippy::future_not_send)]
#![allow(clippy::module_name_repetitions)]

pub mod cookies;
pub mod no_store;
pub mod session;

pub use axum;

pub use self::{
    cookies::{CookieJar, CookieManager},
    no_store::NoStore,
    session::{SessionInfo, SessionInfoExt},
};
