// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

#![deny(clippy::future_not_send)]
#![allow(
    // Some axum handlers need that
    clippy::unused_async,
    clippy::module_name_repetitions,
)]

use avs_axum_utils::CookieManager;
use avs_data_model::{BoxClock, BoxRng, GateConfig};
use avs_router::{Route, UrlBuilder};
use avs_storage::BoxSessionStoreFactory;
use axum::{
    Router,
    extract::{FromRef, FromRequestParts},
    routing::{get, post},
};

mod gate;
mod health;
mod session;
#[cfg(test)]
mod test_utils;

pub use self::session::SessionCookieOptions;

/// Implement `From<E>` for `RouteError`, for "internal server error" kind of
/// errors.
#[macro_export]
macro_rules! impl_from_error_for_route {
    ($route_error:ty : $error:ty) => {
        impl From<$error> for $route_error {
            fn from(e: $error) -> Self {
                Self::Internal(Box::new(e))
            }
        }
    };
    ($error:ty) => {
        $crate::impl_from_error_for_route!(self::RouteError: $error);
    };
}

pub fn healthcheck_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(avs_router::Healthcheck::route(), get(self::health::get))
}

pub fn gate_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    BoxSessionStoreFactory: FromRef<S>,
    CookieManager: FromRef<S>,
    GateConfig: FromRef<S>,
    SessionCookieOptions: FromRef<S>,
    UrlBuilder: FromRef<S>,
    BoxClock: FromRequestParts<S>,
    BoxRng: FromRequestParts<S>,
{
    Router::new()
        .route(avs_router::Token::route(), get(self::gate::token::get))
        .route(avs_router::Verify::route(), post(self::gate::verify::post))
        .route(
            avs_router::GateSettings::route(),
            get(self::gate::settings::get),
        )
}
