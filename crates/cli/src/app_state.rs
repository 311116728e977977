// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::convert::Infallible;

use avs_axum_utils::CookieManager;
use avs_data_model::{BoxClock, BoxRng, GateConfig, SystemClock};
use avs_handlers::SessionCookieOptions;
use avs_router::UrlBuilder;
use avs_storage::{BoxSessionStoreFactory, MemorySessionStoreFactory};
use axum::extract::{FromRef, FromRequestParts};
use rand::SeedableRng;

#[derive(Clone)]
pub struct AppState {
    pub session_store_factory: MemorySessionStoreFactory,
    pub cookie_manager: CookieManager,
    pub gate_config: GateConfig,
    pub session_cookie_options: SessionCookieOptions,
    pub url_builder: UrlBuilder,
}

impl FromRef<AppState> for BoxSessionStoreFactory {
    fn from_ref(input: &AppState) -> Self {
        input.session_store_factory.clone().boxed()
    }
}

impl FromRef<AppState> for CookieManager {
    fn from_ref(input: &AppState) -> Self {
        input.cookie_manager.clone()
    }
}

impl FromRef<AppState> for GateConfig {
    fn from_ref(input: &AppState) -> Self {
        input.gate_config.clone()
    }
}

impl FromRef<AppState> for SessionCookieOptions {
    fn from_ref(input: &AppState) -> Self {
        input.session_cookie_options
    }
}

impl FromRef<AppState> for UrlBuilder {
    fn from_ref(input: &AppState) -> Self {
        input.url_builder.clone()
    }
}

impl FromRequestParts<AppState> for BoxClock {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let clock = SystemClock::default();
        Ok(Box::new(clock))
    }
}

impl FromRequestParts<AppState> for BoxRng {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // This rng is used to source the local rng
        #[allow(clippy::disallowed_methods)]
        let rng = rand::thread_rng();

        let rng = rand_chacha::ChaChaRng::from_rng(rng).expect("Failed to seed RNG");
        Ok(Box::new(rng))
    }
}
