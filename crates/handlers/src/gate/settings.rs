// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use avs_axum_utils::{NoStore, cookies::CookieJar};
use avs_data_model::{
    BoxClock, Clock, DateFormat, Frequency, GateConfig, GateStrings, Redirects,
    VerificationMethod, should_prompt,
};
use avs_router::{GateSettings, UrlBuilder};
use avs_storage::BoxSessionStoreFactory;
use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

use super::ErrorResponse;
use crate::{impl_from_error_for_route, session::open_session};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl_from_error_for_route!(avs_storage::SessionStoreError);

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        tracing::error!(
            error = &self as &dyn std::error::Error,
            "Failed to load the gate settings"
        );

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            NoStore,
            Json(ErrorResponse::server_error()),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
struct Endpoints {
    token: String,
    verify: String,
}

/// Everything the modal needs to show itself on a page
#[derive(Debug, Serialize)]
struct SettingsResponse {
    enabled: bool,
    method: VerificationMethod,
    min_age: u32,
    date_format: DateFormat,
    date_placeholder: &'static str,
    frequency: Frequency,
    endpoints: Endpoints,
    redirects: Redirects,
    strings: GateStrings,

    /// Whether the modal should be shown to this visitor on this page
    prompt: bool,
}

#[tracing::instrument(name = "handlers.gate.settings.get", skip_all)]
pub(crate) async fn get(
    clock: BoxClock,
    State(session_store_factory): State<BoxSessionStoreFactory>,
    State(gate_config): State<GateConfig>,
    State(url_builder): State<UrlBuilder>,
    Query(params): Query<GateSettings>,
    cookie_jar: CookieJar,
) -> Result<impl IntoResponse, RouteError> {
    let path = params.path().filter(|path| !path.is_empty()).unwrap_or("/");

    let prompt = if gate_config.enabled && gate_config.targeting.applies_to(path) {
        match open_session(&session_store_factory, &clock, &cookie_jar).await? {
            Some(mut session) => {
                session
                    .should_prompt(&clock, gate_config.frequency)
                    .await?
            }
            // A visitor without a session never passed
            None => should_prompt(gate_config.frequency, false, None, clock.now()),
        }
    } else {
        false
    };

    let mut strings = gate_config.strings;
    strings.question_text = strings
        .question_text
        .replace("[age]", &gate_config.min_age.to_string());

    let response = SettingsResponse {
        enabled: gate_config.enabled,
        method: gate_config.method,
        min_age: gate_config.min_age,
        date_format: gate_config.date_format,
        date_placeholder: gate_config.date_format.placeholder(),
        frequency: gate_config.frequency,
        endpoints: Endpoints {
            token: url_builder.token(),
            verify: url_builder.verify(),
        },
        redirects: gate_config.redirects,
        strings,
        prompt,
    };

    Ok((NoStore, Json(response)))
}
