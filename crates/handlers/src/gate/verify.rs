// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::convert::Infallible;

use avs_axum_utils::{NoStore, cookies::CookieJar};
use avs_data_model::{
    BoxClock, Clock, DobError, GateConfig, GateState, VerificationMethod, age_on, normalize_dob,
};
use avs_storage::BoxSessionStoreFactory;
use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request, State},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use hyper::{StatusCode, header::CONTENT_TYPE};
use mime::Mime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::ErrorResponse;
use crate::{impl_from_error_for_route, session::open_session};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Missing token.")]
    MissingToken,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Unsupported action.")]
    UnsupportedAction,

    #[error("DOB required.")]
    MissingDob,

    #[error("Invalid DOB format.")]
    InvalidDobFormat(#[source] DobError),
}

impl_from_error_for_route!(avs_storage::SessionStoreError);

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Internal(_) => {
                tracing::error!(
                    error = &self as &dyn std::error::Error,
                    "Failed to verify the visitor"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::server_error(),
                )
            }
            Self::MissingToken
            | Self::InvalidToken
            | Self::UnsupportedAction
            | Self::MissingDob
            | Self::InvalidDobFormat(_) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::from_error(&self))
            }
        };

        (status, NoStore, Json(body)).into_response()
    }
}

/// Casts scalar values to strings, drops anything else
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(value)) => Some(value),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    })
}

/// The answer of a visitor.
///
/// Accepted as a JSON body when the request says so, as a URL-encoded form
/// otherwise. A body which can't be decoded is treated as empty.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    #[serde(default, deserialize_with = "scalar_as_string")]
    action: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    token: Option<String>,

    #[serde(default, deserialize_with = "scalar_as_string")]
    dob: Option<String>,
}

impl VerifyRequest {
    /// Decode a URL-encoded form, the last occurrence of a repeated field wins
    fn from_form(body: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;

        let mut request = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "action" => request.action = Some(value),
                "token" => request.token = Some(value),
                "dob" => request.dob = Some(value),
                _ => {}
            }
        }

        Ok(request)
    }
}

impl<S> FromRequest<S> for VerifyRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Mime>().ok())
            .is_some_and(|mime| mime.type_() == mime::APPLICATION && mime.subtype() == mime::JSON);

        let body = match Bytes::from_request(req, state).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(
                    error = &e as &dyn std::error::Error,
                    "Could not read the verification request"
                );
                return Ok(Self::default());
            }
        };

        let request = if is_json {
            serde_json::from_slice(&body)
                .inspect_err(|e| {
                    tracing::debug!(
                        error = e as &dyn std::error::Error,
                        "Malformed JSON verification request"
                    );
                })
                .ok()
        } else {
            Self::from_form(&body)
                .inspect_err(|e| {
                    tracing::debug!(
                        error = e as &dyn std::error::Error,
                        "Malformed form verification request"
                    );
                })
                .ok()
        };

        Ok(request.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Yes,
    No,
    Dob,
}

impl Action {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "dob" => Some(Self::Dob),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Verdict {
    state: GateState,
    age: Option<u32>,
}

/// Decide the outcome of an answer, once its token was accepted
fn evaluate(
    config: &GateConfig,
    today: NaiveDate,
    request: &VerifyRequest,
) -> Result<Verdict, RouteError> {
    let action = Action::parse(request.action.as_deref().unwrap_or_default())
        .ok_or(RouteError::UnsupportedAction)?;

    match action {
        Action::Yes => Ok(Verdict {
            state: GateState::Passed,
            age: None,
        }),

        Action::No => Ok(Verdict {
            state: GateState::Denied,
            age: None,
        }),

        Action::Dob => {
            if config.method != VerificationMethod::Dob {
                return Err(RouteError::UnsupportedAction);
            }

            let raw = request
                .dob
                .as_deref()
                .filter(|dob| !dob.is_empty())
                .ok_or(RouteError::MissingDob)?;

            let dob = normalize_dob(raw, config.date_format).map_err(RouteError::InvalidDobFormat)?;
            let age = age_on(dob, today);

            Ok(Verdict {
                state: config.state_for_age(age),
                age: Some(age),
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    ok: bool,
    result: GateState,

    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
}

#[tracing::instrument(name = "handlers.gate.verify.post", skip_all)]
pub(crate) async fn post(
    clock: BoxClock,
    State(session_store_factory): State<BoxSessionStoreFactory>,
    State(gate_config): State<GateConfig>,
    cookie_jar: CookieJar,
    request: VerifyRequest,
) -> Result<impl IntoResponse, RouteError> {
    let token = request
        .token
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or(RouteError::MissingToken)?;

    // Tokens are bound to a session, without one no token is valid
    let Some(mut session) = open_session(&session_store_factory, &clock, &cookie_jar).await?
    else {
        return Err(RouteError::InvalidToken);
    };

    if !session.consume_token(token).await? {
        return Err(RouteError::InvalidToken);
    }

    let outcome = evaluate(&gate_config, clock.today(), &request);
    if let Ok(verdict) = &outcome {
        session
            .record(&clock, gate_config.frequency, verdict.state)
            .await?;
    }

    // The token is spent even if the answer was rejected
    session.save().await?;

    let verdict = outcome?;
    tracing::info!(
        result = ?verdict.state,
        frequency = %gate_config.frequency,
        "Visitor answered the age gate"
    );

    let redirect = gate_config
        .redirects
        .for_state(verdict.state)
        .map(ToOwned::to_owned);

    Ok((
        NoStore,
        Json(VerifyResponse {
            ok: true,
            result: verdict.state,
            age: verdict.age,
            redirect,
        }),
    ))
}
