// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use avs_axum_utils::{NoStore, cookies::CookieJar};
use avs_data_model::{BoxClock, BoxRng};
use avs_storage::BoxSessionStoreFactory;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

use super::ErrorResponse;
use crate::{
    impl_from_error_for_route,
    session::{SessionCookieOptions, SessionLoadError, load_or_start_session},
};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl_from_error_for_route!(SessionLoadError);
impl_from_error_for_route!(avs_storage::SessionStoreError);

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        tracing::error!(
            error = &self as &dyn std::error::Error,
            "Failed to issue a verification token"
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
struct TokenResponse {
    token: String,
}

#[tracing::instrument(name = "handlers.gate.token.get", skip_all)]
pub(crate) async fn get(
    mut rng: BoxRng,
    clock: BoxClock,
    State(session_store_factory): State<BoxSessionStoreFactory>,
    State(cookie_options): State<SessionCookieOptions>,
    cookie_jar: CookieJar,
) -> Result<impl IntoResponse, RouteError> {
    let (mut session, cookie_jar) = load_or_start_session(
        &session_store_factory,
        &clock,
        &mut rng,
        cookie_jar,
        cookie_options,
    )
    .await?;

    let token = session.issue_token(&mut rng).await?;
    session.save().await?;

    Ok((NoStore, cookie_jar, Json(TokenResponse { token })))
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use hyper::{
        Request, StatusCode,
        header::{CACHE_CONTROL, SET_COOKIE},
    };

    use super::RouteError;
    use crate::test_utils::{
        CookieHelper, RequestBuilderExt, ResponseExt, TestState, read_response, setup,
    };

    #[tokio::test]
    async fn test_issue_token() {
        setup();
        let state = TestState::new();

        let request = Request::get("/token").empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
        response.assert_header_value(CACHE_CONTROL, "must-revalidate, no-cache, no-store, private");
        assert!(response.headers().contains_key(SET_COOKIE));

        let body: serde_json::Value = response.json();
        let token = body["token"].as_str().unwrap();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_tokens_share_the_session() {
        setup();
        let state = TestState::new();
        let cookies = CookieHelper::new();

        let request = cookies.with_cookies(Request::get("/token").empty());
        let response = state.request(request).await;
        cookies.save_cookies(&response);
        response.assert_status(StatusCode::OK);
        let first: serde_json::Value = response.json();

        let request = cookies.with_cookies(Request::get("/token").empty());
        let response = state.request(request).await;
        cookies.save_cookies(&response);
        response.assert_status(StatusCode::OK);
        let second: serde_json::Value = response.json();

        assert_ne!(first["token"], second["token"]);

        // Both requests used the same session
        assert_eq!(state.session_store_factory.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_cookie_starts_a_new_session() {
        setup();
        let state = TestState::new();

        let request = Request::get("/token")
            .header("Cookie", "avs-session=garbage")
            .empty();
        let response = state.request(request).await;
        response.assert_status(StatusCode::OK);
        assert!(response.headers().contains_key(SET_COOKIE));
        assert_eq!(state.session_store_factory.len(), 1);
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        setup();
        let error = std::io::Error::other("store unavailable for token 0123abcd");
        let response = read_response(RouteError::Internal(Box::new(error)).into_response()).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_header_value(CACHE_CONTROL, "must-revalidate, no-cache, no-store, private");
        assert!(!response.body().contains("0123abcd"));
        let body: serde_json::Value = response.json();
        assert_eq!(body, serde_json::json!({ "ok": false, "error": "server error" }));
    }
}
