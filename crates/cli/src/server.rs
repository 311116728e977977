// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use axum::{
    Router,
    http::{Method, Version},
};
use headers::{HeaderMapExt as _, UserAgent};

use crate::app_state::AppState;

#[inline]
fn http_method(method: &Method) -> &'static str {
    match *method {
        Method::OPTIONS => "OPTIONS",
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::HEAD => "HEAD",
        Method::TRACE => "TRACE",
        Method::CONNECT => "CONNECT",
        Method::PATCH => "PATCH",
        _ => "_OTHER",
    }
}

#[inline]
fn http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "_OTHER",
    }
}

async fn log_response_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let user_agent: Option<UserAgent> = request.headers().typed_get();
    let user_agent = user_agent.as_ref().map_or("-", |u| u.as_str());
    let method = http_method(request.method());
    let path = request.uri().path().to_owned();
    let version = http_version(request.version());

    let response = next.run(request).await;

    let status_code = response.status();
    match status_code.as_u16() {
        100..=399 => tracing::info!(
            name: "http.server.response",
            "\"{method} {path} HTTP/{version}\" {status_code} {user_agent:?}",
        ),
        400..=499 => tracing::warn!(
            name: "http.server.response",
            "\"{method} {path} HTTP/{version}\" {status_code} {user_agent:?}",
        ),
        500..=599 => tracing::error!(
            name: "http.server.response",
            "\"{method} {path} HTTP/{version}\" {status_code} {user_agent:?}",
        ),
        _ => { /* This shouldn't happen */ }
    }

    response
}

pub fn build_router(state: AppState, prefix: Option<&str>) -> Router<()> {
    let mut router = Router::new()
        .merge(avs_handlers::healthcheck_router::<AppState>())
        .merge(avs_handlers::gate_router::<AppState>());

    // We normalize the prefix:
    //  - if it's None, it becomes '/'
    //  - if it's Some(..), any trailing '/' is first trimmed, then a '/' is added
    let prefix = format!("{}/", prefix.unwrap_or_default().trim_end_matches('/'));
    // Nesting at the root makes axum panic, so we only nest for real prefixes
    if prefix != "/" {
        router = Router::new().nest(&prefix, router);
    }

    router
        .layer(axum::middleware::from_fn(log_response_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use avs_config::RootConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::util::{
        cookie_manager_from_config, gate_config_from_config, session_cookie_options_from_config,
        session_store_factory_from_config, url_builder_from_config,
    };

    fn router(prefix: Option<&str>) -> Router {
        let mut config = RootConfig::test();
        config.http.prefix = prefix.map(ToOwned::to_owned);

        let state = AppState {
            session_store_factory: session_store_factory_from_config(&config.session),
            cookie_manager: cookie_manager_from_config(&config.http, &config.secrets),
            gate_config: gate_config_from_config(&config.gate).unwrap(),
            session_cookie_options: session_cookie_options_from_config(&config.session),
            url_builder: url_builder_from_config(&config.http),
        };

        build_router(state, config.http.prefix.as_deref())
    }

    async fn status(router: Router, uri: &str) -> StatusCode {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_root_router() {
        let router = router(None);
        assert_eq!(status(router.clone(), "/health").await, StatusCode::OK);
        assert_eq!(status(router.clone(), "/token").await, StatusCode::OK);
        assert_eq!(status(router, "/unknown").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prefixed_router() {
        let router = router(Some("/age-gate"));
        assert_eq!(
            status(router.clone(), "/age-gate/health").await,
            StatusCode::OK
        );
        assert_eq!(
            status(router.clone(), "/age-gate/settings?path=%2F").await,
            StatusCode::OK
        );
        assert_eq!(status(router, "/token").await, StatusCode::NOT_FOUND);
    }
}
