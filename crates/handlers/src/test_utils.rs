// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex, RwLock},
};

use avs_axum_utils::cookies::CookieManager;
use avs_data_model::{BoxClock, BoxRng, GateConfig, clock::MockClock};
use avs_router::UrlBuilder;
use avs_storage::{BoxSessionStoreFactory, GateSession, MemorySessionStoreFactory};
use axum::{
    body::{Bytes, HttpBody},
    extract::{FromRef, FromRequestParts},
};
use chrono::Duration;
use cookie_store::{CookieStore, RawCookie};
use headers::{ContentType, HeaderMapExt, HeaderName, HeaderValue};
use hyper::{
    Request, Response, StatusCode,
    header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
};
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use serde::{Serialize, de::DeserializeOwned};
use tower::{Service, ServiceExt};
use url::Url;

use crate::{SessionCookieOptions, session::open_session};

/// Setup tracing for tests.
#[allow(unused_must_use)]
pub(crate) fn setup() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

/// Buffer the body of a response, so that it can be inspected.
pub(crate) async fn read_response(response: axum::response::Response) -> Response<String> {
    let (parts, body) = response.into_parts();

    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");
    let body = std::str::from_utf8(&body)
        .expect("Response body is not valid UTF-8")
        .to_owned();

    Response::from_parts(parts, body)
}

#[derive(Clone)]
pub(crate) struct TestState {
    pub session_store_factory: MemorySessionStoreFactory,
    pub cookie_manager: CookieManager,
    pub gate_config: GateConfig,
    pub session_cookie_options: SessionCookieOptions,
    pub url_builder: UrlBuilder,
    pub clock: Arc<MockClock>,
    pub rng: Arc<Mutex<ChaChaRng>>,
}

impl TestState {
    /// Create a new test state, with the default gate configuration
    pub fn new() -> Self {
        Self::with_gate_config(GateConfig::default())
    }

    /// Create a new test state with the given gate configuration
    pub fn with_gate_config(gate_config: GateConfig) -> Self {
        let cookie_manager =
            CookieManager::derive_from("https://example.com/".parse().unwrap(), &[0x42; 32]);

        Self {
            session_store_factory: MemorySessionStoreFactory::new(Duration::try_days(30).unwrap()),
            cookie_manager,
            gate_config,
            session_cookie_options: SessionCookieOptions::default(),
            url_builder: UrlBuilder::new(None),
            clock: Arc::new(MockClock::default()),
            rng: Arc::new(Mutex::new(ChaChaRng::seed_from_u64(42))),
        }
    }

    /// Build URLs as if the routes were served under the given prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.url_builder = UrlBuilder::new(Some(prefix));
        self
    }

    pub async fn request<B>(&self, request: Request<B>) -> Response<String>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        <B as HttpBody>::Error: std::error::Error + Send + Sync,
        B::Error: std::error::Error + Send + Sync,
        B::Data: Send,
    {
        let app = crate::healthcheck_router()
            .merge(crate::gate_router())
            .with_state(self.clone())
            .into_service();

        let Ok(mut service) = app.ready_oneshot().await;
        let Ok(response) = service.call(request).await;

        read_response(response).await
    }

    /// Open the session of the visitor owning the given cookies
    pub async fn session(&self, cookies: &CookieHelper) -> Option<GateSession> {
        let request = cookies.with_cookies(Request::get("/").body(()).unwrap());
        let cookie_jar = self.cookie_manager.cookie_jar_from_headers(request.headers());
        let factory = self.session_store_factory.clone().boxed();

        open_session(&factory, &self.clock, &cookie_jar)
            .await
            .expect("Failed to open the session")
    }
}

impl FromRef<TestState> for BoxSessionStoreFactory {
    fn from_ref(input: &TestState) -> Self {
        input.session_store_factory.clone().boxed()
    }
}

impl FromRef<TestState> for CookieManager {
    fn from_ref(input: &TestState) -> Self {
        input.cookie_manager.clone()
    }
}

impl FromRef<TestState> for GateConfig {
    fn from_ref(input: &TestState) -> Self {
        input.gate_config.clone()
    }
}

impl FromRef<TestState> for SessionCookieOptions {
    fn from_ref(input: &TestState) -> Self {
        input.session_cookie_options
    }
}

impl FromRef<TestState> for UrlBuilder {
    fn from_ref(input: &TestState) -> Self {
        input.url_builder.clone()
    }
}

impl FromRequestParts<TestState> for BoxClock {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        state: &TestState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Box::new(state.clock.clone()))
    }
}

impl FromRequestParts<TestState> for BoxRng {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut axum::http::request::Parts,
        state: &TestState,
    ) -> Result<Self, Self::Rejection> {
        let mut parent_rng = state.rng.lock().expect("Failed to lock RNG");
        let rng = ChaChaRng::from_rng(&mut *parent_rng).expect("Failed to seed RNG");
        Ok(Box::new(rng))
    }
}

pub(crate) trait RequestBuilderExt {
    /// Builds the request with the given JSON value as body.
    fn json<T: Serialize>(self, body: T) -> hyper::Request<String>;

    /// Builds the request with the given form value as body.
    fn form<T: Serialize>(self, body: T) -> hyper::Request<String>;

    /// Builds the request with an empty body.
    fn empty(self) -> hyper::Request<String>;
}

impl RequestBuilderExt for hyper::http::request::Builder {
    fn json<T: Serialize>(mut self, body: T) -> hyper::Request<String> {
        self.headers_mut()
            .unwrap()
            .typed_insert(ContentType::json());

        self.body(serde_json::to_string(&body).unwrap()).unwrap()
    }

    fn form<T: Serialize>(mut self, body: T) -> hyper::Request<String> {
        self.headers_mut()
            .unwrap()
            .typed_insert(ContentType::form_url_encoded());

        self.body(serde_urlencoded::to_string(&body).unwrap())
            .unwrap()
    }

    fn empty(self) -> hyper::Request<String> {
        self.body(String::new()).unwrap()
    }
}

pub(crate) trait ResponseExt {
    /// Asserts that the response has the given status code.
    ///
    /// # Panics
    ///
    /// Panics if the response has a different status code.
    fn assert_status(&self, status: StatusCode);

    /// Asserts that the response has the given header value.
    ///
    /// # Panics
    ///
    /// Panics if the response does not have the given header or if the header
    /// value does not match.
    fn assert_header_value(&self, header: HeaderName, value: &str);

    /// Get the response body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the response is missing the `Content-Type: application/json`,
    /// or if the body is not valid JSON.
    fn json<T: DeserializeOwned>(&self) -> T;
}

impl ResponseExt for Response<String> {
    #[track_caller]
    fn assert_status(&self, status: StatusCode) {
        assert_eq!(
            self.status(),
            status,
            "HTTP status code mismatch: got {}, expected {}. Body: {}",
            self.status(),
            status,
            self.body()
        );
    }

    #[track_caller]
    fn assert_header_value(&self, header: HeaderName, value: &str) {
        let actual_value = self
            .headers()
            .get(&header)
            .unwrap_or_else(|| panic!("Missing header {header}"));

        assert_eq!(
            actual_value,
            value,
            "Header mismatch: got {:?}, expected {:?}",
            self.headers().get(header),
            value
        );
    }

    #[track_caller]
    fn json<T: DeserializeOwned>(&self) -> T {
        self.assert_header_value(CONTENT_TYPE, "application/json");
        serde_json::from_str(self.body()).expect("JSON deserialization failed")
    }
}

/// A helper for storing and retrieving cookies in tests.
#[derive(Clone, Debug, Default)]
pub struct CookieHelper {
    store: Arc<RwLock<CookieStore>>,
}

impl CookieHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject the cookies from the store into the request.
    pub fn with_cookies<B>(&self, mut request: Request<B>) -> Request<B> {
        let url = Url::options()
            .base_url(Some(&"https://example.com/".parse().unwrap()))
            .parse(&request.uri().to_string())
            .expect("Failed to parse URL");

        let store = self.store.read().unwrap();
        let value = store
            .get_request_values(&url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        request.headers_mut().insert(
            COOKIE,
            HeaderValue::from_str(&value).expect("Invalid cookie value"),
        );
        request
    }

    /// Save the cookies from the response into the store.
    pub fn save_cookies<B>(&self, response: &Response<B>) {
        let url = "https://example.com/".parse().unwrap();
        let mut store = self.store.write().unwrap();
        store.store_response_cookies(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .map(|set_cookie| {
                    RawCookie::parse(
                        set_cookie
                            .to_str()
                            .expect("Invalid set-cookie header")
                            .to_owned(),
                    )
                    .expect("Invalid set-cookie header")
                }),
            &url,
        );
    }
}
