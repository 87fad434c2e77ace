//! Executing client: `ServiceClient` + `Transport` + trace observer.
//!
//! # Design
//! `ApiClient` owns no session. Operations that depend on or change the
//! token state take the current `Session` and return the next one inside
//! an `AuthOutcome`, so concurrent callers cannot clobber each other's view
//! of the session. Each call is a single blocking round trip bounded by the
//! transport's timeouts; there are no retries.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::client::ServiceClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::trace::{TraceObserver, TraceRecord, TracingObserver};
use crate::transport::{Transport, UreqTransport};
use crate::types::{AuthOutcome, CatalogQuery, LoginRequest, RegisterRequest, Session};

#[derive(Clone)]
pub struct ApiClient<T: Transport = UreqTransport> {
    service: ServiceClient,
    transport: T,
    observer: Arc<dyn TraceObserver>,
}

impl ApiClient<UreqTransport> {
    /// Client backed by the real network and the `tracing` observer.
    pub fn new(auth_base: &str, books_base: &str) -> Self {
        Self::with_transport(auth_base, books_base, UreqTransport::new())
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(auth_base: &str, books_base: &str, transport: T) -> Self {
        Self {
            service: ServiceClient::new(auth_base, books_base),
            transport,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TraceObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn service(&self) -> &ServiceClient {
        &self.service
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Point subsequent calls at new base URLs.
    pub fn set_bases(&mut self, auth_base: &str, books_base: &str) {
        self.service = ServiceClient::new(auth_base, books_base);
    }

    pub fn register(
        &self,
        current: &Session,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, ApiError> {
        let input = RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = self.service.build_register(&input)?;
        let response = self.round_trip("register", &request)?;
        self.service.parse_register(response, current)
    }

    pub fn login(&self, current: &Session, identifier: &str, password: &str) -> Result<AuthOutcome, ApiError> {
        let request = self.service.build_login(&LoginRequest::new(identifier, password))?;
        let response = self.round_trip("login", &request)?;
        self.service.parse_login(response, current)
    }

    /// Fails with `IllegalState` without touching the network when the
    /// session has no refresh token.
    pub fn refresh(&self, current: &Session) -> Result<AuthOutcome, ApiError> {
        let request = self.service.build_refresh(current)?;
        let response = self.round_trip("refresh", &request)?;
        self.service.parse_refresh(response, current)
    }

    pub fn profile(&self, current: &Session) -> Result<Value, ApiError> {
        let request = self.service.build_profile(current);
        let response = self.round_trip("profile", &request)?;
        self.service.parse_profile(response)
    }

    /// `true` iff the auth service answers its health endpoint with 200.
    pub fn health_auth(&self) -> bool {
        let request = self.service.build_health_auth();
        match self.round_trip("health_auth", &request) {
            Ok(response) => self.service.parse_health_auth(&response),
            Err(_) => false,
        }
    }

    pub fn fetch_catalog_xml(&self) -> Result<String, ApiError> {
        self.fetch_catalog_xml_for(&CatalogQuery::All)
    }

    pub fn fetch_catalog_xml_for(&self, query: &CatalogQuery) -> Result<String, ApiError> {
        let request = self.service.build_catalog(query)?;
        let response = self.round_trip("catalog", &request)?;
        self.service.parse_catalog(response)
    }

    /// The catalog service has no health endpoint; a successful full
    /// catalog fetch counts as healthy.
    pub fn health_books(&self) -> bool {
        self.fetch_catalog_xml().is_ok()
    }

    fn round_trip(&self, label: &'static str, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.emit(TraceRecord::request(label, request));
        match self.transport.execute(request) {
            Ok(response) => {
                self.emit(TraceRecord::response(label, &response));
                Ok(response)
            }
            Err(e) => {
                self.emit(TraceRecord::Failure {
                    label,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Observer panics are contained so they never change a call's outcome.
    fn emit(&self, record: TraceRecord) {
        let observer = &self.observer;
        if let Err(e) = catch_unwind(AssertUnwindSafe(|| observer.record(&record))) {
            error!("trace observer panicked on {} record: {:?}", record.label(), e);
        }
    }
}
