//! Stateless HTTP request builder and response parser for the auth and
//! catalog services.
//!
//! # Design
//! `ServiceClient` holds only the two base URLs and carries no session
//! state between calls. Each operation is split into a `build_*` method
//! that produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Session-dependent operations take the current `Session`
//! and hand back the next one, so the token flow stays visible at the call
//! site.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{AuthOutcome, CatalogQuery, LoginRequest, RefreshRequest, RegisterRequest, Session};

const NO_REFRESH_TOKEN: &str = "no refresh token loaded";

/// Synchronous, stateless client for the auth and catalog services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceClient {
    auth_base: String,
    books_base: String,
}

impl ServiceClient {
    pub fn new(auth_base: &str, books_base: &str) -> Self {
        Self {
            auth_base: auth_base.trim_end_matches('/').to_string(),
            books_base: books_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn auth_base(&self) -> &str {
        &self.auth_base
    }

    pub fn books_base(&self) -> &str {
        &self.books_base
    }

    // --- auth ---

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        json_post(format!("{}/auth/register", self.auth_base), input)
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        json_post(format!("{}/auth/login", self.auth_base), input)
    }

    /// Fails with `IllegalState` when the session holds no refresh token.
    pub fn build_refresh(&self, session: &Session) -> Result<HttpRequest, ApiError> {
        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or(ApiError::IllegalState(NO_REFRESH_TOKEN))?;
        json_post(
            format!("{}/auth/refresh", self.auth_base),
            &RefreshRequest { refresh_token },
        )
    }

    /// The bearer header is only attached when an access token exists; the
    /// server decides what an anonymous call gets.
    pub fn build_profile(&self, session: &Session) -> HttpRequest {
        let headers = match &session.access_token {
            Some(token) => vec![("authorization".to_string(), format!("Bearer {token}"))],
            None => Vec::new(),
        };
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/api/profile", self.auth_base),
            headers,
            body: None,
        }
    }

    pub fn build_health_auth(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/health", self.auth_base),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_register(&self, response: HttpResponse, current: &Session) -> Result<AuthOutcome, ApiError> {
        self.parse_login(response, current)
    }

    pub fn parse_login(&self, response: HttpResponse, current: &Session) -> Result<AuthOutcome, ApiError> {
        let body = parse_json(response)?;
        let session = current.from_auth_body(&body);
        Ok(AuthOutcome { body, session })
    }

    pub fn parse_refresh(&self, response: HttpResponse, current: &Session) -> Result<AuthOutcome, ApiError> {
        let body = parse_json(response)?;
        let session = current.with_refreshed_access(&body);
        Ok(AuthOutcome { body, session })
    }

    pub fn parse_profile(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    pub fn parse_health_auth(&self, response: &HttpResponse) -> bool {
        response.status == 200
    }

    // --- catalog ---

    pub fn build_catalog(&self, query: &CatalogQuery) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.catalog_url(query)?,
            headers: vec![("accept".to_string(), "application/xml".to_string())],
            body: None,
        })
    }

    pub fn parse_catalog(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response)?;
        Ok(response.body)
    }

    fn catalog_url(&self, query: &CatalogQuery) -> Result<String, ApiError> {
        let (kind, value) = match query {
            CatalogQuery::All => return Ok(format!("{}/api/books", self.books_base)),
            CatalogQuery::Isbn(isbn) => ("isbn", isbn),
            CatalogQuery::Format(format) => ("format", format),
            CatalogQuery::Author(author) => ("author", author),
        };
        let invalid = |reason: String| ApiError::InvalidUrl(format!("{}: {reason}", self.books_base));
        let mut url = Url::parse(&format!("{}/api/books/{kind}", self.books_base))
            .map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot carry a path".to_string()))?
            .push(value);
        Ok(url.to_string())
    }
}

fn json_post<T: Serialize>(url: String, input: &T) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(HttpRequest {
        method: HttpMethod::Post,
        url,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: Some(body),
    })
}

fn parse_json(response: HttpResponse) -> Result<Value, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map status codes >= 400 to `ApiError::Http`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status < 400 {
        return Ok(());
    }
    Err(ApiError::Http {
        status: response.status,
        url: response.url.clone(),
        body: response.body.clone(),
    })
}
