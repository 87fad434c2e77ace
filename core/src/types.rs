//! Domain DTOs for the auth and catalog services.
//!
//! # Design
//! Request payloads mirror the services' JSON schema but are defined
//! independently of the mock server; integration tests catch drift.
//! Responses from the auth service are kept as `serde_json::Value` because
//! the client only picks a few token fields out of them and hands the rest
//! to the caller untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// In-memory token state for one user.
///
/// A `Session` is never mutated in place. Register, login and refresh each
/// return a fresh value and the caller keeps the latest one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub access_expires_at_utc: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Session described by a register/login response.
    ///
    /// When the body carries a `tokens` member all three fields are taken
    /// from it, missing ones becoming `None`; `"tokens": null` clears the
    /// session. Without `tokens` the current session is returned unchanged.
    pub fn from_auth_body(&self, body: &Value) -> Session {
        match body.get("tokens") {
            Some(tokens) => Session {
                access_token: text_field(tokens, "access_token"),
                refresh_token: text_field(tokens, "refresh_token"),
                access_expires_at_utc: text_field(tokens, "access_expires_at_utc"),
            },
            None => self.clone(),
        }
    }

    /// Session after a refresh response: new access token and expiry, same
    /// refresh token.
    pub fn with_refreshed_access(&self, body: &Value) -> Session {
        Session {
            access_token: text_field(body, "access_token"),
            refresh_token: self.refresh_token.clone(),
            access_expires_at_utc: text_field(body, "access_expires_at_utc"),
        }
    }

    /// One-line summary for status displays.
    pub fn status_line(&self) -> String {
        if self.is_authenticated() {
            let expiry = self.access_expires_at_utc.as_deref().unwrap_or("?");
            format!("authenticated, expires {expiry}")
        } else {
            "disconnected".to_string()
        }
    }
}

/// Text of `node[key]`: strings verbatim, other scalars rendered as JSON,
/// `null`/missing as `None`.
fn text_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Result of an operation that can change the session.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// Parsed response body.
    pub body: Value,
    /// Session to use from now on.
    pub session: Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// The auth service accepts either field as the identifier, so the client
/// sends the same value in both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(identifier: &str, password: &str) -> Self {
        Self {
            email: identifier.to_string(),
            username: identifier.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// One row of the books catalog. All values are kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRow {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
    pub price: String,
    pub stock: String,
    pub format: String,
}

impl BookRow {
    pub const COLUMNS: [&'static str; 8] =
        ["isbn", "title", "author", "year", "genre", "price", "stock", "format"];

    /// Values in `COLUMNS` order.
    pub fn cells(&self) -> [&str; 8] {
        [
            &self.isbn,
            &self.title,
            &self.author,
            &self.year,
            &self.genre,
            &self.price,
            &self.stock,
            &self.format,
        ]
    }
}

/// Which slice of the catalog to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogQuery {
    #[default]
    All,
    Isbn(String),
    Format(String),
    Author(String),
}
