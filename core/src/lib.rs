//! Client core for the bookdesk auth and catalog services.
//!
//! # Overview
//! Registers and logs users in against the auth service, keeps their JWT
//! access/refresh tokens as an immutable `Session` value, calls the
//! protected profile endpoint, and fetches the books catalog as XML and
//! decodes it into rows. The two service base URLs live in a per-user JSON
//! settings file.
//!
//! # Design
//! - `ServiceClient` is stateless and sans-IO: `build_*` produces an
//!   `HttpRequest`, `parse_*` consumes an `HttpResponse`.
//! - `ApiClient` pairs it with a `Transport` (ureq by default) and a
//!   `TraceObserver` that sees every exchange.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod catalog;
pub mod client;
pub mod error;
pub mod http;
pub mod settings;
pub mod trace;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use catalog::decode_catalog;
pub use client::ServiceClient;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use settings::{Settings, SettingsStore};
pub use trace::{TraceObserver, TraceRecord, TracingObserver};
pub use transport::{Transport, UreqTransport};
pub use types::{AuthOutcome, BookRow, CatalogQuery, Session};
