//! Blocking client for the desktop backend's license and update API.
//!
//! # Overview
//! Builds requests against a fixed base URL, executes each one with a bounded
//! timeout, and normalizes every outcome into either a parsed JSON payload or
//! a single `ApiError` with a user-facing message.
//!
//! # Design
//! - `ApiConfig` is resolved once (usually from `BACKEND_API_BASE_URL`) and
//!   moved into the client; the client never mutates it.
//! - Request building and response parsing are plain functions over
//!   `HttpRequest` / `HttpResponse` data; the network round-trip sits behind
//!   the `Transport` trait so the normalization logic is testable offline.
//! - No retries, no caching: one call, one outbound request.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod machine_id;
pub mod payload;
pub mod query;
pub mod transport;
pub mod types;

pub use client::BackendApiClient;
pub use config::{ApiConfig, BASE_URL_ENV, DEFAULT_BASE_URL, REQUEST_TIMEOUT_MS};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use machine_id::machine_id;
pub use payload::{extract_error_message, is_json_content_type, parse_payload};
pub use query::{Query, QueryValue};
pub use transport::{Transport, UreqTransport};
pub use types::{RedeemLicense, RequestOptions};
