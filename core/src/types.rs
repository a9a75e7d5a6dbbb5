//! Request inputs for the backend API.
//!
//! # Design
//! Payload field names match the backend's snake_case wire names. Response
//! bodies stay as `serde_json::Value`; the backend owns the response shapes.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{Query, QueryValue};

/// Body for `POST /license/redeem`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedeemLicense {
    pub code: String,
    pub machine_id: String,
}

/// Per-call options for `BackendApiClient::request`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub query: Query,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get() -> Self {
        Self::new().method(HttpMethod::Get)
    }

    pub fn post() -> Self {
        Self::new().method(HttpMethod::Post)
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.query.set(key, value);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Raw body, sent as-is.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.body(body))
    }
}
