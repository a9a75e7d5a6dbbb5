//! JSON payload extraction from backend responses.

use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Parse the body as JSON when the response declares a JSON content type.
///
/// Returns `Ok(None)` for any other content type, including a missing header.
pub fn parse_payload(response: &HttpResponse) -> Result<Option<Value>, ApiError> {
    if !is_json_content_type(response.header("content-type")) {
        return Ok(None);
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// True when a `content-type` value declares a JSON body.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("application/json"))
}

/// Pick the message for a failed response.
///
/// Prefers a non-empty string `detail`, then a non-empty string `message`,
/// then a generic text naming the status.
pub fn extract_error_message(payload: Option<&Value>, status: u16) -> String {
    let field = |name: &str| {
        payload
            .and_then(|p| p.get(name))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    field("detail")
        .or_else(|| field("message"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed (HTTP {status})"))
}
