//! Request builder, executor and response normalizer for the backend API.
//!
//! # Design
//! `BackendApiClient` holds only an immutable `ApiConfig` and a transport, and
//! carries no mutable state between calls. Every call goes through three
//! steps that are public on their own:
//!
//! - `build_request` produces an `HttpRequest` (URL, merged headers, body).
//! - the transport executes it under the configured timeout.
//! - `parse_response` turns the `HttpResponse` into a payload or an `ApiError`.
//!
//! Each call settles exactly once: `Ok(payload)` or one `ApiError`.

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, TransportError};
use crate::http::{find_header, HttpRequest, HttpResponse};
use crate::payload::{extract_error_message, parse_payload};
use crate::query::Query;
use crate::transport::{Transport, UreqTransport};
use crate::types::{RedeemLicense, RequestOptions};

pub const CHECK_UPDATE_PATH: &str = "/app/check-update";
pub const LICENSE_STATUS_PATH: &str = "/license/status";
pub const LICENSE_REDEEM_PATH: &str = "/license/redeem";

const JSON: &str = "application/json";

/// Client for the backend license and update API.
#[derive(Debug, Clone)]
pub struct BackendApiClient<T = UreqTransport> {
    config: ApiConfig,
    transport: T,
}

impl BackendApiClient {
    /// Client using the blocking `ureq` transport with the config's timeout.
    pub fn new(config: ApiConfig) -> Self {
        let transport = UreqTransport::new(config.request_timeout());
        Self { config, transport }
    }

    /// Client configured from the environment.
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }
}

impl<T: Transport> BackendApiClient<T> {
    pub fn with_transport(config: ApiConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    /// `base_url + path` with the rendered query applied in order.
    ///
    /// Each entry replaces a same-named parameter already present in `path`
    /// (first occurrence keeps its position, later ones are dropped);
    /// otherwise it is appended.
    pub fn build_url(&self, path: &str, query: &Query) -> Result<String, ApiError> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url()))
            .map_err(|e| ApiError::InvalidUrl(format!("Invalid URL for path {path:?}: {e}")))?;
        let mut rendered = query.rendered().peekable();
        if rendered.peek().is_none() {
            return Ok(url.into());
        }

        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        for (key, value) in rendered {
            match pairs.iter().position(|(k, _)| k == key) {
                Some(first) => {
                    pairs[first].1 = value;
                    let mut index = 0;
                    pairs.retain(|(k, _)| {
                        let keep = index <= first || k != key;
                        index += 1;
                        keep
                    });
                }
                None => pairs.push((key.to_string(), value)),
            }
        }
        url.query_pairs_mut().clear().extend_pairs(&pairs);
        Ok(url.into())
    }

    pub fn build_request(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.build_url(path, &options.query)?;

        let mut headers = vec![("Accept".to_string(), JSON.to_string())];
        for (name, value) in &options.headers {
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some(existing) => *existing = (name.clone(), value.clone()),
                None => headers.push((name.clone(), value.clone())),
            }
        }
        if options.body.is_some() && find_header(&headers, "content-type").is_none() {
            headers.push(("Content-Type".to_string(), JSON.to_string()));
        }

        Ok(HttpRequest {
            method: options.method,
            url,
            headers,
            body: options.body.clone(),
        })
    }

    /// Parse a response, failing for non-2xx statuses.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Option<Value>, ApiError> {
        let payload = parse_payload(&response)?;
        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                message: extract_error_message(payload.as_ref(), response.status),
            });
        }
        Ok(payload)
    }

    /// Issue one request against `path` and normalize the outcome.
    pub fn request(&self, path: &str, options: &RequestOptions) -> Result<Option<Value>, ApiError> {
        let request = self.build_request(path, options)?;
        debug!(method = %request.method, url = %request.url, "backend request");

        let result = self
            .transport
            .send(&request)
            .map_err(|e| self.translate(e))
            .and_then(|response| {
                debug!(status = response.status, "backend response");
                self.parse_response(response)
            });

        if let Err(err) = &result {
            warn!(method = %request.method, url = %request.url, error = %err, "backend request failed");
        }
        result
    }

    /// `GET /app/check-update` with `params` as the query string.
    pub fn check_update(&self, params: &Query) -> Result<Option<Value>, ApiError> {
        let options = RequestOptions::get().query(params.clone());
        self.request(CHECK_UPDATE_PATH, &options)
    }

    /// `GET /license/status?machine_id=<machine_id>`.
    pub fn get_license_status(&self, machine_id: &str) -> Result<Option<Value>, ApiError> {
        let options = RequestOptions::get().param("machine_id", machine_id);
        self.request(LICENSE_STATUS_PATH, &options)
    }

    /// `POST /license/redeem` with `{"code", "machine_id"}` as the JSON body.
    pub fn redeem_license_code(&self, input: &RedeemLicense) -> Result<Option<Value>, ApiError> {
        let options = RequestOptions::post().json(input)?;
        self.request(LICENSE_REDEEM_PATH, &options)
    }

    fn translate(&self, error: TransportError) -> ApiError {
        match error {
            TransportError::Timeout => ApiError::Timeout,
            TransportError::Connect(_) => ApiError::Connection {
                base_url: self.base_url().to_string(),
            },
            TransportError::Other(message) => ApiError::Transport(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::http::HttpMethod;

    /// Records every request and replays a canned outcome.
    struct FakeTransport {
        outcome: Result<HttpResponse, TransportError>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn responding(status: u16, content_type: Option<&str>, body: &str) -> Self {
            Self {
                outcome: Ok(HttpResponse {
                    status,
                    headers: content_type
                        .map(|ct| vec![("content-type".to_string(), ct.to_string())])
                        .unwrap_or_default(),
                    body: body.to_string(),
                }),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: TransportError) -> Self {
            Self {
                outcome: Err(error),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            self.outcome.clone()
        }
    }

    const BASE: &str = "http://localhost:8000/api/v1";

    fn client(transport: FakeTransport) -> BackendApiClient<FakeTransport> {
        BackendApiClient::with_transport(ApiConfig::new(BASE), transport)
    }

    fn ok_json(body: &str) -> BackendApiClient<FakeTransport> {
        client(FakeTransport::responding(200, Some(JSON), body))
    }

    #[test]
    fn build_url_skips_null_and_empty_values() {
        let query = Query::new()
            .param("current_version", "1.2.0")
            .param("channel", "")
            .param("arch", None::<String>)
            .param("beta", false)
            .param("build", 17);
        let url = ok_json("{}").build_url("/app/check-update", &query).unwrap();
        assert_eq!(
            url,
            "http://localhost:8000/api/v1/app/check-update?current_version=1.2.0&beta=false&build=17"
        );
    }

    #[test]
    fn build_url_without_query_has_no_question_mark() {
        let url = ok_json("{}").build_url("/license/redeem", &Query::new()).unwrap();
        assert_eq!(url, "http://localhost:8000/api/v1/license/redeem");

        let only_empty = Query::new().param("x", "");
        let url = ok_json("{}").build_url("/license/redeem", &only_empty).unwrap();
        assert_eq!(url, "http://localhost:8000/api/v1/license/redeem");
    }

    #[test]
    fn build_url_encodes_values() {
        let query = Query::new().param("q", "a b&c=d");
        let url = ok_json("{}").build_url("/x", &query).unwrap();
        assert_eq!(url, "http://localhost:8000/api/v1/x?q=a+b%26c%3Dd");
    }

    #[test]
    fn build_url_replaces_params_already_in_path() {
        let query = Query::new().param("a", 3).param("c", "new");
        let url = ok_json("{}").build_url("/x?a=1&b=2&a=9", &query).unwrap();
        assert_eq!(url, "http://localhost:8000/api/v1/x?a=3&b=2&c=new");
    }

    #[test]
    fn build_url_leaves_path_query_alone_without_params() {
        let url = ok_json("{}").build_url("/x?a=1", &Query::new()).unwrap();
        assert_eq!(url, "http://localhost:8000/api/v1/x?a=1");
    }

    #[test]
    fn build_url_rejects_unparseable_base() {
        let c = BackendApiClient::with_transport(
            ApiConfig::new("not a url"),
            FakeTransport::responding(200, None, ""),
        );
        let err = c.build_url("/x", &Query::new()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn accept_header_always_present() {
        let req = ok_json("{}").build_request("/x", &RequestOptions::new()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("content-type"), None);
        assert!(req.body.is_none());
    }

    #[test]
    fn body_without_content_type_gets_json() {
        let options = RequestOptions::post().body("{}");
        let req = ok_json("{}").build_request("/x", &options).unwrap();
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn explicit_content_type_is_not_duplicated() {
        for name in ["Content-Type", "content-type", "CONTENT-TYPE"] {
            let options = RequestOptions::post()
                .header(name, "text/plain")
                .body("hello");
            let req = ok_json("{}").build_request("/x", &options).unwrap();
            let count = req
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                .count();
            assert_eq!(count, 1, "{name}");
            assert_eq!(req.header("content-type"), Some("text/plain"), "{name}");
        }
    }

    #[test]
    fn caller_headers_are_kept_and_may_replace_accept() {
        let options = RequestOptions::new()
            .header("X-Client", "desktop")
            .header("accept", "text/plain");
        let req = ok_json("{}").build_request("/x", &options).unwrap();
        assert_eq!(req.header("x-client"), Some("desktop"));
        assert_eq!(req.header("Accept"), Some("text/plain"));
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn success_returns_parsed_payload() {
        let payload = ok_json(r#"{"activated":true}"#)
            .request("/x", &RequestOptions::new())
            .unwrap();
        assert_eq!(payload, Some(json!({"activated": true})));
    }

    #[test]
    fn success_without_json_is_absent() {
        let c = client(FakeTransport::responding(204, None, ""));
        assert_eq!(c.request("/x", &RequestOptions::new()).unwrap(), None);
    }

    #[test]
    fn not_found_uses_detail() {
        let c = client(FakeTransport::responding(404, Some(JSON), r#"{"detail":"not found"}"#));
        let err = c.request("/x", &RequestOptions::new()).unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn server_error_without_json_uses_status() {
        let c = client(FakeTransport::responding(500, Some("text/html"), "<h1>boom</h1>"));
        let err = c.request("/x", &RequestOptions::new()).unwrap_err();
        assert_eq!(err.to_string(), "Request failed (HTTP 500)");
    }

    #[test]
    fn malformed_json_propagates_parse_error() {
        let c = ok_json("{oops");
        let err = c.request("/x", &RequestOptions::new()).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn timeout_is_translated() {
        let c = client(FakeTransport::failing(TransportError::Timeout));
        let err = c.request("/x", &RequestOptions::new()).unwrap_err();
        assert_eq!(err.to_string(), "Request timeout while connecting to backend API.");
    }

    #[test]
    fn connect_failure_names_base_url() {
        let c = client(FakeTransport::failing(TransportError::Connect("refused".into())));
        let err = c.request("/x", &RequestOptions::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot connect to backend API at http://localhost:8000/api/v1. Please make sure localhost:8000 is running."
        );
    }

    #[test]
    fn other_transport_errors_keep_message() {
        let c = client(FakeTransport::failing(TransportError::Other("tls handshake".into())));
        let err = c.request("/x", &RequestOptions::new()).unwrap_err();
        assert_eq!(err, ApiError::Transport("tls handshake".to_string()));
    }

    #[test]
    fn check_update_passes_params_as_query() {
        let c = ok_json(r#"{"has_update":false}"#);
        let params = Query::new().param("current_version", "1.0.0").param("platform", "linux");
        c.check_update(&params).unwrap();
        let sent = c.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(
            sent[0].url,
            "http://localhost:8000/api/v1/app/check-update?current_version=1.0.0&platform=linux"
        );
    }

    #[test]
    fn license_status_sends_machine_id() {
        let c = ok_json(r#"{"machine_id":"abc123","activated":false}"#);
        let payload = c.get_license_status("abc123").unwrap();
        assert_eq!(payload.unwrap()["machine_id"], "abc123");
        let sent = c.transport.sent();
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(
            sent[0].url,
            "http://localhost:8000/api/v1/license/status?machine_id=abc123"
        );
        assert!(sent[0].body.is_none());
    }

    #[test]
    fn redeem_posts_json_body() {
        let c = ok_json(r#"{"activated":true}"#);
        let input = RedeemLicense {
            code: "X".to_string(),
            machine_id: "M".to_string(),
        };
        c.redeem_license_code(&input).unwrap();
        let sent = c.transport.sent();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, "http://localhost:8000/api/v1/license/redeem");
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"code":"X","machine_id":"M"}"#));
        assert_eq!(sent[0].header("content-type"), Some("application/json"));
    }

    #[test]
    fn trailing_slash_in_config_is_stripped() {
        let c = BackendApiClient::with_transport(
            ApiConfig::new("http://localhost:8000/api/v1/"),
            FakeTransport::responding(200, None, ""),
        );
        assert_eq!(c.base_url(), BASE);
        let url = c.build_url("/license/status", &Query::new()).unwrap();
        assert_eq!(url, "http://localhost:8000/api/v1/license/status");
    }
}
