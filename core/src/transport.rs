//! Pluggable transport that executes an `HttpRequest`.
//!
//! # Design
//! The client never opens sockets itself; it hands a fully built request to a
//! `Transport` and receives plain response data back. Non-2xx statuses are
//! *not* errors at this layer, only failures that prevented a response.
//! Tests substitute an in-memory transport.

use std::io;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{find_header, HttpRequest, HttpResponse};
use crate::payload::is_json_content_type;

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking [`Transport`] backed by a `ureq` agent.
///
/// The agent enforces a global per-call timeout covering resolve, connect,
/// send and the full body read. The deadline lives inside the call, so it is
/// released whenever `send` returns, successful or not.
///
/// Only JSON bodies are read, without a size cap. Any other body carries no
/// payload and is dropped unread along with the connection.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            // Status interpretation belongs to the client.
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let result = match &request.body {
            Some(body) => {
                let req = builder
                    .body(body.as_bytes())
                    .map_err(|e| TransportError::Other(e.to_string()))?;
                self.agent.run(req)
            }
            None => {
                let req = builder
                    .body(())
                    .map_err(|e| TransportError::Other(e.to_string()))?;
                self.agent.run(req)
            }
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = if is_json_content_type(find_header(&headers, "content-type")) {
            let bytes = response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(classify_body)?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            String::new()
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::HostNotFound => TransportError::Connect("host not found".to_string()),
        ureq::Error::ConnectionFailed => TransportError::Connect("connection failed".to_string()),
        ureq::Error::Io(e) => classify_io(e),
        other => TransportError::Other(other.to_string()),
    }
}

/// Failures after the response head arrived. The server was reached, so
/// nothing here is a connection failure.
fn classify_body(error: ureq::Error) -> TransportError {
    match error {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) if is_timeout(&e) => TransportError::Timeout,
        other => TransportError::Other(other.to_string()),
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn classify_io(error: io::Error) -> TransportError {
    if is_timeout(&error) {
        TransportError::Timeout
    } else {
        TransportError::Connect(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeouts_classify_as_timeout() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(classify_io(err), TransportError::Timeout);
    }

    #[test]
    fn refused_classifies_as_connect() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(classify_io(err), TransportError::Connect(_)));
    }

    #[test]
    fn body_read_errors_are_not_connect_failures() {
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset mid-body");
        assert!(matches!(
            classify_body(ureq::Error::Io(reset)),
            TransportError::Other(msg) if msg.contains("reset mid-body")
        ));
        assert!(matches!(
            classify_body(ureq::Error::BodyExceedsLimit(10)),
            TransportError::Other(_)
        ));
        let slow = io::Error::new(io::ErrorKind::TimedOut, "slow body");
        assert_eq!(classify_body(ureq::Error::Io(slow)), TransportError::Timeout);
    }

    #[test]
    fn host_not_found_classifies_as_connect() {
        assert!(matches!(
            classify(ureq::Error::HostNotFound),
            TransportError::Connect(_)
        ));
    }

    #[test]
    fn other_errors_keep_their_message() {
        let err = classify(ureq::Error::BadUri("nope".to_string()));
        assert!(matches!(err, TransportError::Other(msg) if msg.contains("nope")));
    }
}
