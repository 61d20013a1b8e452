//! Transport-neutral delivery request and handler response.

use std::net::IpAddr;

use {
    axum::response::{IntoResponse, Response},
    bytes::Bytes,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
};

/// One delivery as received from the queue daemon.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub remote_addr: IpAddr,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    pub fn new(remote_addr: IpAddr) -> Self {
        Self {
            remote_addr,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a header; invalid names or values are skipped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Header value as text; non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header(header::USER_AGENT.as_str())
    }
}

/// Response produced by a handler chain.
#[derive(Debug, Clone)]
pub struct WorkerResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for WorkerResponse {
    fn default() -> Self {
        Self::ok()
    }
}

impl WorkerResponse {
    /// Empty 200.
    #[must_use]
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    #[must_use]
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Response with a JSON body.
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut response = Self::with_status(status);
        response.body = Bytes::from(value.to_string());
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }

    /// Plain-text response.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        let mut response = Self::with_status(status);
        response.body = Bytes::from(text.into());
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for WorkerResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::net::Ipv4Addr};

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = InboundRequest::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_header("User-Agent", "aws-sqsd/3.0.4")
            .with_header("X-Aws-Sqsd-Msgid", "abc");
        assert_eq!(request.user_agent(), Some("aws-sqsd/3.0.4"));
        assert_eq!(request.header("x-aws-sqsd-msgid"), Some("abc"));
    }

    #[test]
    fn invalid_header_is_skipped() {
        let request =
            InboundRequest::new(IpAddr::V4(Ipv4Addr::LOCALHOST)).with_header("bad header", "x");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn json_response_sets_content_type() {
        let response = WorkerResponse::json(StatusCode::ACCEPTED, &serde_json::json!({"ok": true}));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(&response.body[..], br#"{"ok":true}"#);
    }
}
