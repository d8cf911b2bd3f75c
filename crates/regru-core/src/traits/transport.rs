// # Transport Trait
//
// Defines the interface for executing one HTTP request attempt.
//
// ## Implementations
//
// - reqwest over TLS: `regru-http` crate
// - Scripted test doubles: `regru-core/tests/common`
//
// ## Usage
//
// ```rust,ignore
// use regru_core::traits::{HttpRequest, Transport};
//
// let request = HttpRequest::post("https://api.reg.ru/api/regru", "action=nop");
// let body = transport.send(&request)?;
// ```

use crate::error::TransportError;

/// Form content type used for POST bodies
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET (no body)
    Get,
    /// POST with a pre-encoded body
    Post,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Pre-encoded body (POST only)
    pub body: Option<String>,
    /// Extra headers, in the order they are sent
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// GET request without a body
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// POST request with a form-encoded body
    ///
    /// `Content-Type` defaults to `application/x-www-form-urlencoded` unless
    /// a header of that name is added later.
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body.into()),
            headers: Vec::new(),
        }
    }

    /// Add an extra header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Headers to send, including the POST content-type default
    pub fn effective_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        if self.method == Method::Post && self.header("Content-Type").is_none() {
            headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
        }
        headers
    }
}

/// Trait for HTTP transport implementations
///
/// A transport performs exactly ONE attempt per call and classifies any
/// failure. Retrying is owned by [`RetryPolicy`](crate::RetryPolicy), never
/// by the transport.
///
/// # Thread Safety
///
/// Implementations must be stateless per call (no mutable connection field)
/// so one client can be used from several threads at once. A shared HTTP
/// client object is fine as long as its configuration is fixed after
/// construction.
///
/// # Contract
///
/// - Returns the raw response body as text, whatever the HTTP status
/// - Opens its own connection for the call; nothing is pooled across calls
/// - Maps connection refused to [`ConnectionFailure::Refused`]
///   (retriable); reset, dropped connection and timeouts to their
///   non-retriable kinds
///
/// [`ConnectionFailure::Refused`]: crate::ConnectionFailure::Refused
pub trait Transport: Send + Sync {
    /// Execute one request attempt
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: the response body
    /// - `Err(TransportError)`: classified connection failure
    fn send(&self, request: &HttpRequest) -> Result<String, TransportError>;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &HttpRequest) -> Result<String, TransportError> {
        (**self).send(request)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<String, TransportError> {
        (**self).send(request)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}
