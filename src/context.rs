//! Per-request context handed to the service chain.

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Immutable snapshot of the inbound request.
///
/// A context is built once per request and passed by reference into every
/// stage of a service's pipeline. Shared services never store it, so
/// concurrent requests served by the same instance cannot observe each
/// other's headers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    client: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, client: Option<SocketAddr>) -> Self {
        Self { headers, client }
    }

    /// Value of header `name` when present.
    ///
    /// Header names are case-insensitive. Bytes outside visible ASCII are
    /// decoded as latin-1, so every present header yields a value.
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers.get(name).map(|v| match v.to_str() {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => Cow::Owned(v.as_bytes().iter().map(|&b| char::from(b)).collect()),
        })
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn client(&self) -> Option<SocketAddr> {
        self.client
    }

    /// Caller's IP address, or `"unknown"` when the connection info is absent.
    pub fn client_host(&self) -> String {
        self.client
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-debugging", HeaderValue::from_static("trace-me"));

        let ctx = RequestContext::new(headers, None);
        assert_eq!(ctx.header("X-Debugging").as_deref(), Some("trace-me"));
        assert_eq!(ctx.header("debugging"), None);
    }

    #[test]
    fn test_client_host() {
        let ctx = RequestContext::new(HeaderMap::new(), Some("10.1.2.3:5555".parse().unwrap()));
        assert_eq!(ctx.client_host(), "10.1.2.3");
        assert_eq!(RequestContext::default().client_host(), "unknown");
    }

    #[test]
    fn test_non_ascii_header_is_decoded_as_latin1() {
        let mut headers = HeaderMap::new();
        headers.insert("debugging", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let ctx = RequestContext::new(headers, None);
        assert_eq!(ctx.header("debugging").as_deref(), Some("caf\u{e9}"));
    }
}
