//! Per-request state shared by extractors, listeners and the action.
//!
//! Every dispatch owns exactly one [`RequestContext`]; nothing in it is shared
//! with concurrent requests.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::response::HandlerResponse;

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers/cookies before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because path parameter names come from the
/// route table and are cloned on every match.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated header/cookie storage for the hot path
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Inbound request as handed over by the transport
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request target, optionally with a query string
    pub target: String,
    /// Request headers
    pub headers: HeaderVec,
    /// JSON body, if the transport decoded one
    pub body: Option<Value>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: HeaderVec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path component of the target, without the query string
    #[must_use]
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }
}

/// State of one dispatch
#[derive(Debug)]
pub struct RequestContext {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without query string
    pub path: String,
    /// Path parameters captured by the router
    pub path_params: ParamVec,
    /// Query string parameters, in order of appearance
    pub query_params: ParamVec,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    /// Cookies parsed from the Cookie header
    pub cookies: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    attributes: HashMap<String, Value>,
    response: Option<HandlerResponse>,
}

impl RequestContext {
    /// Build the context for a matched request.
    #[must_use]
    pub fn from_request(request: Request, path_params: ParamVec) -> Self {
        let query_params = parse_query_params(&request.target);
        let cookies = parse_cookies(&request.headers);
        let request_id = RequestId::from_header_or_new(
            request
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(REQUEST_ID_HEADER))
                .map(|(_, v)| v.as_str()),
        );
        let path = request.path().to_string();

        Self {
            request_id,
            method: request.method,
            path,
            path_params,
            query_params,
            headers: request.headers,
            cookies,
            body: request.body,
            attributes: HashMap::new(),
            response: None,
        }
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics for duplicate names at different depths.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values of a repeated query parameter, in order
    #[must_use]
    pub fn get_query_values(&self, name: &str) -> Vec<&str> {
        self.query_params
            .iter()
            .filter(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Request-scoped attribute set by a listener or an earlier stage
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    #[must_use]
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    #[must_use]
    pub fn response_mut(&mut self) -> Option<&mut HandlerResponse> {
        self.response.as_mut()
    }

    pub fn set_response(&mut self, response: HandlerResponse) {
        self.response = Some(response);
    }

    #[must_use]
    pub fn take_response(&mut self) -> Option<HandlerResponse> {
        self.response.take()
    }
}

/// Parse query string parameters from a request target, URL-decoded.
#[must_use]
pub fn parse_query_params(target: &str) -> ParamVec {
    match target.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

/// Parse the `cookie` header into name/value pairs.
#[must_use]
pub fn parse_cookies(headers: &HeaderVec) -> HeaderVec {
    headers
        .iter()
        .filter(|(k, _)| k.eq_ignore_ascii_case("cookie"))
        .flat_map(|(_, raw)| raw.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((Arc::from(name), value))
        })
        .collect()
}
