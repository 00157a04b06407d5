//! Response representation and the response-writing seam.
//!
//! Actions either return a value, which is handed to the configured
//! [`ResponseWriter`], or return nothing and write
//! [`RequestContext::response_mut`](crate::context::RequestContext::response_mut)
//! themselves.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::context::{HeaderVec, RequestContext};

/// Response produced by a dispatch
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers (stack-allocated for ≤16 headers)
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returned when the action produced no value and wrote nothing
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204, HeaderVec::new(), Value::Null)
    }

    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Turns an action's return value into the response.
pub trait ResponseWriter: Send + Sync {
    fn write(&self, ctx: &mut RequestContext, value: Value) -> anyhow::Result<()>;
}

/// Default writer: serializes the value as a JSON body.
///
/// A status or headers the action already set on the context are kept;
/// only the body is replaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonResponseWriter;

impl ResponseWriter for JsonResponseWriter {
    fn write(&self, ctx: &mut RequestContext, value: Value) -> anyhow::Result<()> {
        match ctx.response_mut() {
            Some(existing) => {
                existing.body = value;
                if existing.get_header("content-type").is_none() {
                    existing.set_header("content-type", "application/json".to_string());
                }
            }
            None => ctx.set_response(HandlerResponse::json(200, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Request;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_json_writer_keeps_status_set_by_action() {
        let mut ctx = RequestContext::from_request(Request::new(Method::POST, "/pets"), Default::default());
        ctx.set_response(HandlerResponse::new(201, HeaderVec::new(), Value::Null));

        JsonResponseWriter
            .write(&mut ctx, json!({"id": 7}))
            .unwrap_or_else(|e| panic!("write failed: {e}"));

        let resp = ctx.take_response().unwrap_or_else(HandlerResponse::no_content);
        assert_eq!(resp.status, 201);
        assert_eq!(resp.body, json!({"id": 7}));
        assert_eq!(resp.get_header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_json_writer_defaults_to_ok() {
        let mut ctx = RequestContext::from_request(Request::new(Method::GET, "/"), Default::default());
        JsonResponseWriter
            .write(&mut ctx, json!("hello"))
            .unwrap_or_else(|e| panic!("write failed: {e}"));
        let resp = ctx.take_response().unwrap_or_else(HandlerResponse::no_content);
        assert_eq!(resp.status, 200);
    }
}
