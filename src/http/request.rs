use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthToken;
use crate::error::{Result, SuiteError};

use super::method::HttpMethod;

/// A single call against the booking API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach the session token the way the booking API expects it.
    pub fn token(self, token: &AuthToken) -> Self {
        self.header("Cookie", token.cookie())
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).map_err(SuiteError::Serialize)?);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_is_sent_as_cookie() {
        let request = ApiRequest::put("/booking/1").token(&AuthToken::new("abc123"));
        assert_eq!(
            request.headers,
            vec![("Cookie".to_string(), "token=abc123".to_string())]
        );
    }

    #[test]
    fn json_body_is_captured() {
        let request = ApiRequest::post("/auth")
            .json(&json!({ "username": "admin" }))
            .unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.body, Some(json!({ "username": "admin" })));
    }
}
