use crate::error::QueryError;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A request against the service root.
///
/// `path` is either relative to the root (`Customers(Id=1)`) or an absolute
/// continuation link, and is already in wire form: key values arrive with
/// their path delimiters escaped. `query` holds raw, unencoded option pairs;
/// the transport percent-encodes those.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string().into_bytes());
        self.with_header("Content-Type", "application/json")
    }

    /// Path plus unencoded query string, as it would read in a log line.
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Non-success responses as the error the caller sees.
    pub fn into_failure(self) -> QueryError {
        QueryError::TransportFailure {
            status: self.status,
            body: self.body_text(),
        }
    }
}

/// Sends one request and returns the raw response.
///
/// Implementations return non-success statuses as `Ok` responses; a 401 is
/// retried inside the implementation with a refreshed credential before it
/// reaches the caller. Only I/O failures become `Err`, as
/// `TransportFailure { status: 0, .. }`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, QueryError>;
}

#[cfg(test)]
mod transport_tests {
    use super::*;

    #[test]
    fn test_target_joins_raw_query() {
        let request = HttpRequest::get("Customers").with_query(vec![
            ("cross-company".into(), "true".into()),
            ("$filter".into(), "Name eq 'A&B'".into()),
        ]);
        assert_eq!(
            request.target(),
            "Customers?cross-company=true&$filter=Name eq 'A&B'"
        );
        assert_eq!(HttpRequest::get("Customers").target(), "Customers");
    }

    #[test]
    fn test_response_helpers() {
        let mut response = HttpResponse::new(404, "not here");
        response
            .headers
            .push(("Content-Type".into(), "text/plain".into()));
        assert!(!response.is_success());
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(
            response.into_failure(),
            QueryError::TransportFailure {
                status: 404,
                body: "not here".into()
            }
        );
    }
}
