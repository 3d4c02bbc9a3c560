use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use odata_query::{HttpRequest, HttpResponse, Method, QueryError, Transport};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const ODATA_VERSION: &str = "OData-Version";

/// `Transport` over reqwest with bearer authentication.
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
    tokens: Arc<dyn TokenProvider>,
    max_auth_retries: u32,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        // Without the trailing slash `join` would replace the last segment.
        let mut root = config.base_url.clone();
        if !root.ends_with('/') {
            root.push('/');
        }
        let base = Url::parse(&root).context(format!("Invalid base URL: {}", config.base_url))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base,
            tokens,
            max_auth_retries: config.max_auth_retries,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Relative paths hang off the service root; continuation links are
    /// already absolute.
    pub fn resolve_url(&self, request: &HttpRequest) -> Result<Url, QueryError> {
        let parsed = if request.path.starts_with("http://") || request.path.starts_with("https://") {
            Url::parse(&request.path)
        } else {
            self.base.join(&request.path)
        };
        let mut url = parsed.map_err(|e| QueryError::TransportFailure {
            status: 0,
            body: format!("invalid request path {}: {e}", request.path),
        })?;

        if !request.query.is_empty() {
            let mut raw = url.query().map(str::to_string).unwrap_or_default();
            for (name, value) in &request.query {
                if !raw.is_empty() {
                    raw.push('&');
                }
                raw.push_str(&escape_component(name));
                raw.push('=');
                raw.push_str(&escape_component(value));
            }
            // Url encodes spaces, quotes and the rest of the query set.
            url.set_query(Some(&raw));
        }
        Ok(url)
    }

    async fn dispatch(
        &self,
        request: &HttpRequest,
        url: Url,
        token: &str,
    ) -> Result<HttpResponse, QueryError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(ODATA_VERSION, "4.0");
        if !request
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(ACCEPT.as_str()))
        {
            builder = builder.header(ACCEPT, "application/json");
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(io_failure)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(io_failure)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn io_failure(e: reqwest::Error) -> QueryError {
    QueryError::TransportFailure {
        status: 0,
        body: e.to_string(),
    }
}

/// Escapes the characters that would split or corrupt a query component.
fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '+' => out.push_str("%2B"),
            '#' => out.push_str("%23"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(method = request.method.as_str(), path = %request.path))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, QueryError> {
        let url = self.resolve_url(&request)?;
        let mut retries = 0;
        let mut force_refresh = false;

        loop {
            let token = self
                .tokens
                .token(force_refresh)
                .await
                .map_err(|e| QueryError::TransportFailure {
                    status: 0,
                    body: format!("credential unavailable: {e:#}"),
                })?;

            debug!(url = %url, attempt = retries + 1, "Sending request");
            let response = self.dispatch(&request, url.clone(), &token).await?;

            if response.status == 401 && retries < self.max_auth_retries {
                retries += 1;
                force_refresh = true;
                warn!(
                    retries,
                    max_auth_retries = self.max_auth_retries,
                    "Unauthorized - retrying with refreshed token"
                );
                continue;
            }

            if !response.is_success() {
                warn!(
                    status = response.status,
                    body = %response.body_text(),
                    "Request failed with non-success status"
                );
            }
            return Ok(response);
        }
    }
}
