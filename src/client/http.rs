//! HTTP transport for region-scoped REST endpoints

use super::transport::{add_query_params, Method, Transport};
use crate::error::TransportError;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Per-request timeout; waits are bounded separately by the waiter
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull a human-readable message out of a provider error body
fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return sanitize_for_log(body);
    };

    ["error_msg", "message", "error.message", "errorMessage"]
        .iter()
        .find_map(|path| {
            path.split('.')
                .try_fold(&parsed, |v, part| v.get(part))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| sanitize_for_log(body))
}

/// HTTP client wrapper implementing [`Transport`]
///
/// Request URLs are `{endpoint}/{path}` where `endpoint` is the template with
/// `{service}` and `{region}` substituted.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint_template: String,
    region: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(endpoint_template: &str, region: &str) -> Result<Self> {
        url::Url::parse(&endpoint_template.replace(['{', '}'], ""))
            .with_context(|| format!("Invalid endpoint template: {}", endpoint_template))?;

        let client = Client::builder()
            .user_agent(concat!("regioncloud/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint_template: endpoint_template.trim_end_matches('/').to_string(),
            region: region.to_string(),
            token: None,
        })
    }

    /// Send a bearer token with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the full URL for a service path
    pub fn url(&self, service: &str, path: &str) -> String {
        let base = self
            .endpoint_template
            .replace("{service}", service)
            .replace("{region}", &self.region);
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    async fn send(
        &self,
        method: Method,
        service: &str,
        path: &str,
        params: &Value,
    ) -> Result<Value, TransportError> {
        let mut url = self.url(service, path);
        if method.params_in_query() {
            url = add_query_params(&url, params);
        }
        tracing::debug!("{} {}", method, url);

        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if !method.params_in_query() && !params.is_null() {
            request = request.json(params);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(TransportError::Status {
                code: status.as_u16(),
                message: error_message(&body),
            });
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl Transport for HttpTransport {
    fn call<'a>(
        &'a self,
        method: Method,
        service: &'a str,
        path: &'a str,
        params: &'a Value,
    ) -> BoxFuture<'a, Result<Value, TransportError>> {
        Box::pin(self.send(method, service, path, params))
    }
}
