//! HTTP boundary for step execution.

use crate::config::ExecutorConfig;
use crate::error::StepError;
use crate::step::HttpMethod;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};

/// A fully resolved outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Present only for POST
    pub body: Option<String>,
}

/// Raw response as received; classification happens in the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase, empty when unknown
    pub reason: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends resolved requests.
///
/// Implementations report unreachable hosts, timeouts and invalid headers as
/// errors; any received response, whatever its status, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StepError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(config: &ExecutorConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build http client")?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StepError> {
        let headers = header_map(&request.headers)?;
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut builder = self.http.request(method, &request.url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(transport_error)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// Keep the source chain, which is where reqwest puts the actual cause.
fn transport_error(err: reqwest::Error) -> StepError {
    StepError::Transport(format!("{:#}", anyhow::Error::new(err)))
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, StepError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let invalid = |reason: String| StepError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.append(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_accepts_valid_headers() {
        let map = header_map(&[
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Trace".to_string(), "1".to_string()),
        ])
        .unwrap();
        assert_eq!(map.get("content-type").unwrap(), "application/json");
        assert_eq!(map.get("x-trace").unwrap(), "1");
    }

    #[test]
    fn test_header_map_rejects_bad_name() {
        let err = header_map(&[("bad header".to_string(), "x".to_string())]).unwrap_err();
        assert!(matches!(err, StepError::InvalidHeader { ref name, .. } if name == "bad header"));
    }

    #[test]
    fn test_header_map_rejects_bad_value() {
        let err = header_map(&[("X-Bad".to_string(), "line\nbreak".to_string())]).unwrap_err();
        assert!(matches!(err, StepError::InvalidHeader { .. }));
    }

    #[test]
    fn test_success_range() {
        let response = |status| HttpResponse {
            status,
            reason: String::new(),
            body: String::new(),
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(301).is_success());
        assert!(!response(500).is_success());
    }
}
