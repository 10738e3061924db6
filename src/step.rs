//! Step definitions and per-step results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HTTP method a step issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP call in a workflow.
///
/// `url`, `headers` and `body` are templates and may reference earlier
/// steps by name, e.g. `{{ login.response.data.token }}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Opaque identifier, copied into the result for correlation
    #[serde(default)]
    pub id: String,

    /// Name used by templates to reference this step's response
    pub name: String,

    /// Target URL template
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// JSON object template for request headers; empty means `{}`
    #[serde(default)]
    pub headers: String,

    /// Body template, sent verbatim for POST
    #[serde(default)]
    pub body: String,
}

impl StepDefinition {
    /// Start building a GET step.
    pub fn get(name: &str, url: &str) -> StepBuilder {
        StepBuilder::new(name, HttpMethod::Get, url)
    }

    /// Start building a POST step.
    pub fn post(name: &str, url: &str) -> StepBuilder {
        StepBuilder::new(name, HttpMethod::Post, url)
    }
}

/// Builder for [`StepDefinition`].
#[derive(Debug, Clone)]
pub struct StepBuilder {
    step: StepDefinition,
}

impl StepBuilder {
    /// Create a new step builder. The id defaults to the name.
    pub fn new(name: &str, method: HttpMethod, url: &str) -> Self {
        Self {
            step: StepDefinition {
                id: name.to_string(),
                name: name.to_string(),
                url: url.to_string(),
                method,
                headers: String::new(),
                body: String::new(),
            },
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.step.id = id.to_string();
        self
    }

    /// Set the raw header template (a JSON object once resolved).
    pub fn headers(mut self, headers: &str) -> Self {
        self.step.headers = headers.to_string();
        self
    }

    /// Set headers from a JSON object. Values may contain placeholders.
    pub fn with_headers(mut self, headers: Value) -> Self {
        self.step.headers = headers.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.step.body = body.to_string();
        self
    }

    pub fn build(self) -> StepDefinition {
        self.step
    }
}

impl From<StepBuilder> for StepDefinition {
    fn from(builder: StepBuilder) -> Self {
        builder.build()
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepStatus {
    /// Parsed JSON response body
    Success { data: Value },

    #[serde(rename = "error")]
    Failure { error: String },
}

/// Result of a single executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_id: String,
    pub step_name: String,

    #[serde(flatten)]
    pub status: StepStatus,

    /// Wall-clock time for resolution and the network call
    pub duration_ms: u64,
}

impl StepResult {
    pub fn success(step: &StepDefinition, data: Value, duration_ms: u64) -> Self {
        Self {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            status: StepStatus::Success { data },
            duration_ms,
        }
    }

    pub fn failure(step: &StepDefinition, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            status: StepStatus::Failure {
                error: error.into(),
            },
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, StepStatus::Success { .. })
    }

    /// Response data, if the step succeeded.
    pub fn data(&self) -> Option<&Value> {
        match &self.status {
            StepStatus::Success { data } => Some(data),
            StepStatus::Failure { .. } => None,
        }
    }

    /// Error message, if the step failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            StepStatus::Success { .. } => None,
            StepStatus::Failure { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_builder() {
        let step = StepDefinition::post("create", "https://example.com/posts")
            .id("node-1")
            .with_headers(json!({"Content-Type": "application/json"}))
            .body(r#"{"title": "foo"}"#)
            .build();

        assert_eq!(step.id, "node-1");
        assert_eq!(step.name, "create");
        assert_eq!(step.method, HttpMethod::Post);
        assert_eq!(step.headers, r#"{"Content-Type":"application/json"}"#);
        assert_eq!(step.body, r#"{"title": "foo"}"#);
    }

    #[test]
    fn test_definition_from_camel_case_json() {
        let step: StepDefinition = serde_json::from_value(json!({
            "id": "1",
            "name": "users",
            "url": "https://example.com/users",
            "method": "POST"
        }))
        .unwrap();

        assert_eq!(step.method, HttpMethod::Post);
        assert!(step.headers.is_empty());
        assert!(step.body.is_empty());
    }

    #[test]
    fn test_result_serialization_shape() {
        let step = StepDefinition::get("users", "https://example.com").build();
        let ok = StepResult::success(&step, json!({"id": 1}), 12);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({
                "stepId": "users",
                "stepName": "users",
                "status": "success",
                "data": {"id": 1},
                "durationMs": 12
            })
        );

        let failed = StepResult::failure(&step, "boom", 3);
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
        assert_eq!(failed.error(), Some("boom"));
        assert!(failed.data().is_none());
    }
}
