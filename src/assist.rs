//! Prompt-driven step generation.
//!
//! Turns a natural-language request ("create a post for user 1") into a
//! partial [`StepDefinition`] using an external text-generation service.
//! Nothing in the executor depends on this module.

use crate::error::AssistError;
use crate::step::{HttpMethod, StepDefinition};
use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::env;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
const FALLBACK_API_KEY_ENV: &str = "API_KEY";
pub const MODEL_ENV: &str = "APIFLOW_ASSIST_MODEL";

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SYSTEM_INSTRUCTION: &str = r#"You are an API configuration assistant. Based on the user's request, reply with a single JSON object of the form { "name": "...", "url": "...", "method": "GET" | "POST", "headers": "...", "body": "..." }.
- "name" is a short descriptive name for the call, using only letters, digits and underscores.
- "url" should point at a real public API such as JSONPlaceholder when one fits.
- "headers" and "body" are JSON documents encoded as strings.
- Reply with the raw JSON object only, without Markdown fences or commentary.

Example request: "Fetch user 1 from JSONPlaceholder"
Example reply: { "name": "get_user_1", "url": "https://jsonplaceholder.typicode.com/users/1", "method": "GET", "headers": "{}", "body": "{}" }"#;

/// Step fields suggested by a generator. Absent fields are left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<HttpMethod>,
    #[serde(default, deserialize_with = "string_or_json")]
    pub headers: Option<String>,
    #[serde(default, deserialize_with = "string_or_json")]
    pub body: Option<String>,
}

impl StepDraft {
    /// Overwrite the fields of `step` that the draft provides.
    pub fn merge_into(self, step: &mut StepDefinition) {
        if let Some(name) = self.name {
            step.name = name;
        }
        if let Some(url) = self.url {
            step.url = url;
        }
        if let Some(method) = self.method {
            step.method = method;
        }
        if let Some(headers) = self.headers {
            step.headers = headers;
        }
        if let Some(body) = self.body {
            step.body = body;
        }
    }

    /// Build a complete step, defaulting missing fields.
    pub fn into_step(self, id: &str) -> StepDefinition {
        let mut step = StepDefinition::get(id, "").build();
        self.merge_into(&mut step);
        step
    }
}

/// Services may return headers/body as nested JSON instead of encoded strings.
fn string_or_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Strip a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    let inner = inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_');
    let inner = inner.trim();
    if inner.is_empty() {
        trimmed
    } else {
        inner
    }
}

/// Parse generator output into a [`StepDraft`].
pub fn parse_step_draft(text: &str) -> Result<StepDraft, AssistError> {
    let json = strip_code_fence(text);
    serde_json::from_str(json).map_err(|e| AssistError::Parse(e.to_string()))
}

/// Produces step drafts from natural-language prompts.
#[async_trait]
pub trait StepGenerator: Send + Sync {
    async fn generate_step(&self, prompt: &str) -> Result<StepDraft, AssistError>;
}

/// Settings for [`GeminiStepGenerator`].
#[derive(Debug, Clone)]
pub struct AssistConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl AssistConfig {
    /// Read the API key from `GEMINI_API_KEY` (or `API_KEY`) and the model
    /// from `APIFLOW_ASSIST_MODEL`.
    pub fn from_env() -> Self {
        let api_key = env::var(API_KEY_ENV)
            .or_else(|_| env::var(FALLBACK_API_KEY_ENV))
            .ok()
            .filter(|key| !key.trim().is_empty());
        let mut config = Self {
            api_key,
            ..Self::default()
        };
        if let Ok(model) = env::var(MODEL_ENV) {
            config.model = model;
        }
        config
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// [`StepGenerator`] backed by the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiStepGenerator {
    config: AssistConfig,
    client: Client,
}

impl GeminiStepGenerator {
    pub fn new(config: AssistConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build assist http client")?;
        Ok(Self { config, client })
    }

    async fn send(&self, api_key: &str, prompt: &str) -> Result<String, AssistError> {
        let url = format!("{}/{}:generateContent", self.config.base_url, self.config.model);
        let request = GenerateRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        tracing::debug!(model = %self.config.model, "Requesting step config");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistError::Request(format!("{:#}", anyhow::Error::new(e))))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AssistError::Request(format!("{:#}", anyhow::Error::new(e))))?;
        if !status.is_success() {
            return Err(AssistError::Request(format!("HTTP {}: {}", status, text)));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| AssistError::Parse(e.to_string()))?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| AssistError::Parse("response contained no candidates".to_string()))
    }
}

#[async_trait]
impl StepGenerator for GeminiStepGenerator {
    async fn generate_step(&self, prompt: &str) -> Result<StepDraft, AssistError> {
        let api_key = self.config.api_key.as_deref().ok_or(AssistError::NotConfigured)?;

        let text = self.send(api_key, prompt).await.inspect_err(|e| {
            tracing::error!(error = %e, "Step generation failed");
        })?;
        parse_step_draft(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Answer a single request with `status` and `body`, reporting the request head.
    async fn serve_once(status: u16, body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/models", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0);
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let _ = tx.send(head);

            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (base_url, rx)
    }

    fn generator(base_url: String) -> GeminiStepGenerator {
        GeminiStepGenerator::new(AssistConfig {
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn reply(text: &str) -> String {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string()
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  ```\n{\"a\": 1}\n```  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("``````"), "``````");
    }

    #[test]
    fn test_parse_step_draft() {
        let draft = parse_step_draft(
            r#"```json
{ "name": "create_post", "url": "https://example.com/posts", "method": "POST", "headers": "{\"Content-Type\": \"application/json\"}", "body": {"title": "foo"} }
```"#,
        )
        .unwrap();

        assert_eq!(draft.name.as_deref(), Some("create_post"));
        assert_eq!(draft.method, Some(HttpMethod::Post));
        assert_eq!(draft.headers.as_deref(), Some(r#"{"Content-Type": "application/json"}"#));
        assert_eq!(draft.body.as_deref(), Some(r#"{"title":"foo"}"#));
    }

    #[test]
    fn test_parse_step_draft_rejects_non_json() {
        let err = parse_step_draft("Sure! Here is your config.").unwrap_err();
        assert!(matches!(err, AssistError::Parse(_)));
    }

    #[test]
    fn test_draft_merge_keeps_missing_fields() {
        let mut step = StepDefinition::post("old", "https://example.com/old")
            .id("node-7")
            .body("{}")
            .build();
        let draft = StepDraft {
            url: Some("https://example.com/new".to_string()),
            ..StepDraft::default()
        };
        draft.merge_into(&mut step);

        assert_eq!(step.id, "node-7");
        assert_eq!(step.name, "old");
        assert_eq!(step.url, "https://example.com/new");
        assert_eq!(step.method, HttpMethod::Post);
    }

    #[test]
    fn test_draft_into_step() {
        let draft = parse_step_draft(r#"{"name": "get_user", "url": "https://example.com/users/1"}"#).unwrap();
        let step = draft.into_step("node-1");
        assert_eq!(step.id, "node-1");
        assert_eq!(step.name, "get_user");
        assert_eq!(step.method, HttpMethod::Get);
    }

    #[tokio::test]
    async fn test_generator_reads_first_candidate() {
        let text = "```json\n{\"name\": \"get_user\", \"url\": \"https://example.com/users/1\", \"method\": \"GET\"}\n```";
        let (base_url, head) = serve_once(200, reply(text)).await;

        let draft = generator(base_url).generate_step("fetch user 1").await.unwrap();
        assert_eq!(draft.name.as_deref(), Some("get_user"));
        assert_eq!(draft.url.as_deref(), Some("https://example.com/users/1"));
        assert_eq!(draft.method, Some(HttpMethod::Get));

        let head = head.await.unwrap();
        assert!(head.starts_with("POST /models/test-model:generateContent HTTP/1.1"), "{head}");
        assert!(head.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
    }

    #[tokio::test]
    async fn test_generator_error_status() {
        let (base_url, _head) = serve_once(500, r#"{"error": "internal"}"#.to_string()).await;

        let err = generator(base_url).generate_step("anything").await.unwrap_err();
        match err {
            AssistError::Request(message) => assert!(message.contains("500"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generator_no_candidates() {
        let (base_url, _head) = serve_once(200, r#"{"candidates": []}"#.to_string()).await;

        let err = generator(base_url).generate_step("anything").await.unwrap_err();
        assert!(matches!(err, AssistError::Parse(ref m) if m.contains("no candidates")));
    }

    #[tokio::test]
    async fn test_generator_non_json_text() {
        let (base_url, _head) = serve_once(200, reply("I cannot help with that.")).await;

        let err = generator(base_url).generate_step("anything").await.unwrap_err();
        assert!(matches!(err, AssistError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_generator() {
        let generator = GeminiStepGenerator::new(AssistConfig::default()).unwrap();
        let err = generator.generate_step("fetch user 1").await.unwrap_err();
        assert!(matches!(err, AssistError::NotConfigured));
    }
}
