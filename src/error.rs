//! Error types for step execution and config generation.

use thiserror::Error;

/// Reasons a single step can fail.
///
/// Every variant is caught at the step boundary and recorded as a
/// [`StepStatus::Failure`](crate::StepStatus::Failure); none escapes
/// [`Executor::run`](crate::Executor::run).
#[derive(Debug, Error)]
pub enum StepError {
    /// Resolved header template is not a JSON object.
    #[error("Invalid headers JSON: {0}")]
    HeaderParse(String),

    /// Header name or value rejected by the HTTP layer.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The endpoint could not be reached (DNS, connect, timeout, bad URL).
    #[error("{0}")]
    Transport(String),

    /// Response status outside the 2xx range.
    #[error("HTTP error! status: {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    /// A 2xx response whose body is not JSON.
    #[error("Invalid JSON response: {0}")]
    ResponseParse(String),
}

/// Errors from the prompt-to-step generator.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("API key is not configured")]
    NotConfigured,

    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Could not parse generated step config: {0}")]
    Parse(String),
}
