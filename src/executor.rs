//! Workflow execution engine.

use crate::config::ExecutorConfig;
use crate::context::Context;
use crate::error::StepError;
use crate::step::{HttpMethod, StepDefinition, StepResult};
use crate::template::render_value;
use crate::transport::{HttpRequest, HttpTransport, Transport};
use crate::workflow::Workflow;
use anyhow::Result;
use serde_json::Value;
use std::time::Instant;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step succeeded
    Completed,
    /// Step at `index` failed; later steps were not attempted
    Halted { index: usize },
}

/// Ordered results of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionHistory {
    /// One entry per attempted step, in execution order
    pub results: Vec<StepResult>,

    /// Total execution time in milliseconds
    pub total_ms: u64,
}

impl ExecutionHistory {
    pub fn outcome(&self) -> RunOutcome {
        match self.results.last() {
            Some(last) if !last.is_success() => RunOutcome::Halted {
                index: self.results.len() - 1,
            },
            _ => RunOutcome::Completed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == RunOutcome::Completed
    }

    /// The failed step that halted the run, if any.
    pub fn failure(&self) -> Option<&StepResult> {
        self.results.last().filter(|r| !r.is_success())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Runs steps sequentially over a [`Transport`].
///
/// Each step's templates are resolved against the results of the steps
/// before it. The first failure ends the run.
#[derive(Debug, Clone)]
pub struct Executor<T = HttpTransport> {
    transport: T,
}

impl Executor<HttpTransport> {
    /// Executor over a `reqwest` client built from `config`.
    pub fn new(config: &ExecutorConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }
}

impl<T: Transport> Executor<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute `steps` in order, stopping at the first failed step.
    ///
    /// Never fails as a whole: step errors are recorded as failure results,
    /// and the returned history covers exactly the steps that were attempted.
    pub async fn run(&self, steps: &[StepDefinition]) -> ExecutionHistory {
        tracing::info!(steps = steps.len(), "Starting workflow run");

        let start = Instant::now();
        let mut ctx = Context::new();

        for (index, step) in steps.iter().enumerate() {
            tracing::debug!(step = index, name = %step.name, method = %step.method, "Executing step");

            let result = self.run_step(step, &ctx).await;
            let failed = !result.is_success();

            if let Some(error) = result.error() {
                tracing::warn!(step = index, name = %step.name, error, "Step failed, halting workflow");
            } else {
                tracing::debug!(step = index, duration_ms = result.duration_ms, "Step completed");
            }

            ctx.record(result);
            if failed {
                break;
            }
        }

        let total_ms = elapsed_ms(start);
        tracing::info!(attempted = ctx.results().len(), total_ms, "Workflow run finished");

        ExecutionHistory {
            results: ctx.into_results(),
            total_ms,
        }
    }

    async fn run_step(&self, step: &StepDefinition, ctx: &Context) -> StepResult {
        let start = Instant::now();
        match self.call(step, ctx).await {
            Ok(data) => StepResult::success(step, data, elapsed_ms(start)),
            Err(err) => StepResult::failure(step, err.to_string(), elapsed_ms(start)),
        }
    }

    async fn call(&self, step: &StepDefinition, ctx: &Context) -> Result<Value, StepError> {
        let url = ctx.resolve(&step.url);
        let body = ctx.resolve(&step.body);
        let headers = parse_headers(&ctx.resolve(&step.headers))?;

        tracing::debug!(%url, "Sending request");

        let request = HttpRequest {
            method: step.method,
            url,
            headers,
            body: match step.method {
                HttpMethod::Get => None,
                HttpMethod::Post => Some(body),
            },
        };

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(StepError::HttpStatus {
                status: response.status,
                reason: response.reason,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| StepError::ResponseParse(e.to_string()))
    }
}

/// Parse resolved header text into name/value pairs. Empty text means no headers.
fn parse_headers(raw: &str) -> Result<Vec<(String, String)>, StepError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| StepError::HeaderParse(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(StepError::HeaderParse("headers must be a JSON object".to_string()));
    };

    Ok(map
        .iter()
        .map(|(name, value)| (name.clone(), render_value(value)))
        .collect())
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Execute a workflow over the default HTTP transport.
///
/// The transport is configured by [`ExecutorConfig::from_env`]. Fails only if
/// that configuration is invalid or the HTTP client cannot be built; step
/// failures are reported in the returned history.
///
/// # Example
///
/// ```rust,no_run
/// use apiflow::{execute, StepDefinition, Workflow};
///
/// # async fn demo() -> anyhow::Result<()> {
/// let workflow = Workflow::new("example")
///     .add(StepDefinition::get("user", "https://jsonplaceholder.typicode.com/users/1"))
///     .add(StepDefinition::get(
///         "posts",
///         "https://jsonplaceholder.typicode.com/posts?userId={{ user.response.data.id }}",
///     ))
///     .build();
///
/// let history = execute(&workflow).await?;
/// println!("attempted {} steps", history.len());
/// # Ok(())
/// # }
/// ```
pub async fn execute(workflow: &Workflow) -> Result<ExecutionHistory> {
    tracing::info!(workflow = %workflow.name, "Executing workflow");
    let executor = Executor::new(&ExecutorConfig::from_env()?)?;
    Ok(executor.run(&workflow.steps).await)
}
