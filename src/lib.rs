//! # apiflow
//!
//! Chain HTTP calls into workflows, passing response data between steps.
//!
//! Steps run in order. A step's URL, headers and body may reference the
//! parsed JSON response of an earlier step with `{{ stepName.response.<path> }}`.
//! The first failing step halts the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apiflow::{StepDefinition, Workflow};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let workflow = Workflow::new("my-workflow")
//!     .add(StepDefinition::get("user", "https://jsonplaceholder.typicode.com/users/1"))
//!     .add(
//!         StepDefinition::post("post", "https://jsonplaceholder.typicode.com/posts")
//!             .headers(r#"{"Content-Type": "application/json"}"#)
//!             .body(r#"{"userId": "{{ user.response.data.id }}", "title": "hello"}"#),
//!     )
//!     .build();
//!
//! let history = workflow.run().await?;
//! for result in &history.results {
//!     println!("{} took {} ms", result.step_name, result.duration_ms);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## YAML Definition
//!
//! ```yaml
//! name: my-workflow
//! steps:
//!   - name: user
//!     url: https://jsonplaceholder.typicode.com/users/1
//!   - name: post
//!     method: POST
//!     url: https://jsonplaceholder.typicode.com/posts
//!     headers: '{"Content-Type": "application/json"}'
//!     body: '{"userId": "{{ user.response.data.id }}"}'
//! ```

pub mod assist;
mod config;
mod context;
mod error;
mod executor;
mod step;
pub mod template;
mod transport;
mod workflow;
pub mod yaml;

pub use config::{ExecutorConfig, TIMEOUT_ENV, USER_AGENT_ENV};
pub use context::Context;
pub use error::{AssistError, StepError};
pub use executor::{execute, ExecutionHistory, Executor, RunOutcome};
pub use step::{HttpMethod, StepBuilder, StepDefinition, StepResult, StepStatus};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
pub use workflow::{Workflow, WorkflowBuilder};
pub use yaml::{parse_json, parse_yaml};

/// Re-export common types
pub use serde_json::Value;
