//! Workflow definition and builder.

use crate::executor::ExecutionHistory;
use crate::step::{StepBuilder, StepDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Description of what this workflow does
    #[serde(default)]
    pub description: Option<String>,

    /// Steps to execute, in order
    pub steps: Vec<StepDefinition>,
}

impl Workflow {
    /// Create a new workflow with a name.
    pub fn new(name: &str) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// Create an empty workflow.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// Check the definition before running it.
    ///
    /// Templates address steps by name, so names must be non-empty and
    /// unique across the workflow.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Workflow name cannot be empty");
        }

        if self.steps.is_empty() {
            anyhow::bail!("Workflow must have at least one step");
        }

        let mut seen = HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                anyhow::bail!("Step {} has empty name", i);
            }
            if step.url.trim().is_empty() {
                anyhow::bail!("Step {} ({}) has empty url", i, step.name);
            }
            if !seen.insert(step.name.as_str()) {
                anyhow::bail!("Step {} reuses name '{}'; step names must be unique", i, step.name);
            }
        }

        Ok(())
    }

    /// Execute this workflow over the default HTTP transport.
    pub async fn run(&self) -> anyhow::Result<ExecutionHistory> {
        crate::execute(self).await
    }
}

/// Builder for creating workflows.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    /// Create a new workflow builder.
    pub fn new(name: &str) -> Self {
        Self {
            workflow: Workflow::empty(name),
        }
    }

    /// Set the workflow description.
    pub fn description(mut self, desc: &str) -> Self {
        self.workflow.description = Some(desc.to_string());
        self
    }

    /// Add a step to the workflow.
    pub fn add<S: Into<StepDefinition>>(mut self, step: S) -> Self {
        self.workflow.steps.push(step.into());
        self
    }

    /// Add a step builder (convenience).
    pub fn step(self, step: StepBuilder) -> Self {
        self.add(step.build())
    }

    /// Build the workflow.
    pub fn build(self) -> Workflow {
        self.workflow
    }
}

impl From<WorkflowBuilder> for Workflow {
    fn from(builder: WorkflowBuilder) -> Self {
        builder.build()
    }
}
