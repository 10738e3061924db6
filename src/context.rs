//! Per-run execution context.

use crate::step::StepResult;
use crate::template::{self, ResultLookup};
use std::collections::HashMap;

/// Results recorded during a single workflow run.
///
/// Keeps the ordered history plus a name index used to resolve templates of
/// later steps. A name recorded twice points at the latest result, while
/// both entries stay in the history.
#[derive(Debug, Default)]
pub struct Context {
    /// Results in execution order
    results: Vec<StepResult>,

    /// Step name -> position in `results`
    by_name: HashMap<String, usize>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result and make it addressable by its step name.
    pub fn record(&mut self, result: StepResult) {
        self.by_name.insert(result.step_name.clone(), self.results.len());
        self.results.push(result);
    }

    /// Latest result recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&StepResult> {
        self.by_name.get(name).map(|&index| &self.results[index])
    }

    /// The most recent result.
    pub fn last(&self) -> Option<&StepResult> {
        self.results.last()
    }

    /// All results in execution order.
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    /// Expand placeholders in `template` against the results so far.
    pub fn resolve(&self, template: &str) -> String {
        template::resolve(template, self)
    }

    pub fn into_results(self) -> Vec<StepResult> {
        self.results
    }
}

impl ResultLookup for Context {
    fn lookup(&self, step_name: &str) -> Option<&StepResult> {
        self.get(step_name)
    }
}
