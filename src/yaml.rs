//! Workflow definition loading.
//!
//! YAML is the primary format; JSON is accepted by `parse_yaml` too, and
//! `.json` files are parsed strictly by `load_file`.

use crate::Workflow;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a workflow from YAML string.
///
/// # Example
///
/// ```rust
/// use apiflow::parse_yaml;
///
/// let yaml = r#"
/// name: my-workflow
/// steps:
///   - name: user
///     url: https://jsonplaceholder.typicode.com/users/1
///   - name: posts
///     url: "https://jsonplaceholder.typicode.com/posts?userId={{ user.response.data.id }}"
/// "#;
///
/// let workflow = parse_yaml(yaml).unwrap();
/// assert_eq!(workflow.name, "my-workflow");
/// assert_eq!(workflow.steps.len(), 2);
/// ```
pub fn parse_yaml(yaml: &str) -> Result<Workflow> {
    let workflow: Workflow = serde_yaml::from_str(yaml).context("Failed to parse workflow YAML")?;

    workflow.validate()?;

    Ok(workflow)
}

/// Parse a workflow exported as JSON, e.g. the step list saved by an editor.
pub fn parse_json(json: &str) -> Result<Workflow> {
    let workflow: Workflow = serde_json::from_str(json).context("Failed to parse workflow JSON")?;
    workflow.validate()?;
    Ok(workflow)
}

/// Load a workflow definition from disk.
///
/// `.json` files go through the strict JSON parser, anything else is read
/// as YAML.
///
/// ```rust,no_run
/// use apiflow::yaml::load_file;
///
/// let workflow = load_file("workflow.yaml")?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_file(path: impl AsRef<Path>) -> Result<Workflow> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json { parse_json(&content) } else { parse_yaml(&content) };
    parsed.with_context(|| format!("Invalid workflow file: {}", path.display()))
}
