//! Placeholder substitution for step templates.
//!
//! A placeholder has the shape `{{ stepName.response.<path> }}`. The path is
//! walked from the referenced step's result, whose addressable field is
//! `data` (the parsed response body):
//!
//! ```text
//! {{ login.response.data.token }}
//! {{ users.response.data.items[0].id }}
//! ```
//!
//! Resolution never fails. Anything that does not parse as a placeholder,
//! references an unknown or failed step, or walks off the data is left in
//! the output verbatim.

use crate::step::StepResult;
use serde_json::Value;
use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const RESPONSE_PREFIX: &str = "response.";

/// Name-keyed access to results of steps that already ran.
pub trait ResultLookup {
    fn lookup(&self, step_name: &str) -> Option<&StepResult>;
}

impl ResultLookup for HashMap<String, StepResult> {
    fn lookup(&self, step_name: &str) -> Option<&StepResult> {
        self.get(step_name)
    }
}

/// One segment of a placeholder path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Plain object field, e.g. `id`
    Field(String),
    /// Object field followed by an array index, e.g. `users[0]`
    Index { field: String, index: usize },
}

impl PathSegment {
    /// Parse a single dotted-path segment.
    ///
    /// Returns `None` when the segment has the `word[digits]` shape but the
    /// index does not fit in `usize`.
    pub fn parse(raw: &str) -> Option<Self> {
        let Some((field, index)) = split_index_form(raw) else {
            return Some(PathSegment::Field(raw.to_string()));
        };
        let index = index.parse::<usize>().ok()?;
        Some(PathSegment::Index {
            field: field.to_string(),
            index,
        })
    }

    fn apply<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match self {
            PathSegment::Field(name) => value.as_object()?.get(name),
            PathSegment::Index { field, index } => {
                value.as_object()?.get(field)?.as_array()?.get(*index)
            }
        }
    }
}

/// Split `word[digits]` into `("word", "digits")`.
fn split_index_form(raw: &str) -> Option<(&str, &str)> {
    let open = raw.find('[')?;
    let (field, rest) = raw.split_at(open);
    let digits = rest.strip_prefix('[')?.strip_suffix(']')?;
    let is_word = !field.is_empty() && field.chars().all(is_word_char);
    let is_number = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
    (is_word && is_number).then_some((field, digits))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A parsed `{{ step.response.path }}` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub step_name: String,
    /// Path below `response`, never empty
    pub path: Vec<PathSegment>,
}

impl Placeholder {
    /// Parse a placeholder at the start of `text`.
    ///
    /// Returns the placeholder and the byte length it spans, braces included,
    /// or `None` if `text` does not start with a placeholder. A well-shaped
    /// placeholder with an out-of-range index yields `Some((None, span))`.
    fn parse_prefix(text: &str) -> Option<(Option<Self>, usize)> {
        let inner = text.strip_prefix(OPEN)?;
        let end = inner.find(CLOSE)?;
        let expression = inner[..end].trim();
        let span = OPEN.len() + end + CLOSE.len();

        let (step_name, rest) = expression.split_once('.')?;
        if step_name.is_empty() || !step_name.chars().all(is_word_char) {
            return None;
        }
        let path = rest.strip_prefix(RESPONSE_PREFIX)?;
        if path.is_empty() || path.contains(['\n', '\r']) {
            return None;
        }

        let segments: Option<Vec<PathSegment>> = path.split('.').map(PathSegment::parse).collect();
        let placeholder = segments.map(|path| Placeholder {
            step_name: step_name.to_string(),
            path,
        });
        Some((placeholder, span))
    }

    /// Look up the referenced value and render it.
    pub fn resolve<L: ResultLookup + ?Sized>(&self, results: &L) -> Option<String> {
        let data = results.lookup(&self.step_name)?.data()?;

        let (first, rest) = self.path.split_first()?;
        let mut current = enter_result(data, first)?;
        for segment in rest {
            current = segment.apply(current)?;
        }

        Some(render_value(current))
    }
}

/// The first segment addresses the result record, which only exposes `data`.
fn enter_result<'a>(data: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match segment {
        PathSegment::Field(name) if name == "data" => Some(data),
        PathSegment::Index { field, index } if field == "data" => data.as_array()?.get(*index),
        _ => None,
    }
}

/// Render a JSON value as template text: scalars bare, composites as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => value.to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

/// Substitute every resolvable placeholder in `template`.
pub fn resolve<L: ResultLookup + ?Sized>(template: &str, results: &L) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        let candidate = &rest[start..];

        match Placeholder::parse_prefix(candidate) {
            Some((placeholder, span)) => {
                let raw = &candidate[..span];
                match placeholder.and_then(|p| p.resolve(results)) {
                    Some(rendered) => output.push_str(&rendered),
                    None => {
                        tracing::trace!(placeholder = raw, "Leaving placeholder unresolved");
                        output.push_str(raw);
                    }
                }
                rest = &candidate[span..];
            }
            None => {
                // Not a placeholder here; retry from the next brace.
                output.push('{');
                rest = &candidate[1..];
            }
        }
    }

    output.push_str(rest);
    output
}
