//! Step input templates
//!
//! String leaves of a step's input may contain `{{...}}` references:
//!
//! - `{{input.KEY}}`: value from the workflow input
//! - `{{steps.ID.output.PATH...}}`: field of a prior step's output
//! - `{{prev.KEY}}`: field of the most recently completed step's output
//!
//! Inputs are compiled once per step into a [`TemplateValue`] tree and then
//! resolved against the execution's recorded results. Unrecognized
//! references are kept verbatim.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use scholar_agent::JsonMap;

use crate::execution::StepResults;

static TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Invalid template regex"));

/// A parsed `{{...}}` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Input(String),
    StepOutput { step: String, path: Vec<String> },
    Prev(String),
}

impl Reference {
    /// Parse the body of a `{{...}}` placeholder
    pub fn parse(body: &str) -> Option<Self> {
        let body = body.trim();
        if let Some(key) = body.strip_prefix("input.") {
            return Some(Reference::Input(key.to_string()));
        }
        if let Some(rest) = body.strip_prefix("steps.") {
            let mut parts = rest.split('.');
            let step = parts.next().unwrap_or_default().to_string();
            // The segment after the id is the `output` keyword
            let path = parts.skip(1).map(str::to_string).collect();
            return Some(Reference::StepOutput { step, path });
        }
        if let Some(key) = body.strip_prefix("prev.") {
            return Some(Reference::Prev(key.to_string()));
        }
        None
    }

    fn resolve(&self, scope: &Scope<'_>) -> String {
        match self {
            Reference::Input(key) => scope.input.get(key).map(stringify).unwrap_or_default(),
            Reference::StepOutput { step, path } => {
                let Some(result) = scope.results.get(step).filter(|r| r.is_completed()) else {
                    return String::new();
                };
                if result.output.is_empty() {
                    return String::new();
                }
                let mut current = Value::Object(result.output.clone());
                for segment in path {
                    match current {
                        Value::Object(mut map) => current = map.remove(segment).unwrap_or(Value::Null),
                        _ => return String::new(),
                    }
                }
                stringify(&current)
            }
            Reference::Prev(key) => scope
                .results
                .values()
                .rev()
                .find(|r| r.is_completed() && !r.output.is_empty())
                .and_then(|r| r.output.get(key))
                .map(stringify)
                .unwrap_or_default(),
        }
    }
}

/// Strings are inserted as-is, null as nothing, anything else as JSON
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Ref(Reference),
}

/// A string with zero or more embedded references
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in TEMPLATE_REGEX.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let Some(reference) = Reference::parse(&caps[1]) else {
                // Unknown forms stay part of the surrounding literal
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(text[last..whole.start()].to_string()));
            }
            segments.push(Segment::Ref(reference));
            last = whole.end();
        }
        if last < text.len() {
            segments.push(Segment::Literal(text[last..].to_string()));
        }

        Self { segments }
    }

    fn references(&self) -> impl Iterator<Item = &Reference> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Ref(r) => Some(r),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_references(&self) -> bool {
        self.references().next().is_some()
    }

    pub fn render(&self, scope: &Scope<'_>) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Ref(reference) => reference.resolve(scope),
            })
            .collect()
    }
}

/// What references resolve against
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub input: &'a JsonMap,
    pub results: &'a StepResults,
}

/// A compiled input value
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Text(Template),
    List(Vec<TemplateValue>),
    Map(Vec<(String, TemplateValue)>),
    Literal(Value),
}

impl TemplateValue {
    pub fn compile(value: &Value) -> Self {
        match value {
            Value::String(s) => {
                let template = Template::parse(s);
                if template.has_references() {
                    TemplateValue::Text(template)
                } else {
                    TemplateValue::Literal(value.clone())
                }
            }
            Value::Array(items) => TemplateValue::List(items.iter().map(Self::compile).collect()),
            Value::Object(map) => TemplateValue::Map(compile_entries(map)),
            other => TemplateValue::Literal(other.clone()),
        }
    }

    pub fn resolve(&self, scope: &Scope<'_>) -> Value {
        match self {
            TemplateValue::Text(template) => Value::String(template.render(scope)),
            TemplateValue::List(items) => Value::Array(items.iter().map(|v| v.resolve(scope)).collect()),
            TemplateValue::Map(entries) => Value::Object(resolve_entries(entries, scope)),
            TemplateValue::Literal(value) => value.clone(),
        }
    }
}

fn compile_entries(map: &JsonMap) -> Vec<(String, TemplateValue)> {
    map.iter().map(|(k, v)| (k.clone(), TemplateValue::compile(v))).collect()
}

fn resolve_entries(entries: &[(String, TemplateValue)], scope: &Scope<'_>) -> JsonMap {
    entries.iter().map(|(k, v)| (k.clone(), v.resolve(scope))).collect()
}

/// A step's compiled input map
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInput {
    entries: Vec<(String, TemplateValue)>,
}

impl CompiledInput {
    pub fn compile(input: &JsonMap) -> Self {
        Self {
            entries: compile_entries(input),
        }
    }

    pub fn resolve(&self, scope: &Scope<'_>) -> JsonMap {
        let resolved = resolve_entries(&self.entries, scope);
        tracing::debug!("Resolved step input: {}", serde_json::Value::Object(resolved.clone()));
        resolved
    }
}
