//! Variable resolution: time windows and template placeholders.
//!
//! Placeholders use the dashboard template syntax: `$name`, `${name}` and
//! `${name:format}` with `format` one of `csv`, `json`, `pipe`, `regex`,
//! `distributed` or `raw`. List values are joined with `|` unless a format
//! says otherwise. Substitution is textual: the bound value is rendered into
//! the string that holds the placeholder, never spliced in as a typed value.
//!
//! Names starting with `__` (`$__interval`, `$__rate_interval`, ...) are
//! evaluated by the backend itself and are left in place unless bound.
//! Parameters declared verbatim (shell commands) keep every unbound `$`
//! reference as written.

use debugkit_core::{Params, TaskSchema, TimeRange, TimeWindow, ValidationError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)(?::([A-Za-z]+))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("placeholder pattern is valid")
});

/// Variable values supplied by the caller, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableBinding(HashMap<String, Value>);

impl VariableBinding {
    /// An empty binding
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable
    #[must_use]
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a variable
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) {
        self.0.insert(name.into(), value.into());
    }

    /// Value of a variable
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Number of variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no variables are bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Value>> for VariableBinding {
    fn from(values: HashMap<String, Value>) -> Self {
        Self(values)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableBinding {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Pipe,
    Csv,
    Json,
    Regex,
    Distributed,
}

impl Format {
    fn parse(name: &str, format: Option<&str>) -> Result<Self, ValidationError> {
        match format {
            None | Some("pipe" | "raw") => Ok(Self::Pipe),
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            Some("regex") => Ok(Self::Regex),
            Some("distributed") => Ok(Self::Distributed),
            Some(other) => Err(ValidationError::UnsupportedVariableFormat {
                name: name.to_string(),
                format: other.to_string(),
            }),
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn render(name: &str, value: &Value, format: Format) -> String {
    let Value::Array(items) = value else {
        return match format {
            Format::Json => value.to_string(),
            Format::Regex => regex::escape(&text(value)),
            _ => text(value),
        };
    };

    let parts: Vec<String> = items.iter().map(text).collect();
    match format {
        Format::Pipe => parts.join("|"),
        Format::Csv => parts.join(","),
        Format::Json => value.to_string(),
        Format::Regex if parts.len() == 1 => regex::escape(&parts[0]),
        Format::Regex => {
            let escaped: Vec<String> = parts.iter().map(|p| regex::escape(p)).collect();
            format!("({})", escaped.join("|"))
        }
        Format::Distributed => parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                if i == 0 {
                    part.clone()
                } else {
                    format!("{name}={part}")
                }
            })
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn placeholder<'t>(caps: &Captures<'t>) -> Option<(&'t str, Option<&'t str>)> {
    if let Some(name) = caps.get(1) {
        return Some((name.as_str(), caps.get(2).map(|m| m.as_str())));
    }
    caps.get(3).map(|name| (name.as_str(), None))
}

/// What to do with a placeholder that has no binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unbound {
    Reject,
    Keep,
}

fn expand(input: &str, bindings: &VariableBinding, unbound: Unbound) -> Result<String, ValidationError> {
    if !input.contains('$') {
        return Ok(input.to_string());
    }

    let mut output = String::with_capacity(input.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(input) {
        let (Some(whole), Some((name, format))) = (caps.get(0), placeholder(&caps)) else {
            continue;
        };
        output.push_str(&input[last..whole.start()]);
        match bindings.get(name) {
            Some(value) => output.push_str(&render(name, value, Format::parse(name, format)?)),
            None if unbound == Unbound::Keep || name.starts_with("__") => {
                output.push_str(whole.as_str());
            }
            None => return Err(ValidationError::unbound_variable(name)),
        }
        last = whole.end();
    }
    output.push_str(&input[last..]);
    Ok(output)
}

fn expand_value(value: &Value, bindings: &VariableBinding, unbound: Unbound) -> Result<Value, ValidationError> {
    match value {
        Value::String(s) => expand(s, bindings, unbound).map(Value::String),
        Value::Array(items) => items
            .iter()
            .map(|item| expand_value(item, bindings, unbound))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| -> Result<(String, Value), ValidationError> {
                Ok((key.clone(), expand_value(value, bindings, unbound)?))
            })
            .collect::<Result<Params, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// Replace every placeholder in `input`
pub fn substitute_str(input: &str, bindings: &VariableBinding) -> Result<String, ValidationError> {
    expand(input, bindings, Unbound::Reject)
}

/// Replace only the bound placeholders in `input`, keeping any other `$` text
pub fn substitute_bound_str(input: &str, bindings: &VariableBinding) -> Result<String, ValidationError> {
    expand(input, bindings, Unbound::Keep)
}

/// Replace placeholders in every string nested inside `value`
pub fn substitute_value(value: &Value, bindings: &VariableBinding) -> Result<Value, ValidationError> {
    expand_value(value, bindings, Unbound::Reject)
}

/// Resolves the time range and template variables of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableResolver {
    default_duration_minutes: u32,
}

impl Default for VariableResolver {
    fn default() -> Self {
        Self::new(60)
    }
}

impl VariableResolver {
    /// Create a resolver using `default_duration_minutes` when a call gives no window
    #[must_use]
    pub fn new(default_duration_minutes: u32) -> Self {
        Self {
            default_duration_minutes,
        }
    }

    /// Normalize a time window into a range
    pub fn resolve_time_range(&self, window: &TimeWindow) -> Result<TimeRange, ValidationError> {
        window.resolve(self.default_duration_minutes)
    }

    /// Substitute template variables into parameters.
    ///
    /// Parameters the schema declares verbatim only get their bound
    /// placeholders replaced; every other parameter must resolve fully.
    pub fn substitute(
        &self,
        schema: &TaskSchema,
        params: &Params,
        bindings: &VariableBinding,
    ) -> Result<Params, ValidationError> {
        params
            .iter()
            .map(|(key, value)| -> Result<(String, Value), ValidationError> {
                let unbound = if schema.is_verbatim(key) {
                    Unbound::Keep
                } else {
                    Unbound::Reject
                };
                Ok((key.clone(), expand_value(value, bindings, unbound)?))
            })
            .collect()
    }
}
