// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Binding expressions embedded in auto-resolve properties.
//!
//! A binding expression is a string with two kinds of tokens:
//!
//! * `{name}` or `{path.to.name}` is replaced with a value from the invocation's [`BindingData`].
//! * `%name%` is replaced with an application setting read from a [`SettingsSource`].
//!
//! `{{`, `}}` and `%%` produce a literal `{`, `}` and `%`.

use serde_json::{Map, Value};
use std::fmt;
use tracing::trace;

use crate::{settings::SettingsSource, Error, Result};

/// Per-invocation data used to fill `{…}` tokens.
///
/// This is a JSON object. Dotted token names walk nested objects, so `{Query.id}` reads
/// `data["Query"]["id"]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingData(Map<String, Value>);

impl BindingData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, returning the updated binding data.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Looks up a dotted path. Top-level keys containing dots are matched before walking.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl TryFrom<Value> for BindingData {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidDocument(format!(
                "binding data must be a JSON object, got {other}"
            ))),
        }
    }
}

impl From<Map<String, Value>> for BindingData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A piece of a parsed [`BindingExpression`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Text copied to the output unchanged.
    Literal(String),
    /// A `{name}` token.
    BindingData(String),
    /// A `%name%` token.
    Setting(String),
}

/// A parsed binding expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingExpression {
    text: String,
    segments: Vec<Segment>,
}

impl BindingExpression {
    /// Parses `text` into literal text and tokens.
    ///
    /// Fails with [`Error::MalformedExpression`] when a `{` or `%` is never closed, or when a
    /// token name is empty or contains characters other than ASCII letters, digits, `_`, `-` and `.`.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = |reason: &str| Error::MalformedExpression {
            expression: text.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' | '%' if chars.peek() == Some(&c) => {
                    chars.next();
                    literal.push(c);
                }
                '}' => {
                    // A lone '}' is kept as text; '}}' collapses to one.
                    if chars.peek() == Some(&'}') {
                        chars.next();
                    }
                    literal.push('}');
                }
                '{' | '%' => {
                    let close = if c == '{' { '}' } else { '%' };
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == close {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(malformed(&format!("'{c}' is never closed")));
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(malformed("empty token"));
                    }
                    if !name
                        .chars()
                        .all(|n| n.is_ascii_alphanumeric() || matches!(n, '_' | '-' | '.'))
                    {
                        return Err(malformed(&format!("invalid token name '{name}'")));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(if c == '{' {
                        Segment::BindingData(name.to_string())
                    } else {
                        Segment::Setting(name.to_string())
                    });
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            text: text.to_string(),
            segments,
        })
    }

    /// The unparsed expression.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` if the expression contains no tokens.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Substitutes every token and returns the resulting string.
    pub fn resolve(&self, data: &BindingData, settings: &dyn SettingsSource) -> Result<String> {
        let mut resolved = String::with_capacity(self.text.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => resolved.push_str(text),
                Segment::BindingData(name) => {
                    resolved.push_str(&render_binding_value(name, lookup(data, name)?)?)
                }
                Segment::Setting(name) => resolved.push_str(&settings.require(name)?),
            }
        }
        trace!(expression = %self.text, "resolved binding expression");
        Ok(resolved)
    }
}

impl fmt::Display for BindingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub(crate) fn lookup<'a>(data: &'a BindingData, name: &str) -> Result<&'a Value> {
    data.get(name)
        .ok_or_else(|| Error::MissingBindingData(name.to_string()))
}

/// Renders a scalar binding value the way it should appear inside a string.
pub(crate) fn render_binding_value(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::UnsupportedBindingValue(name.to_string())),
    }
}
