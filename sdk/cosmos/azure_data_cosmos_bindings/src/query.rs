// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! SQL query resolution for input bindings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::{
    constants::SQL_PARAMETER_PREFIX,
    expression::{lookup, BindingData, BindingExpression, Segment},
    settings::SettingsSource,
    Result,
};

/// A named parameter of a Cosmos DB SQL query.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SqlParameter {
    /// The parameter name, including the leading `@`.
    pub name: String,
    pub value: Value,
}

impl SqlParameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A query and its parameters, in the shape the Cosmos DB query API accepts.
///
/// # Examples
///
/// ```rust
/// use azure_data_cosmos_bindings::SqlQuerySpec;
///
/// let query = SqlQuerySpec::new("SELECT * FROM c WHERE c.id = @id").with_parameter("@id", "42");
/// assert_eq!(
///     r#"{"query":"SELECT * FROM c WHERE c.id = @id","parameters":[{"name":"@id","value":"42"}]}"#,
///     serde_json::to_string(&query).unwrap()
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SqlQuerySpec {
    pub query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<SqlParameter>,
}

impl SqlQuerySpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: Vec::new(),
        }
    }

    /// Adds a parameter, returning the updated query.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(SqlParameter::new(name, value));
        self
    }

    /// Gets a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&SqlParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Appends `parameters` whose names are not already present.
    pub(crate) fn merge_parameters<'a>(
        &mut self,
        parameters: impl IntoIterator<Item = &'a SqlParameter>,
    ) {
        for parameter in parameters {
            if self.parameter(&parameter.name).is_none() {
                self.parameters.push(parameter.clone());
            }
        }
    }
}

impl From<&str> for SqlQuerySpec {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for SqlQuerySpec {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

/// Turns the `sql_query` expression of a binding into an executable query.
///
/// A resolver holds one policy and uses it for every binding. Supply a custom policy with
/// [`BindingResolver::with_sql_policy()`](crate::BindingResolver::with_sql_policy) to change how
/// binding data reaches the query.
pub trait SqlResolutionPolicy: Send + Sync + fmt::Debug {
    fn resolve(
        &self,
        expression: &BindingExpression,
        data: &BindingData,
        settings: &dyn SettingsSource,
    ) -> Result<SqlQuerySpec>;
}

/// The default [`SqlResolutionPolicy`].
///
/// Each `{name}` token becomes a parameter reference and the binding value is attached as a
/// parameter with its JSON type intact. Binding data never appears in the query text. `%name%`
/// tokens are replaced with the setting value.
///
/// Parameter names are `@` followed by the token name with every character outside
/// `[A-Za-z0-9_]` replaced by `_`. A token starting with a digit gets a leading `_`. When two
/// different tokens map to the same name, later ones get a `_1`, `_2`, ... suffix. A token that
/// appears more than once reuses its parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct CosmosDbSqlResolutionPolicy;

impl SqlResolutionPolicy for CosmosDbSqlResolutionPolicy {
    fn resolve(
        &self,
        expression: &BindingExpression,
        data: &BindingData,
        settings: &dyn SettingsSource,
    ) -> Result<SqlQuerySpec> {
        let mut spec = SqlQuerySpec::default();
        let mut token_parameters: HashMap<&str, String> = HashMap::new();
        for segment in expression.segments() {
            match segment {
                Segment::Literal(text) => spec.query.push_str(text),
                Segment::Setting(name) => spec.query.push_str(&settings.require(name)?),
                Segment::BindingData(name) => {
                    if let Some(parameter_name) = token_parameters.get(name.as_str()) {
                        spec.query.push_str(parameter_name);
                        continue;
                    }

                    let value = lookup(data, name)?.clone();
                    let parameter_name = unique_parameter_name(&spec, name);
                    spec.query.push_str(&parameter_name);
                    spec.parameters
                        .push(SqlParameter::new(parameter_name.clone(), value));
                    token_parameters.insert(name.as_str(), parameter_name);
                }
            }
        }

        debug!(
            parameters = spec.parameters.len(),
            "resolved sql query expression"
        );
        Ok(spec)
    }
}

/// Builds a parameter name for `token` that is a valid identifier and not yet used by `spec`.
fn unique_parameter_name(spec: &SqlQuerySpec, token: &str) -> String {
    let mut base = String::with_capacity(token.len() + 2);
    base.push(SQL_PARAMETER_PREFIX);
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        base.push('_');
    }
    base.extend(token.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        }
    }));

    if spec.parameter(&base).is_none() {
        return base;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{base}_{suffix}");
        if spec.parameter(&candidate).is_none() {
            return candidate;
        }
        suffix += 1;
    }
}
