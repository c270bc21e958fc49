// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::{constants, CosmosDbBinding, Error, Result};

/// Whether a binding reads from or writes to its collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum BindingDirection {
    #[serde(rename = "in")]
    Input,
    #[serde(rename = "out")]
    Output,
}

impl fmt::Display for BindingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingDirection::Input => f.write_str("input"),
            BindingDirection::Output => f.write_str("output"),
        }
    }
}

/// A binding registered for a function parameter.
#[derive(Clone, Debug)]
pub struct RegisteredBinding {
    pub direction: BindingDirection,
    pub binding: Arc<CosmosDbBinding>,
}

/// The set of Cosmos DB bindings declared by a function, keyed by parameter name.
///
/// Bindings are registered once, typically at startup, and shared read-only afterwards.
///
/// # Examples
///
/// ```rust
/// use azure_data_cosmos_bindings::{BindingDirection, BindingRegistry, CosmosDbBinding};
///
/// let mut registry = BindingRegistry::new();
/// registry
///     .register(
///         "order",
///         BindingDirection::Input,
///         CosmosDbBinding::new("SalesDB", "Orders").with_id("{orderId}"),
///     )
///     .unwrap();
/// assert_eq!(1, registry.len());
/// ```
#[derive(Clone, Debug, Default)]
pub struct BindingRegistry {
    bindings: BTreeMap<String, RegisteredBinding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `binding` for `parameter`.
    ///
    /// Fails with [`Error::DuplicateBinding`] if the parameter already has a binding. The binding
    /// is not validated here; validation happens when it is resolved.
    pub fn register(
        &mut self,
        parameter: impl Into<String>,
        direction: BindingDirection,
        binding: impl Into<Arc<CosmosDbBinding>>,
    ) -> Result<()> {
        let parameter = parameter.into();
        if self.bindings.contains_key(&parameter) {
            return Err(Error::DuplicateBinding(parameter));
        }

        debug!(parameter = %parameter, %direction, "registered cosmos db binding");
        self.bindings.insert(
            parameter,
            RegisteredBinding {
                direction,
                binding: binding.into(),
            },
        );
        Ok(())
    }

    pub fn get(&self, parameter: &str) -> Option<&RegisteredBinding> {
        self.bindings.get(parameter)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over the registered bindings in parameter-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredBinding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a registry from a `function.json` document.
    ///
    /// Every entry of the `bindings` array whose `type` is `cosmosDB` (case-insensitive) is
    /// registered under its `name`; entries of other types are skipped.
    ///
    /// ```rust
    /// use azure_data_cosmos_bindings::BindingRegistry;
    ///
    /// let registry = BindingRegistry::from_function_json(r#"{
    ///     "bindings": [
    ///         { "type": "httpTrigger", "direction": "in", "name": "req" },
    ///         { "type": "cosmosDB", "direction": "out", "name": "doc",
    ///           "databaseName": "ToDoList", "collectionName": "Items" }
    ///     ]
    /// }"#).unwrap();
    /// assert!(registry.get("doc").is_some());
    /// assert!(registry.get("req").is_none());
    /// ```
    pub fn from_function_json(document: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct FunctionDocument {
            #[serde(default)]
            bindings: Vec<Value>,
        }

        #[derive(Deserialize)]
        struct Entry {
            name: String,
            direction: BindingDirection,
            #[serde(flatten)]
            binding: CosmosDbBinding,
        }

        let document: FunctionDocument = serde_json::from_str(document)?;
        let mut registry = Self::new();
        for raw in document.bindings {
            let is_cosmos = raw
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case(constants::BINDING_TYPE));
            if !is_cosmos {
                trace!("skipping non-cosmos binding");
                continue;
            }

            let entry: Entry = serde_json::from_value(raw)?;
            registry.register(entry.name, entry.direction, entry.binding)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_parameter_is_rejected() {
        let mut registry = BindingRegistry::new();
        registry
            .register("doc", BindingDirection::Output, CosmosDbBinding::new("db", "c"))
            .unwrap();
        let err = registry
            .register("doc", BindingDirection::Input, CosmosDbBinding::new("db", "c"))
            .unwrap_err();
        assert_eq!(Error::DuplicateBinding("doc".into()), err);
        assert_eq!(
            BindingDirection::Output,
            registry.get("doc").unwrap().direction
        );
    }

    #[test]
    fn registered_binding_is_shared() {
        let binding = Arc::new(CosmosDbBinding::new("db", "c"));
        let mut registry = BindingRegistry::new();
        registry
            .register("doc", BindingDirection::Input, Arc::clone(&binding))
            .unwrap();
        assert!(Arc::ptr_eq(&binding, &registry.get("doc").unwrap().binding));
    }

    #[test]
    fn iterates_in_name_order() {
        let mut registry = BindingRegistry::new();
        assert!(registry.is_empty());
        for name in ["b", "a", "c"] {
            registry
                .register(name, BindingDirection::Input, CosmosDbBinding::default())
                .unwrap();
        }
        let names: Vec<_> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(vec!["a", "b", "c"], names);
    }

    #[test]
    fn function_json_reads_cosmos_bindings() {
        let registry = BindingRegistry::from_function_json(
            r#"{
                "scriptFile": "index.js",
                "bindings": [
                    { "type": "queueTrigger", "direction": "in", "name": "item" },
                    {
                        "type": "CosmosDB",
                        "direction": "in",
                        "name": "docs",
                        "databaseName": "ToDoItems",
                        "collectionName": "Items",
                        "sqlQuery": "SELECT * FROM c WHERE c.owner = {owner}",
                        "connectionStringSetting": "MyAccount"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(1, registry.len());
        let docs = registry.get("docs").unwrap();
        assert_eq!(BindingDirection::Input, docs.direction);
        assert_eq!("ToDoItems", docs.binding.database_name());
        assert_eq!(Some("MyAccount"), docs.binding.connection_string_setting());
    }

    #[test]
    fn function_json_without_bindings_is_empty() {
        assert!(BindingRegistry::from_function_json("{}")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn function_json_with_bad_direction_fails() {
        let err = BindingRegistry::from_function_json(
            r#"{ "bindings": [ { "type": "cosmosDB", "direction": "sideways", "name": "x" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));
    }

    #[test]
    fn direction_display() {
        assert_eq!("input", BindingDirection::Input.to_string());
        assert_eq!("output", BindingDirection::Output.to_string());
    }
}
