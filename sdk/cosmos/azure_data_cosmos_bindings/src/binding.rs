// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query::SqlParameter;

#[cfg(doc)]
use crate::{BindingRegistry, BindingResolver};

/// Configuration that binds a function parameter or return value to a Cosmos DB collection.
///
/// A `CosmosDbBinding` is pure metadata. It performs no validation and no I/O; it is handed to a
/// [`BindingRegistry`] once, and a [`BindingResolver`] reads it on every invocation to produce a
/// [`ResolvedBinding`](crate::ResolvedBinding).
///
/// The database and collection names are fixed once the binding is constructed, either through
/// [`CosmosDbBinding::new()`] or through [`CosmosDbBinding::builder()`]. All other properties can be
/// changed with the `with_*` methods, each of which touches exactly one property.
///
/// # Examples
///
/// ```rust
/// use azure_data_cosmos_bindings::CosmosDbBinding;
///
/// let binding = CosmosDbBinding::new("SalesDB", "Orders")
///     .with_create_if_not_exists(true)
///     .with_collection_throughput(400)
///     .with_partition_key("/region");
///
/// assert_eq!("SalesDB", binding.database_name());
/// assert_eq!(Some("/region"), binding.partition_key());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CosmosDbBinding {
    database_name: String,
    collection_name: String,
    create_if_not_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    connection_string_setting: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    partition_key: Option<String>,
    collection_throughput: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql_query: Option<String>,
    use_multiple_write_locations: bool,
    use_default_json_serialization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    preferred_locations: Option<String>,
    #[serde(skip)]
    sql_query_parameters: Vec<SqlParameter>,
}

impl CosmosDbBinding {
    /// Creates a binding to the given database and collection, with every other property at its default.
    ///
    /// Both names may contain binding expressions such as `{tenant}` or `%DatabaseSetting%`.
    pub fn new(database_name: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            collection_name: collection_name.into(),
            ..Default::default()
        }
    }

    /// Creates a new [`CosmosDbBindingBuilder`] that can be used to construct a [`CosmosDbBinding`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// let binding = azure_data_cosmos_bindings::CosmosDbBinding::builder()
    ///     .database_name("ToDoItems")
    ///     .collection_name("Items")
    ///     .build();
    /// ```
    pub fn builder() -> CosmosDbBindingBuilder {
        CosmosDbBindingBuilder::default()
    }

    /// The database name. May contain binding expressions.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// The collection name. May contain binding expressions.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Whether the collection is created when it does not exist. Only used by output bindings.
    pub fn create_if_not_exists(&self) -> bool {
        self.create_if_not_exists
    }

    /// The name of the application setting holding the connection string, if overridden.
    pub fn connection_string_setting(&self) -> Option<&str> {
        self.connection_string_setting.as_deref()
    }

    /// The id of the single document an input binding reads.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The partition key.
    ///
    /// On an output binding with [`create_if_not_exists()`](Self::create_if_not_exists) this is the
    /// partition key path of the new collection (e.g. `/region`). On an input binding it is the
    /// partition key value used to look up the document.
    pub fn partition_key(&self) -> Option<&str> {
        self.partition_key.as_deref()
    }

    /// The throughput of a collection created by this binding. Zero means "service default".
    pub fn collection_throughput(&self) -> i32 {
        self.collection_throughput
    }

    /// The query run by an input binding.
    pub fn sql_query(&self) -> Option<&str> {
        self.sql_query.as_deref()
    }

    /// Whether the client is configured for an account with multiple write regions.
    pub fn use_multiple_write_locations(&self) -> bool {
        self.use_multiple_write_locations
    }

    /// Whether the process-wide default JSON serializer settings apply to this binding.
    pub fn use_default_json_serialization(&self) -> bool {
        self.use_default_json_serialization
    }

    /// Comma-separated list of preferred regions, e.g. `"East US,West US"`.
    pub fn preferred_locations(&self) -> Option<&str> {
        self.preferred_locations.as_deref()
    }

    /// Parameters supplied alongside [`sql_query()`](Self::sql_query) by the host rather than by the author.
    pub fn sql_query_parameters(&self) -> &[SqlParameter] {
        &self.sql_query_parameters
    }

    /// Sets whether an output binding creates the collection when it does not exist.
    pub fn with_create_if_not_exists(mut self, create_if_not_exists: bool) -> Self {
        self.create_if_not_exists = create_if_not_exists;
        self
    }

    /// Sets the name of the application setting holding the connection string.
    pub fn with_connection_string_setting(mut self, setting: impl Into<String>) -> Self {
        self.connection_string_setting = Some(setting.into());
        self
    }

    /// Sets the id of the document an input binding reads. May contain binding expressions.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the partition key path (output) or value (input). May contain binding expressions.
    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = Some(partition_key.into());
        self
    }

    /// Sets the throughput of a collection created by an output binding.
    pub fn with_collection_throughput(mut self, throughput: i32) -> Self {
        self.collection_throughput = throughput;
        self
    }

    /// Sets the query an input binding runs. May contain binding expressions.
    pub fn with_sql_query(mut self, query: impl Into<String>) -> Self {
        self.sql_query = Some(query.into());
        self
    }

    /// Sets whether the account has multiple write regions.
    pub fn with_use_multiple_write_locations(mut self, enabled: bool) -> Self {
        self.use_multiple_write_locations = enabled;
        self
    }

    /// Sets whether the process-wide default JSON serializer settings apply.
    pub fn with_use_default_json_serialization(mut self, enabled: bool) -> Self {
        self.use_default_json_serialization = enabled;
        self
    }

    /// Sets the comma-separated list of preferred regions. May contain binding expressions.
    pub fn with_preferred_locations(mut self, locations: impl Into<String>) -> Self {
        self.preferred_locations = Some(locations.into());
        self
    }

    /// Sets the parameters supplied by the host alongside the query.
    pub(crate) fn with_sql_query_parameters(
        mut self,
        parameters: impl IntoIterator<Item = SqlParameter>,
    ) -> Self {
        self.sql_query_parameters = parameters.into_iter().collect();
        self
    }

    /// Returns the raw value of a string-valued property, before any resolution.
    ///
    /// Identity properties always return `Some`, even when empty.
    pub fn property(&self, property: BindingProperty) -> Option<&str> {
        match property {
            BindingProperty::DatabaseName => Some(self.database_name()),
            BindingProperty::CollectionName => Some(self.collection_name()),
            BindingProperty::ConnectionStringSetting => self.connection_string_setting(),
            BindingProperty::Id => self.id(),
            BindingProperty::PartitionKey => self.partition_key(),
            BindingProperty::SqlQuery => self.sql_query(),
            BindingProperty::PreferredLocations => self.preferred_locations(),
        }
    }
}

/// Builder used to construct a [`CosmosDbBinding`].
///
/// Obtain a [`CosmosDbBindingBuilder`] by calling [`CosmosDbBinding::builder()`]. This is the only
/// way, besides [`CosmosDbBinding::new()`], to assign the database and collection names.
#[derive(Default)]
pub struct CosmosDbBindingBuilder(CosmosDbBinding);

impl CosmosDbBindingBuilder {
    /// Sets the database name. May contain binding expressions.
    pub fn database_name(mut self, database_name: impl Into<String>) -> Self {
        self.0.database_name = database_name.into();
        self
    }

    /// Sets the collection name. May contain binding expressions.
    pub fn collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.0.collection_name = collection_name.into();
        self
    }

    /// Sets whether an output binding creates the collection when it does not exist.
    pub fn create_if_not_exists(mut self, create_if_not_exists: bool) -> Self {
        self.0.create_if_not_exists = create_if_not_exists;
        self
    }

    /// Sets the name of the application setting holding the connection string.
    pub fn connection_string_setting(mut self, setting: impl Into<String>) -> Self {
        self.0.connection_string_setting = Some(setting.into());
        self
    }

    /// Sets the id of the document an input binding reads.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.0.id = Some(id.into());
        self
    }

    /// Sets the partition key path (output) or value (input).
    pub fn partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.0.partition_key = Some(partition_key.into());
        self
    }

    /// Sets the throughput of a collection created by an output binding.
    pub fn collection_throughput(mut self, throughput: i32) -> Self {
        self.0.collection_throughput = throughput;
        self
    }

    /// Sets the query an input binding runs.
    pub fn sql_query(mut self, query: impl Into<String>) -> Self {
        self.0.sql_query = Some(query.into());
        self
    }

    /// Sets whether the account has multiple write regions.
    pub fn use_multiple_write_locations(mut self, enabled: bool) -> Self {
        self.0.use_multiple_write_locations = enabled;
        self
    }

    /// Sets whether the process-wide default JSON serializer settings apply.
    pub fn use_default_json_serialization(mut self, enabled: bool) -> Self {
        self.0.use_default_json_serialization = enabled;
        self
    }

    /// Sets the comma-separated list of preferred regions.
    pub fn preferred_locations(mut self, locations: impl Into<String>) -> Self {
        self.0.preferred_locations = Some(locations.into());
        self
    }

    /// Builds a [`CosmosDbBinding`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> CosmosDbBinding {
        self.0.clone()
    }
}

/// The string-valued properties of a [`CosmosDbBinding`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingProperty {
    DatabaseName,
    CollectionName,
    ConnectionStringSetting,
    Id,
    PartitionKey,
    SqlQuery,
    PreferredLocations,
}

/// How a resolver treats the value of a [`BindingProperty`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    /// The value may contain `{…}` and `%…%` tokens that are substituted per invocation.
    AutoResolve,
    /// The value names an application setting that holds a connection string.
    ConnectionSetting,
}

impl BindingProperty {
    /// Every property, in declaration order.
    pub const ALL: [BindingProperty; 7] = [
        BindingProperty::DatabaseName,
        BindingProperty::CollectionName,
        BindingProperty::ConnectionStringSetting,
        BindingProperty::Id,
        BindingProperty::PartitionKey,
        BindingProperty::SqlQuery,
        BindingProperty::PreferredLocations,
    ];

    /// How a resolver treats the value of this property.
    pub fn kind(self) -> PropertyKind {
        match self {
            BindingProperty::ConnectionStringSetting => PropertyKind::ConnectionSetting,
            _ => PropertyKind::AutoResolve,
        }
    }

    /// Whether the property is resolved through a [`SqlResolutionPolicy`](crate::SqlResolutionPolicy)
    /// instead of plain substitution.
    pub fn has_resolution_policy(self) -> bool {
        matches!(self, BindingProperty::SqlQuery)
    }

    /// The property name as it appears in host documentation and error messages.
    pub fn name(self) -> &'static str {
        match self {
            BindingProperty::DatabaseName => "DatabaseName",
            BindingProperty::CollectionName => "CollectionName",
            BindingProperty::ConnectionStringSetting => "ConnectionStringSetting",
            BindingProperty::Id => "Id",
            BindingProperty::PartitionKey => "PartitionKey",
            BindingProperty::SqlQuery => "SqlQuery",
            BindingProperty::PreferredLocations => "PreferredLocations",
        }
    }
}

impl fmt::Display for BindingProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
