// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Turns a registered [`CosmosDbBinding`] into concrete values for a single invocation.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    binding::{BindingProperty, PropertyKind},
    constants,
    expression::{BindingData, BindingExpression},
    query::{CosmosDbSqlResolutionPolicy, SqlParameter, SqlQuerySpec, SqlResolutionPolicy},
    settings::SettingsSource,
    BindingDirection, BindingRegistry, ConnectionString, CosmosDbBinding, Error, Result,
};

/// Settings used when an output binding creates its collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerProvisioning {
    /// Partition key path of the new collection, e.g. `/region`.
    pub partition_key_path: Option<String>,
    /// Provisioned throughput, or `None` for the service default.
    pub throughput: Option<i32>,
}

/// The values of a [`CosmosDbBinding`] after every expression has been resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedBinding {
    pub direction: BindingDirection,
    pub database_name: String,
    pub collection_name: String,
    pub id: Option<String>,
    pub partition_key: Option<String>,
    pub query: Option<SqlQuerySpec>,
    pub connection: ConnectionString,
    pub preferred_locations: Vec<String>,
    pub use_multiple_write_locations: bool,
    pub use_default_json_serialization: bool,
    /// Present only for output bindings with `create_if_not_exists` set.
    pub provisioning: Option<ContainerProvisioning>,
}

/// Resolves bindings against invocation data and application settings.
///
/// All validation of a [`CosmosDbBinding`] happens here.
#[derive(Clone)]
pub struct BindingResolver {
    settings: Arc<dyn SettingsSource>,
    sql_policy: Arc<dyn SqlResolutionPolicy>,
}

impl std::fmt::Debug for BindingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingResolver")
            .field("sql_policy", &self.sql_policy)
            .finish_non_exhaustive()
    }
}

impl BindingResolver {
    /// Creates a resolver reading settings from `settings`, using [`CosmosDbSqlResolutionPolicy`] for queries.
    pub fn new(settings: impl SettingsSource + 'static) -> Self {
        Self {
            settings: Arc::new(settings),
            sql_policy: Arc::new(CosmosDbSqlResolutionPolicy),
        }
    }

    /// Replaces the policy used to resolve `sql_query`.
    pub fn with_sql_policy(mut self, policy: Arc<dyn SqlResolutionPolicy>) -> Self {
        self.sql_policy = policy;
        self
    }

    /// Resolves the binding registered for `parameter`.
    pub fn resolve(
        &self,
        registry: &BindingRegistry,
        parameter: &str,
        data: &BindingData,
    ) -> Result<ResolvedBinding> {
        let registered = registry
            .get(parameter)
            .ok_or_else(|| Error::UnknownBinding(parameter.to_string()))?;
        debug!(parameter, "resolving cosmos db binding");
        self.resolve_binding(registered.direction, &registered.binding, data)
    }

    /// Resolves the binding registered for `parameter`, adding query parameters supplied by the host.
    ///
    /// The parameters are attached to a per-invocation copy of the binding; the registered binding is
    /// not changed. They are appended to the resolved query unless the resolution policy already
    /// produced a parameter with the same name.
    pub fn resolve_with_query_parameters(
        &self,
        registry: &BindingRegistry,
        parameter: &str,
        data: &BindingData,
        query_parameters: impl IntoIterator<Item = SqlParameter>,
    ) -> Result<ResolvedBinding> {
        let registered = registry
            .get(parameter)
            .ok_or_else(|| Error::UnknownBinding(parameter.to_string()))?;
        let binding = registered
            .binding
            .as_ref()
            .clone()
            .with_sql_query_parameters(query_parameters);
        debug!(
            parameter,
            query_parameters = binding.sql_query_parameters().len(),
            "resolving cosmos db binding with host query parameters"
        );
        self.resolve_binding(registered.direction, &binding, data)
    }

    /// Resolves a single binding.
    pub fn resolve_binding(
        &self,
        direction: BindingDirection,
        binding: &CosmosDbBinding,
        data: &BindingData,
    ) -> Result<ResolvedBinding> {
        validate(direction, binding)?;

        let database_name = self
            .resolve_property(binding, BindingProperty::DatabaseName, data)?
            .unwrap_or_default();
        if database_name.is_empty() {
            return Err(Error::MissingIdentity(BindingProperty::DatabaseName.name()));
        }
        let collection_name = self
            .resolve_property(binding, BindingProperty::CollectionName, data)?
            .unwrap_or_default();
        if collection_name.is_empty() {
            return Err(Error::MissingIdentity(
                BindingProperty::CollectionName.name(),
            ));
        }

        let id = self.resolve_property(binding, BindingProperty::Id, data)?;
        let partition_key = self.resolve_property(binding, BindingProperty::PartitionKey, data)?;
        let query = self.resolve_query(binding, data)?;
        let preferred_locations = self
            .resolve_property(binding, BindingProperty::PreferredLocations, data)?
            .map(|locations| parse_preferred_locations(&locations))
            .unwrap_or_default();
        let connection = self.connection(binding)?;

        let provisioning = match direction {
            BindingDirection::Output if binding.create_if_not_exists() => {
                Some(ContainerProvisioning {
                    partition_key_path: partition_key.clone(),
                    throughput: Some(binding.collection_throughput()).filter(|t| *t > 0),
                })
            }
            _ => {
                if binding.collection_throughput() != 0 {
                    warn!(
                        throughput = binding.collection_throughput(),
                        "collection throughput is ignored unless CreateIfNotExists is set on an output binding"
                    );
                }
                None
            }
        };

        debug!(
            database = %database_name,
            collection = %collection_name,
            %direction,
            "resolved cosmos db binding"
        );

        Ok(ResolvedBinding {
            direction,
            database_name,
            collection_name,
            id,
            partition_key,
            query,
            connection,
            preferred_locations,
            use_multiple_write_locations: binding.use_multiple_write_locations(),
            use_default_json_serialization: binding.use_default_json_serialization(),
            provisioning,
        })
    }

    /// Substitutes the tokens of an auto-resolve property, returning `None` if it is unset.
    ///
    /// Properties with their own resolution policy and connection settings are returned as written.
    fn resolve_property(
        &self,
        binding: &CosmosDbBinding,
        property: BindingProperty,
        data: &BindingData,
    ) -> Result<Option<String>> {
        let Some(raw) = binding.property(property) else {
            return Ok(None);
        };
        match property.kind() {
            PropertyKind::AutoResolve if !property.has_resolution_policy() => {
                BindingExpression::parse(raw)?
                    .resolve(data, self.settings.as_ref())
                    .map(Some)
            }
            _ => Ok(Some(raw.to_string())),
        }
    }

    fn resolve_query(
        &self,
        binding: &CosmosDbBinding,
        data: &BindingData,
    ) -> Result<Option<SqlQuerySpec>> {
        let Some(raw) = binding.sql_query() else {
            return Ok(None);
        };
        let expression = BindingExpression::parse(raw)?;
        let mut spec = self
            .sql_policy
            .resolve(&expression, data, self.settings.as_ref())?;
        spec.merge_parameters(binding.sql_query_parameters());
        Ok(Some(spec))
    }

    /// Reads and parses the connection string the binding points at.
    fn connection(&self, binding: &CosmosDbBinding) -> Result<ConnectionString> {
        let value = match binding.property(BindingProperty::ConnectionStringSetting) {
            Some(setting) if !setting.is_empty() => self.settings.require(setting)?,
            _ => self
                .settings
                .get(constants::DEFAULT_CONNECTION_SETTING)
                .or_else(|| self.settings.get(constants::LEGACY_CONNECTION_SETTING))
                .ok_or_else(|| {
                    Error::MissingSetting(constants::DEFAULT_CONNECTION_SETTING.to_string())
                })?,
        };
        value.parse()
    }
}

/// Checks the combinations of properties that can be rejected before any expression is resolved.
fn validate(direction: BindingDirection, binding: &CosmosDbBinding) -> Result<()> {
    if binding.collection_throughput() < 0 {
        return Err(Error::InvalidThroughput(binding.collection_throughput()));
    }

    match direction {
        BindingDirection::Input => {
            if binding.create_if_not_exists() {
                return Err(Error::InvalidForDirection {
                    property: "CreateIfNotExists",
                    direction,
                });
            }
            if binding.id().is_some() && binding.sql_query().is_some() {
                return Err(Error::ConflictingInput);
            }
        }
        BindingDirection::Output => {
            if binding.id().is_some() {
                return Err(Error::InvalidForDirection {
                    property: BindingProperty::Id.name(),
                    direction,
                });
            }
            if binding.sql_query().is_some() {
                return Err(Error::InvalidForDirection {
                    property: BindingProperty::SqlQuery.name(),
                    direction,
                });
            }
        }
    }
    Ok(())
}

/// Splits a comma-separated region list, dropping blank entries.
pub(crate) fn parse_preferred_locations(locations: &str) -> Vec<String> {
    locations
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapSettings;
    use serde_json::json;

    const CONNECTION: &str = "AccountEndpoint=https://account.documents.azure.com:443/;AccountKey=a2V5;";

    fn resolver() -> BindingResolver {
        BindingResolver::new(MapSettings::from_iter([
            (constants::DEFAULT_CONNECTION_SETTING, CONNECTION),
            ("Orders", "AccountEndpoint=https://orders.documents.azure.com/;AccountKey=b3JkZXJz"),
            ("Region", "West US"),
        ]))
    }

    #[test]
    fn resolves_expressions_from_data_and_settings() {
        let binding = CosmosDbBinding::new("{tenant}", "Orders")
            .with_id("{orderId}")
            .with_partition_key("{region}")
            .with_preferred_locations("East US, %Region%,,");
        let data = BindingData::new()
            .with("tenant", "contoso")
            .with("orderId", 17)
            .with("region", "emea");

        let resolved = resolver()
            .resolve_binding(BindingDirection::Input, &binding, &data)
            .unwrap();

        assert_eq!("contoso", resolved.database_name);
        assert_eq!("Orders", resolved.collection_name);
        assert_eq!(Some("17".to_string()), resolved.id);
        assert_eq!(Some("emea".to_string()), resolved.partition_key);
        assert_eq!(vec!["East US", "West US"], resolved.preferred_locations);
        assert!(resolved.query.is_none());
        assert!(resolved.provisioning.is_none());
        assert_eq!(
            Some("account.documents.azure.com"),
            resolved.connection.account_endpoint.host_str()
        );
    }

    #[test]
    fn named_connection_setting_is_used() {
        let binding =
            CosmosDbBinding::new("db", "coll").with_connection_string_setting("Orders");
        let resolved = resolver()
            .resolve_binding(BindingDirection::Output, &binding, &BindingData::new())
            .unwrap();
        assert_eq!("b3JkZXJz", resolved.connection.account_key.secret());
    }

    #[test]
    fn legacy_connection_setting_is_fallback() {
        let resolver = BindingResolver::new(MapSettings::from_iter([(
            constants::LEGACY_CONNECTION_SETTING,
            CONNECTION,
        )]));
        assert!(resolver
            .resolve_binding(
                BindingDirection::Input,
                &CosmosDbBinding::new("db", "coll"),
                &BindingData::new()
            )
            .is_ok());
    }

    #[test]
    fn missing_connection_setting_fails() {
        let err = BindingResolver::new(MapSettings::new())
            .resolve_binding(
                BindingDirection::Input,
                &CosmosDbBinding::new("db", "coll"),
                &BindingData::new(),
            )
            .unwrap_err();
        assert_eq!(
            Error::MissingSetting(constants::DEFAULT_CONNECTION_SETTING.into()),
            err
        );
    }

    #[test]
    fn empty_identity_fails() {
        let resolver = resolver();
        let err = resolver
            .resolve_binding(
                BindingDirection::Input,
                &CosmosDbBinding::default(),
                &BindingData::new(),
            )
            .unwrap_err();
        assert_eq!(Error::MissingIdentity("DatabaseName"), err);

        let err = resolver
            .resolve_binding(
                BindingDirection::Input,
                &CosmosDbBinding::new("db", "{coll}"),
                &BindingData::new().with("coll", ""),
            )
            .unwrap_err();
        assert_eq!(Error::MissingIdentity("CollectionName"), err);
    }

    #[test]
    fn id_and_query_conflict() {
        let binding = CosmosDbBinding::new("db", "coll")
            .with_id("1")
            .with_sql_query("SELECT * FROM c");
        let err = resolver()
            .resolve_binding(BindingDirection::Input, &binding, &BindingData::new())
            .unwrap_err();
        assert_eq!(Error::ConflictingInput, err);
    }

    #[test]
    fn create_if_not_exists_on_input_fails() {
        let binding = CosmosDbBinding::new("db", "coll").with_create_if_not_exists(true);
        let err = resolver()
            .resolve_binding(BindingDirection::Input, &binding, &BindingData::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidForDirection { .. }));
    }

    #[test]
    fn query_on_output_fails() {
        let binding = CosmosDbBinding::new("db", "coll").with_sql_query("SELECT * FROM c");
        assert!(resolver()
            .resolve_binding(BindingDirection::Output, &binding, &BindingData::new())
            .is_err());
    }

    #[test]
    fn id_on_output_fails() {
        let binding = CosmosDbBinding::new("db", "coll").with_id("{id}");
        let err = resolver()
            .resolve_binding(
                BindingDirection::Output,
                &binding,
                &BindingData::new().with("id", "1"),
            )
            .unwrap_err();
        assert_eq!(
            Error::InvalidForDirection {
                property: "Id",
                direction: BindingDirection::Output,
            },
            err
        );
    }

    #[test]
    fn negative_throughput_fails() {
        let binding = CosmosDbBinding::new("db", "coll")
            .with_create_if_not_exists(true)
            .with_collection_throughput(-1);
        assert_eq!(
            Error::InvalidThroughput(-1),
            resolver()
                .resolve_binding(BindingDirection::Output, &binding, &BindingData::new())
                .unwrap_err()
        );
    }

    #[test]
    fn output_provisioning() {
        let binding = CosmosDbBinding::new("SalesDB", "Orders")
            .with_create_if_not_exists(true)
            .with_collection_throughput(400)
            .with_partition_key("/region");
        let resolved = resolver()
            .resolve_binding(BindingDirection::Output, &binding, &BindingData::new())
            .unwrap();
        assert_eq!(
            Some(ContainerProvisioning {
                partition_key_path: Some("/region".into()),
                throughput: Some(400),
            }),
            resolved.provisioning
        );
    }

    #[test]
    fn zero_throughput_means_service_default() {
        let binding = CosmosDbBinding::new("db", "coll").with_create_if_not_exists(true);
        let resolved = resolver()
            .resolve_binding(BindingDirection::Output, &binding, &BindingData::new())
            .unwrap();
        assert_eq!(None, resolved.provisioning.unwrap().throughput);
    }

    #[test]
    fn throughput_without_create_is_ignored() {
        let binding = CosmosDbBinding::new("db", "coll").with_collection_throughput(400);
        let resolved = resolver()
            .resolve_binding(BindingDirection::Output, &binding, &BindingData::new())
            .unwrap();
        assert!(resolved.provisioning.is_none());
    }

    #[test]
    fn query_is_parameterized_and_host_parameters_merged() {
        let binding = CosmosDbBinding::new("db", "coll")
            .with_sql_query("SELECT * FROM c WHERE c.owner = {owner} AND c.kind = @kind");
        let mut registry = BindingRegistry::new();
        registry
            .register("items", BindingDirection::Input, binding.clone())
            .unwrap();
        let data = BindingData::new().with("owner", "alice");

        let query = resolver()
            .resolve_with_query_parameters(
                &registry,
                "items",
                &data,
                [
                    SqlParameter::new("@kind", "task"),
                    SqlParameter::new("@owner", "ignored"),
                ],
            )
            .unwrap()
            .query
            .unwrap();

        assert_eq!(
            "SELECT * FROM c WHERE c.owner = @owner AND c.kind = @kind",
            query.query
        );
        assert_eq!(json!("alice"), query.parameter("@owner").unwrap().value);
        assert_eq!(json!("task"), query.parameter("@kind").unwrap().value);
        assert_eq!(2, query.parameters.len());

        let registered = registry.get("items").unwrap();
        assert!(registered.binding.sql_query_parameters().is_empty());
        assert_eq!(&binding, registered.binding.as_ref());
    }

    #[test]
    fn host_parameters_for_unknown_parameter_fail() {
        let err = resolver()
            .resolve_with_query_parameters(
                &BindingRegistry::new(),
                "missing",
                &BindingData::new(),
                [SqlParameter::new("@a", 1)],
            )
            .unwrap_err();
        assert_eq!(Error::UnknownBinding("missing".into()), err);
    }

    #[derive(Debug)]
    struct UppercasePolicy;

    impl SqlResolutionPolicy for UppercasePolicy {
        fn resolve(
            &self,
            expression: &BindingExpression,
            data: &BindingData,
            settings: &dyn SettingsSource,
        ) -> Result<SqlQuerySpec> {
            Ok(SqlQuerySpec::new(
                expression.resolve(data, settings)?.to_uppercase(),
            ))
        }
    }

    #[test]
    fn custom_sql_policy() {
        let binding = CosmosDbBinding::new("db", "coll").with_sql_query("select * from {c}");
        let query = resolver()
            .with_sql_policy(Arc::new(UppercasePolicy))
            .resolve_binding(
                BindingDirection::Input,
                &binding,
                &BindingData::new().with("c", "items"),
            )
            .unwrap()
            .query
            .unwrap();
        assert_eq!("SELECT * FROM ITEMS", query.query);
    }

    #[test]
    fn resolve_does_not_mutate_registered_binding() {
        let binding = CosmosDbBinding::new("{db}", "coll").with_id("{id}");
        let mut registry = BindingRegistry::new();
        registry
            .register("doc", BindingDirection::Input, binding.clone())
            .unwrap();

        let data = BindingData::new().with("db", "a").with("id", "1");
        resolver().resolve(&registry, "doc", &data).unwrap();

        assert_eq!(&binding, registry.get("doc").unwrap().binding.as_ref());
    }

    #[test]
    fn unknown_parameter_fails() {
        let err = resolver()
            .resolve(&BindingRegistry::new(), "missing", &BindingData::new())
            .unwrap_err();
        assert_eq!(Error::UnknownBinding("missing".into()), err);
    }

    #[test]
    fn preferred_locations_parsing() {
        assert_eq!(
            vec!["East US", "West Europe"],
            parse_preferred_locations(" East US ,West Europe,")
        );
        assert!(parse_preferred_locations(" , ").is_empty());
    }
}
