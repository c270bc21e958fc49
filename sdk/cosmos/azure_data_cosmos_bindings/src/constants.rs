// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Well-known names used by Cosmos DB bindings.

/// The `type` value that identifies a Cosmos DB binding in a `function.json` document.
pub const BINDING_TYPE: &str = "cosmosDB";

/// The application setting read when a binding does not name its own connection setting.
pub const DEFAULT_CONNECTION_SETTING: &str = "CosmosDBConnection";

/// Setting consulted after [`DEFAULT_CONNECTION_SETTING`] for hosts configured with the older name.
pub const LEGACY_CONNECTION_SETTING: &str = "AzureWebJobsCosmosDBConnectionStringName";

/// Prefix given to SQL parameters generated from `{name}` tokens.
pub(crate) const SQL_PARAMETER_PREFIX: char = '@';
