// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Error types raised while registering and resolving Cosmos DB bindings.
//!
//! [`CosmosDbBinding`](crate::CosmosDbBinding) itself never fails; every error here comes from
//! the registry, the resolver, or one of the parsers they use.

use crate::BindingDirection;

/// A specialized [`Result`](std::result::Result) type for binding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when resolving a binding against invocation data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A binding expression could not be parsed.
    #[error("malformed binding expression '{expression}': {reason}")]
    MalformedExpression { expression: String, reason: String },

    /// A `{name}` token referenced binding data that was not supplied.
    #[error("no binding data named '{0}'")]
    MissingBindingData(String),

    /// A `{name}` token referenced binding data that cannot be rendered into a string.
    #[error("binding data '{0}' must be a string, number or boolean")]
    UnsupportedBindingValue(String),

    /// A `%name%` token or connection setting referenced an application setting that does not exist.
    #[error("application setting '{0}' is not defined")]
    MissingSetting(String),

    /// The connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// The database or collection name is empty after resolution.
    #[error("the '{0}' property of a Cosmos DB binding must be set")]
    MissingIdentity(&'static str),

    /// An input binding specified both a document id and a query.
    #[error("only one of 'Id' and 'SqlQuery' can be specified on an input binding")]
    ConflictingInput,

    /// A property was set that has no meaning for the binding direction.
    #[error("'{property}' cannot be used on an {direction} binding")]
    InvalidForDirection {
        property: &'static str,
        direction: BindingDirection,
    },

    /// The collection throughput is negative.
    #[error("collection throughput must not be negative, got {0}")]
    InvalidThroughput(i32),

    /// A parameter name was registered twice.
    #[error("a binding is already registered for parameter '{0}'")]
    DuplicateBinding(String),

    /// No binding is registered for the parameter.
    #[error("no binding is registered for parameter '{0}'")]
    UnknownBinding(String),

    /// A binding document could not be deserialized.
    #[error("invalid binding document: {0}")]
    InvalidDocument(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::InvalidDocument(error.to_string())
    }
}

impl From<Error> for azure_core::Error {
    fn from(error: Error) -> Self {
        let kind = match &error {
            Error::MalformedExpression { .. }
            | Error::InvalidConnectionString(_)
            | Error::InvalidDocument(_) => azure_core::error::ErrorKind::DataConversion,
            _ => azure_core::error::ErrorKind::Other,
        };
        azure_core::Error::with_error(kind, error, "cosmos db binding invalid")
    }
}
