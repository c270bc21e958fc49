// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use azure_core::credentials::Secret;
use std::str::FromStr;
use url::Url;

use crate::Error;

/// A Cosmos DB connection string, as found in the application setting a binding names.
///
/// The format is a `;`-separated list of `Key=Value` pairs; `AccountEndpoint` and `AccountKey`
/// are required, keys are case-insensitive, and unknown keys are ignored. The key is held in a
/// [`Secret`], so it never appears in [`Debug`] output.
///
/// # Examples
///
/// ```rust
/// use azure_data_cosmos_bindings::ConnectionString;
///
/// let connection: ConnectionString =
///     "AccountEndpoint=https://myaccount.documents.azure.com:443/;AccountKey=a2V5;"
///         .parse()
///         .unwrap();
/// assert_eq!("myaccount.documents.azure.com", connection.account_endpoint.host_str().unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionString {
    pub account_endpoint: Url,
    pub account_key: Secret,
}

impl PartialEq for ConnectionString {
    fn eq(&self, other: &Self) -> bool {
        self.account_endpoint == other.account_endpoint
            && self.account_key.secret() == other.account_key.secret()
    }
}

impl Eq for ConnectionString {}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(connection_string: &str) -> Result<Self, Self::Err> {
        if connection_string.trim().is_empty() {
            return Err(Error::InvalidConnectionString(
                "connection string is empty".into(),
            ));
        }

        let mut account_endpoint = None;
        let mut account_key = None;

        for part in connection_string.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            // Keys are before the first '='; base64 keys end in '=' so the value may contain more.
            let (key, value) = part.split_once('=').ok_or_else(|| {
                Error::InvalidConnectionString("a component is not a Key=Value pair".into())
            })?;

            match key.trim() {
                k if k.eq_ignore_ascii_case("AccountEndpoint") => {
                    account_endpoint = Some(value.trim());
                }
                k if k.eq_ignore_ascii_case("AccountKey") => {
                    account_key = Some(value.trim());
                }
                _ => {}
            }
        }

        let endpoint = account_endpoint
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidConnectionString("missing AccountEndpoint".into()))?;
        let key = account_key
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidConnectionString("missing AccountKey".into()))?;

        let account_endpoint = Url::parse(endpoint).map_err(|e| {
            Error::InvalidConnectionString(format!("AccountEndpoint is not a valid URL: {e}"))
        })?;

        Ok(Self {
            account_endpoint,
            account_key: Secret::new(key.to_string()),
        })
    }
}
