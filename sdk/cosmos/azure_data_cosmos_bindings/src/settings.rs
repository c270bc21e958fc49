// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Application settings used for `%name%` tokens and connection strings.

use std::collections::HashMap;
use tracing::debug;

use crate::{Error, Result};

/// A source of named application settings.
///
/// Hosts usually read settings from the process environment ([`EnvSettings`]); tests and embedded
/// hosts can supply them directly with [`MapSettings`].
pub trait SettingsSource: Send + Sync {
    /// Gets the value of a setting, or `None` if it is not defined.
    fn get(&self, name: &str) -> Option<String>;

    /// Gets the value of a setting, failing with [`Error::MissingSetting`] if it is not defined.
    fn require(&self, name: &str) -> Result<String> {
        self.get(name).ok_or_else(|| {
            debug!(setting = name, "application setting not found");
            Error::MissingSetting(name.to_string())
        })
    }
}

/// Reads settings from environment variables.
///
/// Setting names containing `:` are also looked up with `__` in place of each `:`, matching the
/// convention hosts use for hierarchical settings on platforms that disallow `:` in variable names.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvSettings;

impl SettingsSource for EnvSettings {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name)
            .ok()
            .or_else(|| std::env::var(name.replace(':', "__")).ok())
    }
}

/// Settings held in memory.
#[derive(Clone, Debug, Default)]
pub struct MapSettings(HashMap<String, String>);

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl SettingsSource for MapSettings {
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}
