// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration
//!
//! A [`Config`] travels with every connect request. Two requests for the same
//! storage location may share an engine instance only when their
//! [`ConfigFingerprint`]s are equal; `threads` is the one option that is safe
//! to ignore on reuse and is therefore left out of the fingerprint.

use std::collections::BTreeMap;

use crate::core::{Error, Result};

/// Option key for read-only mode
pub const READ_ONLY: &str = "read_only";

/// Option key for the worker thread count
pub const THREADS: &str = "threads";

/// Prefix for free-form user settings accepted by every engine
pub const CUSTOM_PREFIX: &str = "custom.";

/// Configuration for an engine instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Open the database in read-only mode
    /// Default: false
    pub read_only: bool,

    /// Worker thread hint. Ignored when an existing instance is reused.
    /// Default: None (engine decides)
    pub threads: Option<usize>,

    /// Engine settings (lowercased keys), compared on reuse
    pub settings: BTreeMap<String, String>,
}

/// The part of a [`Config`] that must match for an engine to be shared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFingerprint {
    read_only: bool,
    settings: BTreeMap<String, String>,
}

impl Config {
    /// Creates a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from an option map.
    ///
    /// `read_only` and `threads` are parsed here; every other key becomes an
    /// engine setting and is validated against the engine's recognized
    /// settings when the engine is acquired.
    pub fn from_options<I, K, V>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let mut config = Config::default();
        for (key, value) in options {
            let key = key.as_ref().trim().to_lowercase();
            let value = value.to_string();
            match key.as_str() {
                READ_ONLY => config.read_only = parse_bool(&key, &value)?,
                THREADS => {
                    let threads = value.trim().parse::<usize>().map_err(|_| {
                        Error::configuration(format!(
                            "Failed to cast value '{}' for option '{}' to an unsigned integer",
                            value, key
                        ))
                    })?;
                    config.threads = Some(threads);
                }
                "" => {
                    return Err(Error::configuration(
                        "configuration property name cannot be empty",
                    ))
                }
                _ => {
                    config.settings.insert(key, value);
                }
            }
        }
        Ok(config)
    }

    /// Builder method to set read-only mode
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Builder method to set the thread hint
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Builder method to add an engine setting
    pub fn with_setting(mut self, key: impl AsRef<str>, value: impl ToString) -> Self {
        self.settings
            .insert(key.as_ref().trim().to_lowercase(), value.to_string());
        self
    }

    /// Look up an engine setting
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Returns true when no option was given
    pub fn is_default(&self) -> bool {
        !self.read_only && self.threads.is_none() && self.settings.is_empty()
    }

    /// Fingerprint compared when an existing instance is reused
    pub fn fingerprint(&self) -> ConfigFingerprint {
        ConfigFingerprint {
            read_only: self.read_only,
            settings: self.settings.clone(),
        }
    }

    /// Reject settings the engine does not know.
    ///
    /// Keys under `custom.` are always accepted.
    pub fn validate_settings(&self, recognized: &[&str]) -> Result<()> {
        for key in self.settings.keys() {
            if key.starts_with(CUSTOM_PREFIX) && key.len() > CUSTOM_PREFIX.len() {
                continue;
            }
            if !recognized.contains(&key.as_str()) {
                return Err(Error::configuration(format!(
                    "Unrecognized configuration property '{}'",
                    key
                )));
            }
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(Error::configuration(format!(
            "Failed to cast value '{}' for option '{}' to a boolean",
            value, key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.read_only);
        assert!(config.threads.is_none());
        assert!(config.is_default());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_read_only(true)
            .with_threads(4)
            .with_setting("Memory_Limit", "1GB");

        assert!(config.read_only);
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.setting("memory_limit"), Some("1GB"));
        assert!(!config.is_default());
    }

    #[test]
    fn test_fingerprint_ignores_threads() {
        let a = Config::new().with_threads(1);
        let b = Config::new().with_threads(8);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = Config::new().with_read_only(true);
        assert_ne!(a.fingerprint(), c.fingerprint());

        let d = Config::new().with_setting("default_order", "desc");
        assert_ne!(a.fingerprint(), d.fingerprint());
    }

    #[test]
    fn test_from_options() {
        let config = Config::from_options([
            ("read_only", "false"),
            ("threads", "3"),
            ("default_order", "asc"),
        ])
        .unwrap();
        assert!(!config.read_only);
        assert_eq!(config.threads, Some(3));
        assert_eq!(config.setting("default_order"), Some("asc"));

        assert!(Config::from_options([("threads", "many")]).is_err());
        assert!(Config::from_options([("read_only", "perhaps")]).is_err());
    }

    #[test]
    fn test_validate_settings() {
        let config = Config::new()
            .with_setting("memory_limit", "1GB")
            .with_setting("custom.owner", "me");
        assert!(config.validate_settings(&["memory_limit"]).is_ok());

        let bad = Config::new().with_setting("frobnicate", "1");
        let err = bad.validate_settings(&["memory_limit"]).unwrap_err();
        assert_eq!(
            err,
            Error::configuration("Unrecognized configuration property 'frobnicate'")
        );
    }
}
