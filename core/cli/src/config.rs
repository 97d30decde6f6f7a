// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0
//
// ConfigLoader reads the configuration file once and exposes cached
// accessors for the tracing and verifier sections. The tracing section
// falls back to defaults; the verifier section must be valid.

use std::collections::HashSet;

use idtoken_auth::config::VerifierConfig;
use idtoken_tracing::TracingConfiguration;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Value, from_str};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid configuration - impossible to parse yaml")]
    InvalidYaml,
    #[error("invalid configuration - key {0} not valid")]
    InvalidKey(String),
    #[error("yaml parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

lazy_static! {
    static ref CONFIG_KEYS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("tracing");
        s.insert("verifier");
        s
    };
}

#[derive(Debug)]
pub struct ConfigLoader {
    root: Value,
    tracing: Option<TracingConfiguration>,
}

impl ConfigLoader {
    pub fn new(file_path: &str) -> Result<Self, ConfigError> {
        let config_str =
            std::fs::read_to_string(file_path).map_err(|e| ConfigError::NotFound(e.to_string()))?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        let root: Value = from_str(config_str).map_err(|_| ConfigError::InvalidYaml)?;

        // an empty file is an empty configuration
        let root = match root {
            Value::Null => Value::Mapping(Mapping::new()),
            root => root,
        };

        let mapping = root.as_mapping().ok_or(ConfigError::InvalidYaml)?;
        for key in mapping.keys() {
            let k = key.as_str().ok_or(ConfigError::InvalidYaml)?;
            if !CONFIG_KEYS.contains(k) {
                return Err(ConfigError::InvalidKey(k.to_string()));
            }
        }

        Ok(Self {
            root,
            tracing: None,
        })
    }

    pub fn tracing(&mut self) -> &TracingConfiguration {
        let root = &self.root;
        self.tracing.get_or_insert_with(|| {
            let cfg = root
                .get("tracing")
                .cloned()
                .map(|v| {
                    serde_yaml::from_value(v).unwrap_or_else(|e| {
                        warn!(error = ?e, "invalid tracing config, falling back to default");
                        TracingConfiguration::default()
                    })
                })
                .unwrap_or_default();
            debug!(?cfg, "Tracing configuration loaded");
            cfg
        })
    }

    /// Verifier settings, with `client_id` taking precedence over the file.
    pub fn verifier(&self, client_id: Option<&str>) -> Result<VerifierConfig, ConfigError> {
        let mut section = match self.root.get("verifier") {
            Some(Value::Mapping(m)) => m.clone(),
            Some(Value::Null) | None => Mapping::new(),
            Some(_) => return Err(ConfigError::InvalidYaml),
        };

        if let Some(id) = client_id {
            section.insert(Value::from("client_id"), Value::from(id));
        }

        let cfg: VerifierConfig = serde_yaml::from_value(Value::Mapping(section))?;
        debug!(?cfg, "Verifier configuration loaded");

        Ok(cfg)
    }
}
