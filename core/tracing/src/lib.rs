// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid tracing filter: {0}")]
    InvalidFilter(String),
    #[error("tracing subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TracingConfiguration {
    #[serde(default = "default_log_level")]
    log_level: String,

    #[serde(default = "default_display_thread_names")]
    display_thread_names: bool,

    #[serde(default = "default_display_thread_ids")]
    display_thread_ids: bool,

    /// Extra `EnvFilter` directives, e.g. `idtoken_auth=debug,reqwest=warn`
    #[serde(default = "default_filter")]
    filter: String,
}

impl Default for TracingConfiguration {
    fn default() -> Self {
        TracingConfiguration {
            log_level: default_log_level(),
            display_thread_names: default_display_thread_names(),
            display_thread_ids: default_display_thread_ids(),
            filter: default_filter(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_display_thread_names() -> bool {
    false
}

fn default_display_thread_ids() -> bool {
    false
}

fn default_filter() -> String {
    String::new()
}

// unknown levels fall back to info
fn resolve_level(level: &str) -> Level {
    let level = level.to_lowercase();
    match level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

impl TracingConfiguration {
    pub fn with_log_level(self, log_level: String) -> Self {
        TracingConfiguration { log_level, ..self }
    }

    pub fn with_display_thread_names(self, display_thread_names: bool) -> Self {
        TracingConfiguration {
            display_thread_names,
            ..self
        }
    }

    pub fn with_display_thread_ids(self, display_thread_ids: bool) -> Self {
        TracingConfiguration {
            display_thread_ids,
            ..self
        }
    }

    pub fn with_filter(self, filter: String) -> Self {
        TracingConfiguration { filter, ..self }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn display_thread_names(&self) -> bool {
        self.display_thread_names
    }

    pub fn display_thread_ids(&self) -> bool {
        self.display_thread_ids
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Filter with `log_level` for every target and the `filter` directives
    /// on top of it.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        // a builder default directive is dropped as soon as `filter` has one
        let filter = EnvFilter::builder()
            .parse(&self.filter)
            .map_err(|e| ConfigError::InvalidFilter(e.to_string()))?;

        Ok(filter.add_directive(LevelFilter::from_level(resolve_level(&self.log_level)).into()))
    }

    /// Set up a global subscriber that logs to stderr.
    ///
    /// Stdout is left to the program output.
    pub fn setup_tracing_subscriber(&self) -> Result<(), ConfigError> {
        tracing_subscriber::fmt::Subscriber::builder()
            .with_env_filter(self.env_filter()?)
            .with_thread_names(self.display_thread_names)
            .with_thread_ids(self.display_thread_ids)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| ConfigError::AlreadyInitialized(e.to_string()))
    }
}
