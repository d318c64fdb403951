//! Runtime configuration: controller endpoint, credentials, target model.
//!
//! Layers, lowest to highest:
//!   defaults (username "admin")
//!   YAML file (--config or JUJU_ACT_CONFIG)
//!   environment (JUJU_ENDPOINT, JUJU_USERNAME, JUJU_PASSWORD, JUJU_MODEL, JUJU_INSECURE)
//!   command-line flags
//!
//! The password is only read from the file or the environment.
//!
//! Example file:
//!   endpoint: wss://10.0.0.5:17070
//!   username: admin
//!   password: s3cret
//!   model: tests
//!   insecure: true

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::juju::{Credentials, Endpoint, parse_endpoint};

pub const DEFAULT_USERNAME: &str = "admin";

/// Shape of the YAML config file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub model: Option<String>,
    pub insecure: Option<bool>,
}

impl FileConfig {
    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| Error::Config(format!("invalid config file: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }
}

/// Values supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub model: Option<String>,
    pub insecure: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    pub model: Option<String>,
    pub insecure: bool,
}

impl Config {
    /// Resolve from the process environment and the optional config file.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::load_with(overrides, |key| std::env::var(key).ok())
    }

    pub fn load_with(overrides: &Overrides, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let path = overrides
            .config
            .clone()
            .or_else(|| env("JUJU_ACT_CONFIG").map(PathBuf::from));
        let file = match path {
            Some(p) => FileConfig::load(&p)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, env, overrides)
    }

    /// Merge the layers. `env` returns `None` for unset variables.
    pub fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let endpoint_raw = overrides
            .endpoint
            .clone()
            .or_else(|| env("JUJU_ENDPOINT"))
            .or(file.endpoint)
            .ok_or_else(|| {
                Error::Config("no controller endpoint (use --endpoint or JUJU_ENDPOINT)".into())
            })?;
        let endpoint = parse_endpoint(&endpoint_raw)?;

        let username = overrides
            .username
            .clone()
            .or_else(|| env("JUJU_USERNAME"))
            .or(file.username)
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

        let password = env("JUJU_PASSWORD").or(file.password).ok_or_else(|| {
            Error::Config("no password (set JUJU_PASSWORD or `password` in the config file)".into())
        })?;

        let model = overrides
            .model
            .clone()
            .or_else(|| env("JUJU_MODEL"))
            .or(file.model)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let insecure = overrides.insecure
            || env("JUJU_INSECURE").is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            || file.insecure.unwrap_or(false);

        Ok(Config {
            endpoint,
            credentials: Credentials::new(username, password),
            model,
            insecure,
        })
    }

    /// Target model name, required by every model-scoped command.
    pub fn require_model(&self) -> Result<&str> {
        self.model
            .as_deref()
            .ok_or_else(|| Error::Config("no model selected (use --model or JUJU_MODEL)".into()))
    }
}
