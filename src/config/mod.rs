//! Build configuration
//!
//! A [`RawConfig`] is what the user writes. [`Config::prepare`] applies
//! defaults, resolves credentials from the environment and validates
//! everything, reporting all problems at once.

pub mod communicator;
pub mod duration;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::BuilderError;
use crate::network::{self, CreateServerInterface, NetworkInterface};
use communicator::{Communicator, CommunicatorConfig};
use duration::{RawDuration, parse_duration};

/// Prefix used when neither a template name nor a prefix is configured
pub const DEFAULT_TEMPLATE_PREFIX: &str = "custom-image";

/// Default storage size in gigabytes
pub const DEFAULT_STORAGE_SIZE: u32 = 25;

/// Default time allowed for each remote state transition
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Longest accepted template name or prefix
pub const MAX_TEMPLATE_TITLE_LEN: usize = 40;

/// Environment variable holding the API username
pub const ENV_API_USER: &str = "UPCLOUD_API_USER";

/// Environment variable holding the API password
pub const ENV_API_PASSWORD: &str = "UPCLOUD_API_PASSWORD";

/// Build configuration as written by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub zone: Option<String>,
    pub storage_uuid: Option<String>,
    pub storage_name: Option<String>,

    pub template_prefix: Option<String>,
    pub template_name: Option<String>,
    pub storage_size: Option<u32>,
    pub state_timeout_duration: Option<RawDuration>,
    pub clone_zones: Vec<String>,

    pub network_interfaces: Vec<NetworkInterface>,

    pub ssh_private_key_path: Option<PathBuf>,
    pub ssh_public_key_path: Option<PathBuf>,

    #[serde(flatten)]
    pub comm: CommunicatorConfig,
}

/// How templates produced by a build are titled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNaming {
    /// `<prefix>-<timestamp>`
    Prefix(String),
    /// Fixed title used verbatim
    Name(String),
}

/// Validated and defaulted build configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub zone: String,
    pub storage_uuid: Option<String>,
    pub storage_name: Option<String>,

    pub template_naming: TemplateNaming,
    pub storage_size: u32,
    pub timeout: Duration,
    pub clone_zones: Vec<String>,

    pub networking: Vec<CreateServerInterface>,

    pub ssh_private_key: Option<Vec<u8>>,
    pub ssh_public_key: Option<Vec<u8>>,

    pub comm: Communicator,
}

impl RawConfig {
    /// Parse a raw configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, BuilderError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a raw configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, BuilderError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Config {
    /// Prepare a configuration, falling back to the process environment
    /// for credentials
    pub async fn prepare_from_env(raw: RawConfig) -> Result<Self, BuilderError> {
        Self::prepare(raw, |key| std::env::var(key).ok()).await
    }

    /// Prepare a configuration with an injectable environment lookup
    ///
    /// Explicit values always win over the environment. Every validation
    /// failure is collected into a single [`BuilderError::Config`].
    pub async fn prepare<F>(raw: RawConfig, env: F) -> Result<Self, BuilderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        let username = non_empty(raw.username)
            .or_else(|| non_empty(env(ENV_API_USER)))
            .unwrap_or_default();
        let password = non_empty(raw.password)
            .or_else(|| non_empty(env(ENV_API_PASSWORD)))
            .unwrap_or_default();
        let zone = non_empty(raw.zone).unwrap_or_default();
        let storage_uuid = non_empty(raw.storage_uuid);
        let storage_name = non_empty(raw.storage_name);
        let template_prefix = non_empty(raw.template_prefix);
        let template_name = non_empty(raw.template_name);

        let storage_size = match raw.storage_size {
            Some(0) | None => DEFAULT_STORAGE_SIZE,
            Some(size) => size,
        };

        let timeout = match &raw.state_timeout_duration {
            Some(value) => match parse_duration(&value.0) {
                Ok(d) if d.is_zero() => DEFAULT_TIMEOUT,
                Ok(d) => d,
                Err(e) => {
                    errors.push(format!("'state_timeout_duration' is invalid: {e}"));
                    DEFAULT_TIMEOUT
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        let networking = if raw.network_interfaces.is_empty() {
            network::default_interfaces()
        } else {
            network::convert_interfaces(&raw.network_interfaces)
        };

        let comm = match raw.comm.prepare() {
            Ok(comm) => Some(comm),
            Err(es) => {
                errors.extend(es);
                None
            }
        };

        if username.is_empty() {
            errors.push("'username' must be specified".to_string());
        }

        if password.is_empty() {
            errors.push("'password' must be specified".to_string());
        }

        if zone.is_empty() {
            errors.push("'zone' must be specified".to_string());
        }

        if storage_uuid.is_none() && storage_name.is_none() {
            errors.push("'storage_uuid' or 'storage_name' must be specified".to_string());
        }

        let ssh_private_key = match &raw.ssh_private_key_path {
            Some(path) => read_key(path, "private", &mut errors).await,
            None => None,
        };

        let ssh_public_key = match &raw.ssh_public_key_path {
            Some(path) => read_key(path, "public", &mut errors).await,
            None => None,
        };

        if template_prefix
            .as_ref()
            .is_some_and(|p| p.chars().count() > MAX_TEMPLATE_TITLE_LEN)
        {
            errors.push("'template_prefix' must be 0-40 characters".to_string());
        }

        if template_name
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_TEMPLATE_TITLE_LEN)
        {
            errors.push("'template_name' is limited to 40 characters".to_string());
        }

        let template_naming = match (template_prefix, template_name) {
            (Some(_), Some(_)) => {
                errors.push(
                    "you can either use 'template_prefix' or 'template_name' in your configuration"
                        .to_string(),
                );
                None
            }
            (Some(prefix), None) => Some(TemplateNaming::Prefix(prefix)),
            (None, Some(name)) => Some(TemplateNaming::Name(name)),
            (None, None) => Some(TemplateNaming::Prefix(DEFAULT_TEMPLATE_PREFIX.to_string())),
        };

        match (errors.is_empty(), template_naming, comm) {
            (true, Some(template_naming), Some(comm)) => {
                debug!(
                    "Prepared configuration for zone {} with {} clone zone(s)",
                    zone,
                    raw.clone_zones.len()
                );
                Ok(Self {
                    username,
                    password,
                    zone,
                    storage_uuid,
                    storage_name,
                    template_naming,
                    storage_size,
                    timeout,
                    clone_zones: raw.clone_zones,
                    networking,
                    ssh_private_key,
                    ssh_public_key,
                    comm,
                })
            }
            _ => Err(BuilderError::Config(errors)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn read_key(path: &Path, kind: &str, errors: &mut Vec<String>) -> Option<Vec<u8>> {
    match fs::read(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            errors.push(format!("Failed to read {kind} key: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn minimal() -> RawConfig {
        RawConfig {
            username: Some("user".to_string()),
            password: Some("secret".to_string()),
            zone: Some("fi-hel1".to_string()),
            storage_uuid: Some("01000000-0000-4000-8000-000030200200".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let config = Config::prepare(minimal(), no_env).await.unwrap();

        assert_eq!(
            config.template_naming,
            TemplateNaming::Prefix("custom-image".to_string())
        );
        assert_eq!(config.storage_size, 25);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.comm.ssh_username, "root");
        assert_eq!(config.networking, network::default_interfaces());
        assert!(config.clone_zones.is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_fields_all_reported() {
        let err = Config::prepare(RawConfig::default(), no_env)
            .await
            .unwrap_err();

        let errors = err.config_errors();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&"'username' must be specified".to_string()));
        assert!(errors.contains(&"'password' must be specified".to_string()));
        assert!(errors.contains(&"'zone' must be specified".to_string()));
        assert!(errors.contains(&"'storage_uuid' or 'storage_name' must be specified".to_string()));
    }

    #[tokio::test]
    async fn test_storage_name_satisfies_storage_requirement() {
        let raw = RawConfig {
            storage_uuid: None,
            storage_name: Some("ubuntu server 22.04".to_string()),
            ..minimal()
        };

        let config = Config::prepare(raw, no_env).await.unwrap();
        assert_eq!(config.storage_name.as_deref(), Some("ubuntu server 22.04"));
    }

    #[tokio::test]
    async fn test_credentials_from_env() {
        let raw = RawConfig {
            username: None,
            password: None,
            ..minimal()
        };

        let config = Config::prepare(raw, |key| match key {
            ENV_API_USER => Some("env-user".to_string()),
            ENV_API_PASSWORD => Some("env-pass".to_string()),
            _ => None,
        })
        .await
        .unwrap();

        assert_eq!(config.username, "env-user");
        assert_eq!(config.password, "env-pass");
    }

    #[tokio::test]
    async fn test_explicit_credentials_win_over_env() {
        let config = Config::prepare(minimal(), |_| Some("from-env".to_string()))
            .await
            .unwrap();

        assert_eq!(config.username, "user");
        assert_eq!(config.password, "secret");
    }

    #[tokio::test]
    async fn test_name_and_prefix_are_exclusive() {
        let raw = RawConfig {
            template_prefix: Some("img".to_string()),
            template_name: Some("golden".to_string()),
            ..minimal()
        };

        let err = Config::prepare(raw, no_env).await.unwrap_err();
        assert_eq!(
            err.config_errors(),
            ["you can either use 'template_prefix' or 'template_name' in your configuration"]
        );
    }

    #[tokio::test]
    async fn test_template_name_replaces_default_prefix() {
        let raw = RawConfig {
            template_name: Some("golden".to_string()),
            ..minimal()
        };

        let config = Config::prepare(raw, no_env).await.unwrap();
        assert_eq!(config.template_naming, TemplateNaming::Name("golden".to_string()));
    }

    #[tokio::test]
    async fn test_title_length_limits() {
        let long = "x".repeat(41);
        let raw = RawConfig {
            template_prefix: Some(long.clone()),
            ..minimal()
        };
        let err = Config::prepare(raw, no_env).await.unwrap_err();
        assert_eq!(err.config_errors(), ["'template_prefix' must be 0-40 characters"]);

        let raw = RawConfig {
            template_name: Some(long),
            ..minimal()
        };
        let err = Config::prepare(raw, no_env).await.unwrap_err();
        assert_eq!(err.config_errors(), ["'template_name' is limited to 40 characters"]);

        let raw = RawConfig {
            template_name: Some("y".repeat(40)),
            ..minimal()
        };
        assert!(Config::prepare(raw, no_env).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_keys_are_accumulated() {
        let raw = RawConfig {
            zone: None,
            ssh_private_key_path: Some(PathBuf::from("/nonexistent/id_rsa")),
            ssh_public_key_path: Some(PathBuf::from("/nonexistent/id_rsa.pub")),
            ..minimal()
        };

        let err = Config::prepare(raw, no_env).await.unwrap_err();
        let errors = err.config_errors();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.starts_with("Failed to read private key")));
        assert!(errors.iter().any(|e| e.starts_with("Failed to read public key")));
    }

    #[tokio::test]
    async fn test_oversized_timeouts_are_config_errors() {
        let raw = RawConfig {
            state_timeout_duration: Some(RawDuration("9999999999999999999h".to_string())),
            comm: CommunicatorConfig {
                ssh_timeout: Some(RawDuration("9999999999999999999m".to_string())),
                ..Default::default()
            },
            ..minimal()
        };

        let err = Config::prepare(raw, no_env).await.unwrap_err();
        let errors = err.config_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.contains("out of range")));
    }

    #[tokio::test]
    async fn test_communicator_errors_merged() {
        let raw = RawConfig {
            password: None,
            comm: CommunicatorConfig {
                ssh_port: Some(0),
                ..Default::default()
            },
            ..minimal()
        };

        let err = Config::prepare(raw, no_env).await.unwrap_err();
        assert_eq!(err.config_errors().len(), 2);
    }

    #[tokio::test]
    async fn test_parse_yaml_config() {
        let yaml = r#"
username: user
password: secret
zone: de-fra1
storage_uuid: 01000000-0000-4000-8000-000030200200
template_prefix: img
clone_zones:
  - uk-lon1
  - nl-ams1
state_timeout_duration: 10m
ssh_username: ubuntu
"#;
        let raw = RawConfig::from_yaml(yaml).unwrap();
        let config = Config::prepare(raw, no_env).await.unwrap();

        assert_eq!(config.clone_zones, vec!["uk-lon1", "nl-ams1"]);
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert_eq!(config.template_naming, TemplateNaming::Prefix("img".to_string()));
        assert_eq!(config.comm.ssh_username, "ubuntu");
    }
}
