//! Communicator settings used to reach the build server

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::duration::{RawDuration, parse_duration};

/// Default SSH login user
pub const DEFAULT_SSH_USERNAME: &str = "root";

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default time allowed for SSH to become available
pub const DEFAULT_SSH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How the builder talks to the build server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicatorKind {
    #[default]
    Ssh,
    None,
}

/// Communicator section of the build configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicatorConfig {
    /// `ssh` or `none`
    pub communicator: Option<String>,
    pub ssh_username: Option<String>,
    pub ssh_port: Option<u16>,
    pub ssh_timeout: Option<RawDuration>,
    pub ssh_password: Option<String>,
}

/// Communicator settings after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Communicator {
    pub kind: CommunicatorKind,
    pub ssh_username: String,
    pub ssh_port: u16,
    pub ssh_timeout: Duration,
    pub ssh_password: Option<String>,
}

impl CommunicatorConfig {
    /// Apply defaults and validate, collecting every error
    pub fn prepare(&self) -> Result<Communicator, Vec<String>> {
        let mut errors = Vec::new();

        let kind = match self.communicator.as_deref() {
            None | Some("") | Some("ssh") => CommunicatorKind::Ssh,
            Some("none") => CommunicatorKind::None,
            Some(other) => {
                errors.push(format!("unknown communicator type {other:?}"));
                CommunicatorKind::Ssh
            }
        };

        let ssh_username = self
            .ssh_username
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_SSH_USERNAME.to_string());

        let ssh_port = match self.ssh_port {
            Some(0) => {
                errors.push("'ssh_port' must be between 1 and 65535".to_string());
                DEFAULT_SSH_PORT
            }
            Some(port) => port,
            None => DEFAULT_SSH_PORT,
        };

        let ssh_timeout = match &self.ssh_timeout {
            Some(raw) => parse_duration(&raw.0).unwrap_or_else(|e| {
                errors.push(format!("'ssh_timeout' is invalid: {e}"));
                DEFAULT_SSH_TIMEOUT
            }),
            None => DEFAULT_SSH_TIMEOUT,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Communicator {
            kind,
            ssh_username,
            ssh_port,
            ssh_timeout,
            ssh_password: self.ssh_password.clone(),
        })
    }
}
