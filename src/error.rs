//! Error types for upcloud-image-builder

use thiserror::Error;

/// Main error type for image builder operations
#[derive(Error, Debug)]
pub enum BuilderError {
    /// All configuration violations found while preparing a build
    #[error("Configuration errors:\n{}", format_list(.0))]
    Config(Vec<String>),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("UpCloud API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A resource was created but never became ready
    #[error("Storage {uuid} was created but is not ready: {source}")]
    NotReady {
        uuid: String,
        source: Box<BuilderError>,
    },

    #[error("Step '{step}' halted: {message}")]
    Halted { step: String, message: String },

    #[error("Missing build state: {0}")]
    MissingState(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout waiting for {0}")]
    Timeout(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl BuilderError {
    /// Create an API error from a response status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Wrap an error raised after `uuid` was already created
    pub fn not_ready(uuid: impl Into<String>, source: BuilderError) -> Self {
        Self::NotReady {
            uuid: uuid.into(),
            source: Box::new(source),
        }
    }

    /// Identifier of a resource that exists despite the error
    pub fn created_uuid(&self) -> Option<&str> {
        match self {
            Self::NotReady { uuid, .. } => Some(uuid),
            _ => None,
        }
    }

    /// Create a halted-step error
    pub fn halted(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Halted {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Configuration messages, if this is a configuration error
    pub fn config_errors(&self) -> &[String] {
        match self {
            Self::Config(errors) => errors,
            _ => &[],
        }
    }
}

fn format_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("* {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_lists_every_message() {
        let err = BuilderError::Config(vec![
            "'username' must be specified".to_string(),
            "'zone' must be specified".to_string(),
        ]);

        let rendered = err.to_string();
        assert!(rendered.contains("* 'username' must be specified"));
        assert!(rendered.contains("* 'zone' must be specified"));
        assert_eq!(err.config_errors().len(), 2);
    }

    #[test]
    fn test_not_ready_keeps_created_uuid() {
        let err = BuilderError::not_ready("clone-1", BuilderError::Timeout("storage".to_string()));

        assert_eq!(err.created_uuid(), Some("clone-1"));
        assert!(err.to_string().contains("Timeout waiting for storage"));
        assert_eq!(BuilderError::driver("boom").created_uuid(), None);
    }

    #[test]
    fn test_api_error_display() {
        let err = BuilderError::api(404, "Storage not found");
        assert_eq!(err.to_string(), "UpCloud API error (404): Storage not found");
        assert!(err.config_errors().is_empty());
    }
}
