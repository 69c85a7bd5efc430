//! Build artifact
//!
//! Summarizes the templates a successful build produced.

use std::fmt;

use crate::BuilderError;
use crate::driver::{Driver, Template};
use crate::state::BuildState;

/// Templates produced by a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    pub templates: Vec<Template>,
}

impl Artifact {
    /// Build an artifact from the templates recorded in the build state
    pub fn from_state(state: &BuildState) -> Option<Self> {
        match state.templates() {
            [] => None,
            templates => Some(Self {
                templates: templates.to_vec(),
            }),
        }
    }

    /// Build an artifact referring to existing templates by identifier
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: ids
                .into_iter()
                .map(|uuid| Template {
                    uuid: uuid.into(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    /// Comma separated template identifiers
    pub fn id(&self) -> String {
        self.templates
            .iter()
            .map(|t| t.uuid.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Delete every template of this artifact
    ///
    /// Deletion is attempted for all templates; failures are reported
    /// together afterwards.
    pub async fn destroy(&self, driver: &dyn Driver) -> Result<(), BuilderError> {
        let mut failures = Vec::new();

        for template in &self.templates {
            if let Err(e) = driver.delete_template(&template.uuid).await {
                failures.push(format!("{}: {}", template.uuid, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BuilderError::driver(format!(
                "failed to destroy template(s): {}",
                failures.join("; ")
            )))
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listed = self
            .templates
            .iter()
            .map(|t| format!("{} ({})", t.title, t.uuid))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Storage template(s) created: {listed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockDriver;

    fn artifact() -> Artifact {
        Artifact {
            templates: vec![
                Template {
                    uuid: "t-1".to_string(),
                    title: "img-20240309-140500".to_string(),
                    zone: "fi-hel1".to_string(),
                },
                Template {
                    uuid: "t-2".to_string(),
                    title: "img-20240309-140500".to_string(),
                    zone: "de-fra1".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_artifact_id_and_display() {
        let artifact = artifact();
        assert_eq!(artifact.id(), "t-1,t-2");
        assert_eq!(
            artifact.to_string(),
            "Storage template(s) created: img-20240309-140500 (t-1), img-20240309-140500 (t-2)"
        );
    }

    #[tokio::test]
    async fn test_destroy_attempts_every_template() {
        let driver = MockDriver::new().with_delete_failure("t-1");

        let err = artifact().destroy(&driver).await.unwrap_err();

        assert_eq!(driver.deleted(), vec!["t-1", "t-2"]);
        assert!(err.to_string().contains("t-1"));
    }

    #[tokio::test]
    async fn test_destroy_by_identifier() {
        let driver = MockDriver::new();
        let artifact = Artifact::from_ids(["t-1", "t-2"]);

        assert_eq!(artifact.id(), "t-1,t-2");
        artifact.destroy(&driver).await.unwrap();
        assert_eq!(driver.deleted(), vec!["t-1", "t-2"]);
    }
}
