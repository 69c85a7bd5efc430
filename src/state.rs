//! Build state shared between steps
//!
//! Replaces an untyped key/value bag: each value a step reads or writes is
//! a named field.

use std::sync::Arc;

use crate::BuilderError;
use crate::driver::{Driver, Template};
use crate::ui::Ui;

/// State threaded through every step of a build
pub struct BuildState {
    /// Server the build runs on, set by the step that provides it
    pub server_uuid: Option<String>,
    pub ui: Arc<dyn Ui>,
    pub driver: Arc<dyn Driver>,
    /// Intermediate storages to delete when the build winds down
    pub cleanup_storage_uuids: Option<Vec<String>>,
    /// Templates produced so far
    pub templates: Option<Vec<Template>>,
    /// Error that halted the build, if any
    pub error: Option<BuilderError>,
}

impl BuildState {
    /// Create an empty state around a driver and output sink
    pub fn new(driver: Arc<dyn Driver>, ui: Arc<dyn Ui>) -> Self {
        Self {
            server_uuid: None,
            ui,
            driver,
            cleanup_storage_uuids: None,
            templates: None,
            error: None,
        }
    }

    /// Set the server the build operates on
    pub fn with_server_uuid(mut self, server_uuid: impl Into<String>) -> Self {
        self.server_uuid = Some(server_uuid.into());
        self
    }

    /// The build server, required by the template step
    pub fn server_uuid(&self) -> Result<&str, BuilderError> {
        self.server_uuid
            .as_deref()
            .ok_or(BuilderError::MissingState("server_uuid"))
    }

    /// Templates produced so far
    pub fn templates(&self) -> &[Template] {
        self.templates.as_deref().unwrap_or_default()
    }
}

impl std::fmt::Debug for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildState")
            .field("server_uuid", &self.server_uuid)
            .field("cleanup_storage_uuids", &self.cleanup_storage_uuids)
            .field("templates", &self.templates)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
