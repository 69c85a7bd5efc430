//! Template creation step
//!
//! Turns the build server's disk into storage templates:
//! 1. Look up the disk attached to the server
//! 2. Clone it into every configured clone zone, one zone at a time
//! 3. Templatize the original disk and every clone under one shared title
//!
//! Clones are intermediate resources. Each one is recorded for cleanup the
//! moment it exists, so a failure at any later point still deletes it. The
//! original disk is never recorded: this step does not own it.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Step, StepAction, halt_with_error};
use crate::config::{Config, TemplateNaming};
use crate::state::BuildState;
use crate::timestamp::TimestampSource;

/// Literal prefix of cloned storage titles
pub const CLONE_TITLE_PREFIX: &str = "image-builder";

/// Creates templates from the build server's storage
#[derive(Debug)]
pub struct StepCreateTemplate {
    clone_zones: Vec<String>,
    naming: TemplateNaming,
    timestamps: TimestampSource,
}

impl StepCreateTemplate {
    pub fn new(config: &Config) -> Self {
        Self {
            clone_zones: config.clone_zones.clone(),
            naming: config.template_naming.clone(),
            timestamps: TimestampSource::new(),
        }
    }

    /// Replace the timestamp source (useful for testing)
    pub fn with_timestamps(mut self, timestamps: TimestampSource) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Title for a clone of the server disk
    fn clone_title(&self) -> String {
        format!(
            "{}-{}-cloned-disk1",
            CLONE_TITLE_PREFIX,
            self.timestamps.next_token()
        )
    }

    /// Title shared by every template of this run
    fn template_title(&self) -> String {
        match &self.naming {
            TemplateNaming::Prefix(prefix) => {
                format!("{}-{}", prefix, self.timestamps.next_token())
            }
            TemplateNaming::Name(name) => name.clone(),
        }
    }
}

#[async_trait]
impl Step for StepCreateTemplate {
    fn name(&self) -> &'static str {
        "create-template"
    }

    async fn run(&self, state: &mut BuildState) -> StepAction {
        let server_uuid = match state.server_uuid().map(str::to_string) {
            Ok(uuid) => uuid,
            Err(e) => return halt_with_error(state, e),
        };
        let ui = state.ui.clone();
        let driver = state.driver.clone();

        let storage = match driver.get_server_storage(&server_uuid).await {
            Ok(storage) => storage,
            Err(e) => return halt_with_error(state, e),
        };
        debug!("Server {} uses storage {}", server_uuid, storage.uuid);

        let mut storage_uuids = vec![storage.uuid.clone()];
        state.cleanup_storage_uuids = Some(Vec::new());

        for zone in &self.clone_zones {
            ui.say(&format!(
                "Cloning storage {:?} to zone {:?}...",
                storage.uuid, zone
            ));
            let title = self.clone_title();

            let cloned = match driver.clone_storage(&storage.uuid, zone, &title).await {
                Ok(cloned) => cloned,
                Err(e) => {
                    // the clone exists even though it never settled
                    if let Some(uuid) = e.created_uuid() {
                        state
                            .cleanup_storage_uuids
                            .get_or_insert_with(Vec::new)
                            .push(uuid.to_string());
                    }
                    return halt_with_error(state, e);
                }
            };

            ui.say(&format!(
                "Storage {:?} cloned to zone {:?} as {:?}",
                storage.uuid, zone, cloned.uuid
            ));
            storage_uuids.push(cloned.uuid.clone());
            state
                .cleanup_storage_uuids
                .get_or_insert_with(Vec::new)
                .push(cloned.uuid);
        }

        if !self.clone_zones.is_empty() {
            ui.say("Cloning completed...");
        }

        let template_title = self.template_title();
        state.templates = Some(Vec::with_capacity(storage_uuids.len()));

        for uuid in &storage_uuids {
            ui.say(&format!("Creating template for storage {uuid:?}..."));

            let template = match driver.create_template(uuid, &template_title).await {
                Ok(template) => template,
                Err(e) => return halt_with_error(state, e),
            };

            ui.say(&format!("Template for storage {uuid:?} created..."));
            state.templates.get_or_insert_with(Vec::new).push(template);
        }

        info!(
            "Created {} template(s) titled {:?}",
            storage_uuids.len(),
            template_title
        );
        StepAction::Continue
    }

    async fn cleanup(&self, state: &mut BuildState) {
        let Some(storage_uuids) = state.cleanup_storage_uuids.take() else {
            return;
        };

        for uuid in storage_uuids {
            state.ui.say(&format!("Deleting storage {uuid:?}..."));

            if let Err(e) = state.driver.delete_template(&uuid).await {
                state
                    .ui
                    .error(&format!("Failed to delete storage {uuid:?}: {e}"));
            }
        }
    }
}
