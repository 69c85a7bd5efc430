//! upcloud-image-builder library
//!
//! Turns the disk of a running UpCloud server into reusable storage
//! templates, optionally replicated across zones.
//!
//! # Design Principles
//!
//! - **Safety First**: No unsafe code (`unsafe_code = "forbid"` under `[lints.rust]` in Cargo.toml)
//! - **Clean Failure**: Intermediate clones are always reclaimed, even when a
//!   later step fails
//! - **Testable**: Remote calls go through the [`driver::Driver`] trait and
//!   configuration never reads the environment directly

pub mod artifact;
pub mod config;
pub mod driver;
pub mod network;
pub mod stages;
pub mod state;
pub mod timestamp;
pub mod ui;

mod error;

pub use error::BuilderError;

use std::sync::Arc;
use tracing::info;

use artifact::Artifact;
use config::Config;
use driver::Driver;
use stages::{Step, create_template::StepCreateTemplate};
use state::BuildState;
use ui::Ui;

/// Create templates from the disk of an existing server
///
/// Runs the template step and its cleanup. Returns the produced artifact,
/// or the error that halted the build once cleanup has finished.
pub async fn build_templates(
    config: &Config,
    server_uuid: &str,
    driver: Arc<dyn Driver>,
    ui: Arc<dyn Ui>,
) -> Result<Artifact, BuilderError> {
    info!("Building templates from server {}", server_uuid);

    let steps: Vec<Box<dyn Step>> = vec![Box::new(StepCreateTemplate::new(config))];
    let mut state = BuildState::new(driver, ui).with_server_uuid(server_uuid);

    stages::run_steps(&steps, &mut state).await?;

    Artifact::from_state(&state)
        .ok_or_else(|| BuilderError::InvalidData("build finished without templates".to_string()))
}
