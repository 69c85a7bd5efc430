//! Build configuration loader
//!
//! Reads a [`RawConfig`] from a YAML or JSON file, chosen by extension.

use super::RawConfig;
use crate::BuilderError;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Load a raw build configuration from a file
///
/// `.json` files are parsed as JSON; anything else is treated as YAML.
pub async fn load_raw_config(path: impl AsRef<Path>) -> Result<RawConfig, BuilderError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await?;

    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    debug!(
        "Loading build configuration from {} as {}",
        path.display(),
        if is_json { "JSON" } else { "YAML" }
    );

    if is_json {
        RawConfig::from_json(&content)
    } else {
        RawConfig::from_yaml(&content)
    }
}
