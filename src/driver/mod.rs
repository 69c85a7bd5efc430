//! Remote resource drivers
//!
//! A driver performs the storage and template operations a build needs
//! against a cloud provider. Each call either succeeds or fails outright;
//! any waiting for the resource to settle happens inside the driver.
//!
//! A resource that was created but never became ready is reported as
//! [`BuilderError::NotReady`], which carries its identifier so the caller
//! can still reclaim it.

pub mod mock;
pub mod upcloud;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::BuilderError;

/// A storage volume (disk)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub uuid: String,
    pub title: String,
    #[serde(default)]
    pub zone: String,
}

/// A storage template, the artifact a build produces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub uuid: String,
    pub title: String,
    #[serde(default)]
    pub zone: String,
}

/// Storage and template operations used by the template stage
#[async_trait]
pub trait Driver: Send + Sync {
    /// Find the disk storage attached to a server
    async fn get_server_storage(&self, server_uuid: &str) -> Result<Storage, BuilderError>;

    /// Clone a storage into another zone under the given title
    async fn clone_storage(
        &self,
        storage_uuid: &str,
        zone: &str,
        title: &str,
    ) -> Result<Storage, BuilderError>;

    /// Create a template from a storage
    async fn create_template(
        &self,
        storage_uuid: &str,
        title: &str,
    ) -> Result<Template, BuilderError>;

    /// Delete a template or storage
    async fn delete_template(&self, uuid: &str) -> Result<(), BuilderError>;
}
