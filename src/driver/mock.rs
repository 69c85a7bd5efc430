//! Mock driver for testing
//!
//! Keeps everything in memory, records every call and can be told to fail
//! specific operations.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use super::{Driver, Storage, Template};
use crate::BuilderError;

/// A call received by [`MockDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    GetServerStorage { server_uuid: String },
    CloneStorage { storage_uuid: String, zone: String, title: String },
    CreateTemplate { storage_uuid: String, title: String },
    DeleteTemplate { uuid: String },
}

/// Mock driver for testing
///
/// # Example
/// ```
/// use upcloud_image_builder::driver::mock::MockDriver;
///
/// let mock = MockDriver::new()
///     .with_server_storage("storage-1", "Debian disk")
///     .with_clone_failure_at(2);
/// ```
pub struct MockDriver {
    storage: Storage,
    storage_error: Option<String>,
    clone_failure_at: Option<usize>,
    clone_not_ready_at: Option<usize>,
    template_failure_at: Option<usize>,
    delete_failures: HashSet<String>,
    calls: Mutex<Vec<DriverCall>>,
}

impl MockDriver {
    /// Create a mock whose server has a single disk
    pub fn new() -> Self {
        Self {
            storage: Storage {
                uuid: "01000000-0000-4000-8000-000020060100".to_string(),
                title: "Build server disk".to_string(),
                zone: "fi-hel1".to_string(),
            },
            storage_error: None,
            clone_failure_at: None,
            clone_not_ready_at: None,
            template_failure_at: None,
            delete_failures: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the storage attached to the server
    pub fn with_server_storage(mut self, uuid: &str, title: &str) -> Self {
        self.storage.uuid = uuid.to_string();
        self.storage.title = title.to_string();
        self
    }

    /// Fail the server storage lookup
    pub fn with_storage_error(mut self, error: &str) -> Self {
        self.storage_error = Some(error.to_string());
        self
    }

    /// Fail the n-th clone request (1-indexed)
    pub fn with_clone_failure_at(mut self, n: usize) -> Self {
        self.clone_failure_at = Some(n);
        self
    }

    /// Create the n-th clone (1-indexed) but report it never became ready
    pub fn with_clone_not_ready_at(mut self, n: usize) -> Self {
        self.clone_not_ready_at = Some(n);
        self
    }

    /// Fail the n-th template creation request (1-indexed)
    pub fn with_template_failure_at(mut self, n: usize) -> Self {
        self.template_failure_at = Some(n);
        self
    }

    /// Fail deletion of the given identifier
    pub fn with_delete_failure(mut self, uuid: &str) -> Self {
        self.delete_failures.insert(uuid.to_string());
        self
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock_calls().clone()
    }

    /// Identifiers passed to `delete_template`, in order
    pub fn deleted(&self) -> Vec<String> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                DriverCall::DeleteTemplate { uuid } => Some(uuid.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<DriverCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a call and return how many calls of the same kind came before
    fn record(&self, call: DriverCall) -> usize {
        let mut calls = self.lock_calls();
        let kind = std::mem::discriminant(&call);
        let previous = calls
            .iter()
            .filter(|c| std::mem::discriminant(*c) == kind)
            .count();
        calls.push(call);
        previous
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn get_server_storage(&self, server_uuid: &str) -> Result<Storage, BuilderError> {
        self.record(DriverCall::GetServerStorage {
            server_uuid: server_uuid.to_string(),
        });

        if let Some(error) = &self.storage_error {
            return Err(BuilderError::driver(error.clone()));
        }

        Ok(self.storage.clone())
    }

    async fn clone_storage(
        &self,
        storage_uuid: &str,
        zone: &str,
        title: &str,
    ) -> Result<Storage, BuilderError> {
        let n = self.record(DriverCall::CloneStorage {
            storage_uuid: storage_uuid.to_string(),
            zone: zone.to_string(),
            title: title.to_string(),
        }) + 1;

        if self.clone_failure_at == Some(n) {
            return Err(BuilderError::driver(format!(
                "failed to clone storage {storage_uuid} to zone {zone}"
            )));
        }

        let uuid = Uuid::new_v4().to_string();
        if self.clone_not_ready_at == Some(n) {
            return Err(BuilderError::not_ready(
                uuid,
                BuilderError::Timeout(format!("clone in zone {zone} to become online")),
            ));
        }

        Ok(Storage {
            uuid,
            title: title.to_string(),
            zone: zone.to_string(),
        })
    }

    async fn create_template(
        &self,
        storage_uuid: &str,
        title: &str,
    ) -> Result<Template, BuilderError> {
        let n = self.record(DriverCall::CreateTemplate {
            storage_uuid: storage_uuid.to_string(),
            title: title.to_string(),
        }) + 1;

        if self.template_failure_at == Some(n) {
            return Err(BuilderError::driver(format!(
                "failed to create template from storage {storage_uuid}"
            )));
        }

        Ok(Template {
            uuid: Uuid::new_v4().to_string(),
            title: title.to_string(),
            zone: String::new(),
        })
    }

    async fn delete_template(&self, uuid: &str) -> Result<(), BuilderError> {
        self.record(DriverCall::DeleteTemplate {
            uuid: uuid.to_string(),
        });

        if self.delete_failures.contains(uuid) {
            return Err(BuilderError::api(404, format!("Storage {uuid} not found")));
        }

        Ok(())
    }
}
