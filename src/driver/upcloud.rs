//! UpCloud API driver
//!
//! Talks to the UpCloud REST API using HTTP basic authentication.
//! https://developers.upcloud.com/1.3/

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{Driver, Storage, Template};
use crate::BuilderError;

/// UpCloud API base URL
pub const UPCLOUD_API_URL: &str = "https://api.upcloud.com/1.3";

/// Interval between storage state checks
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Storage state meaning the storage is ready for use
const STATE_ONLINE: &str = "online";

/// Storage device type for disks (as opposed to CD-ROMs)
const DEVICE_TYPE_DISK: &str = "disk";

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: ServerDetails,
}

#[derive(Debug, Deserialize)]
struct ServerDetails {
    #[serde(default)]
    zone: String,
    #[serde(default)]
    storage_devices: StorageDevices,
}

#[derive(Debug, Default, Deserialize)]
struct StorageDevices {
    #[serde(default)]
    storage_device: Vec<StorageDevice>,
}

#[derive(Debug, Deserialize)]
struct StorageDevice {
    storage: String,
    #[serde(default)]
    storage_title: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct StorageEnvelope {
    storage: StorageDetails,
}

#[derive(Debug, Deserialize)]
struct StorageDetails {
    uuid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    zone: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Serialize)]
struct CloneRequest<'a> {
    storage: CloneBody<'a>,
}

#[derive(Debug, Serialize)]
struct CloneBody<'a> {
    zone: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct TemplatizeRequest<'a> {
    storage: TemplatizeBody<'a>,
}

#[derive(Debug, Serialize)]
struct TemplatizeBody<'a> {
    title: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

/// Driver backed by the UpCloud API
#[derive(Debug, Clone)]
pub struct UpCloudDriver {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl UpCloudDriver {
    /// Create a driver for the public UpCloud API
    ///
    /// `timeout` bounds how long the driver waits for a storage to become
    /// ready after cloning or templatizing.
    pub fn new(username: &str, password: &str, timeout: Duration) -> Result<Self, BuilderError> {
        Self::with_base_url(UPCLOUD_API_URL, username, password, timeout)
    }

    /// Create with a custom base URL (for testing)
    pub fn with_base_url(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, BuilderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("upcloud-image-builder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Set the interval between storage state checks
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, BuilderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => format!(
                "{} ({})",
                envelope.error.error_message, envelope.error.error_code
            ),
            Err(_) if text.is_empty() => "no response body".to_string(),
            Err(_) => text,
        };

        Err(BuilderError::api(status, message))
    }

    async fn get_storage(&self, uuid: &str) -> Result<StorageDetails, BuilderError> {
        let response = self
            .send::<()>(Method::GET, &format!("/storage/{uuid}"), None)
            .await?;
        Ok(response.json::<StorageEnvelope>().await?.storage)
    }

    /// Poll a storage until it reaches `state` or the timeout runs out
    async fn wait_for_storage_state(
        &self,
        uuid: &str,
        state: &str,
    ) -> Result<StorageDetails, BuilderError> {
        let started = Instant::now();

        loop {
            let details = self.get_storage(uuid).await?;
            if details.state == state {
                return Ok(details);
            }

            if started.elapsed() >= self.timeout {
                return Err(BuilderError::Timeout(format!(
                    "storage {uuid} to become {state} (last state: {})",
                    details.state
                )));
            }

            debug!(
                "Storage {} is {}, waiting for {}",
                uuid, details.state, state
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl Driver for UpCloudDriver {
    async fn get_server_storage(&self, server_uuid: &str) -> Result<Storage, BuilderError> {
        let response = self
            .send::<()>(Method::GET, &format!("/server/{server_uuid}"), None)
            .await?;
        let server = response.json::<ServerEnvelope>().await?.server;

        let device = server
            .storage_devices
            .storage_device
            .into_iter()
            .find(|d| d.kind == DEVICE_TYPE_DISK)
            .ok_or_else(|| {
                BuilderError::driver(format!("server {server_uuid} has no disk storage attached"))
            })?;

        Ok(Storage {
            uuid: device.storage,
            title: device.storage_title,
            zone: server.zone,
        })
    }

    async fn clone_storage(
        &self,
        storage_uuid: &str,
        zone: &str,
        title: &str,
    ) -> Result<Storage, BuilderError> {
        let request = CloneRequest {
            storage: CloneBody { zone, title },
        };
        let response = self
            .send(
                Method::POST,
                &format!("/storage/{storage_uuid}/clone"),
                Some(&request),
            )
            .await?;
        let created = response.json::<StorageEnvelope>().await?.storage;
        info!("Cloned storage {} as {} in {}", storage_uuid, created.uuid, zone);

        let ready = self
            .wait_for_storage_state(&created.uuid, STATE_ONLINE)
            .await
            .map_err(|e| BuilderError::not_ready(&created.uuid, e))?;

        Ok(Storage {
            uuid: ready.uuid,
            title: ready.title,
            zone: ready.zone,
        })
    }

    async fn create_template(
        &self,
        storage_uuid: &str,
        title: &str,
    ) -> Result<Template, BuilderError> {
        let request = TemplatizeRequest {
            storage: TemplatizeBody { title },
        };
        let response = self
            .send(
                Method::POST,
                &format!("/storage/{storage_uuid}/templatize"),
                Some(&request),
            )
            .await?;
        let created = response.json::<StorageEnvelope>().await?.storage;
        info!("Templatizing storage {} as {}", storage_uuid, created.uuid);

        let ready = self
            .wait_for_storage_state(&created.uuid, STATE_ONLINE)
            .await
            .map_err(|e| BuilderError::not_ready(&created.uuid, e))?;

        Ok(Template {
            uuid: ready.uuid,
            title: ready.title,
            zone: ready.zone,
        })
    }

    async fn delete_template(&self, uuid: &str) -> Result<(), BuilderError> {
        self.send::<()>(Method::DELETE, &format!("/storage/{uuid}"), None)
            .await?;
        info!("Deleted storage {}", uuid);
        Ok(())
    }
}
