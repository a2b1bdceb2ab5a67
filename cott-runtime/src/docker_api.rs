//! Runtime backed by the Docker Engine HTTP API

use crate::error::{RuntimeError, RuntimeResult};
use crate::snapshot::ResourceSnapshot;
use crate::{InstanceId, InstanceRuntime, LaunchSpec};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

/// Drives containers through the Engine API
#[derive(Debug, Clone)]
pub struct DockerApiRuntime {
    client: Client,
    base_url: Url,
    pull_images: bool,
    stop_timeout: Duration,
}

impl DockerApiRuntime {
    /// Create a runtime for `endpoint`, e.g. `http://127.0.0.1:2375`
    pub fn new(endpoint: &str, request_timeout: Duration) -> RuntimeResult<Self> {
        let base_url = Url::parse(endpoint)?;
        let client = Client::builder().timeout(request_timeout).build()?;

        debug!(
            "Creating Docker API runtime for {} with timeout: {}s",
            base_url,
            request_timeout.as_secs()
        );

        Ok(Self {
            client,
            base_url,
            pull_images: true,
            stop_timeout: Duration::from_secs(10),
        })
    }

    pub fn with_pull_images(mut self, pull_images: bool) -> Self {
        self.pull_images = pull_images;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Body of `POST /containers/create` for `spec`
    pub fn create_body(spec: &LaunchSpec) -> JsonValue {
        let port_key = format!("{}/tcp", spec.port);
        json!({
            "Image": spec.image,
            "Env": spec.env_pairs(),
            "ExposedPorts": { (port_key.clone()): {} },
            "HostConfig": {
                "PortBindings": {
                    (port_key): [{ "HostIp": "0.0.0.0", "HostPort": spec.port.to_string() }]
                }
            }
        })
    }

    fn url(&self, path: &str) -> RuntimeResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn start(&self, id: &InstanceId) -> RuntimeResult<()> {
        let url = self.url(&format!("/containers/{}/start", id))?;
        Self::check(self.client.post(url).send().await?).await?;
        Ok(())
    }

    /// Remove a container that was created but never became usable
    async fn force_remove(&self, id: &InstanceId) {
        let result = async {
            let mut url = self.url(&format!("/containers/{}", id))?;
            url.query_pairs_mut().append_pair("force", "true");
            Self::check(self.client.delete(url).send().await?).await?;
            Ok::<(), RuntimeError>(())
        }
        .await;

        match result {
            Ok(()) => debug!(id = %id, "Removed container that failed to start"),
            Err(err) => warn!(id = %id, error = %err, "Failed to remove container that failed to start"),
        }
    }

    /// Map a non-success response to an API error carrying the daemon's message
    async fn check(response: Response) -> RuntimeResult<Response> {
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_MODIFIED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<JsonValue>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(JsonValue::as_str).map(str::to_string))
            .unwrap_or(body);

        Err(RuntimeError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl InstanceRuntime for DockerApiRuntime {
    fn name(&self) -> &'static str {
        "docker-api"
    }

    fn pulls_images(&self) -> bool {
        self.pull_images
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        let mut url = self.url("/images/create")?;
        url.query_pairs_mut().append_pair("fromImage", image);

        let response = Self::check(self.client.post(url).send().await?).await?;
        let progress = response.text().await?;
        trace!("{}", progress);

        // Pull failures after the headers were sent arrive as progress lines
        for line in progress.lines() {
            if let Ok(event) = serde_json::from_str::<JsonValue>(line) {
                if let Some(error) = event.get("error").and_then(JsonValue::as_str) {
                    return Err(RuntimeError::Api {
                        status: StatusCode::OK.as_u16(),
                        message: error.to_string(),
                    });
                }
            }
        }

        debug!(image = %image, "Container image pulled");
        Ok(())
    }

    async fn launch(&self, spec: &LaunchSpec) -> RuntimeResult<InstanceId> {
        let response = self
            .client
            .post(self.url("/containers/create")?)
            .json(&Self::create_body(spec))
            .send()
            .await?;
        let created: JsonValue = Self::check(response).await?.json().await?;
        let id = created
            .get("Id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                RuntimeError::UnexpectedOutput("container create response has no Id".to_string())
            })?
            .to_string();
        debug!(image = %spec.image, id = %id, "Container created");

        let id = InstanceId::new(id);
        if let Err(err) = self.start(&id).await {
            self.force_remove(&id).await;
            return Err(err);
        }
        debug!(image = %spec.image, id = %id, "Container started");

        Ok(id)
    }

    async fn stop(&self, id: &InstanceId) -> RuntimeResult<()> {
        let mut url = self.url(&format!("/containers/{}/stop", id))?;
        url.query_pairs_mut()
            .append_pair("t", &self.stop_timeout.as_secs().to_string());

        Self::check(self.client.post(url).send().await?).await?;
        debug!(id = %id, "Container stopped");
        Ok(())
    }

    async fn remove(&self, id: &InstanceId) -> RuntimeResult<()> {
        let url = self.url(&format!("/containers/{}", id))?;
        Self::check(self.client.delete(url).send().await?).await?;
        debug!(id = %id, "Container removed");
        Ok(())
    }

    async fn resource_snapshot(&self, id: &InstanceId) -> RuntimeResult<ResourceSnapshot> {
        let mut url = self.url(&format!("/containers/{}/stats", id))?;
        url.query_pairs_mut().append_pair("stream", "false");

        let stats: JsonValue = Self::check(self.client.get(url).send().await?)
            .await?
            .json()
            .await?;
        Ok(parse_engine_stats(&stats))
    }
}

/// Extract a snapshot from an Engine API stats document
///
/// Block I/O is summed over devices and network counters over interfaces.
/// Sections missing from the document (cgroup v2 hosts often omit blkio)
/// leave the matching fields empty.
pub fn parse_engine_stats(stats: &JsonValue) -> ResourceSnapshot {
    let cpu_time_nanos = stats
        .pointer("/cpu_stats/cpu_usage/total_usage")
        .and_then(JsonValue::as_u64);
    let memory_bytes = stats
        .pointer("/memory_stats/usage")
        .and_then(JsonValue::as_u64);

    let (block_read_bytes, block_write_bytes) = match stats
        .pointer("/blkio_stats/io_service_bytes_recursive")
        .and_then(JsonValue::as_array)
    {
        Some(entries) => {
            let sum_op = |op: &str| {
                entries
                    .iter()
                    .filter(|e| {
                        e.get("op")
                            .and_then(JsonValue::as_str)
                            .is_some_and(|o| o.eq_ignore_ascii_case(op))
                    })
                    .filter_map(|e| e.get("value").and_then(JsonValue::as_u64))
                    .sum::<u64>()
            };
            (Some(sum_op("read")), Some(sum_op("write")))
        }
        None => (None, None),
    };

    let (net_rx_bytes, net_tx_bytes) = match stats.get("networks").and_then(JsonValue::as_object)
    {
        Some(interfaces) => {
            let sum_field = |field: &str| {
                interfaces
                    .values()
                    .filter_map(|i| i.get(field).and_then(JsonValue::as_u64))
                    .sum::<u64>()
            };
            (Some(sum_field("rx_bytes")), Some(sum_field("tx_bytes")))
        }
        None => (None, None),
    };

    ResourceSnapshot {
        cpu_time_nanos,
        memory_bytes,
        block_read_bytes,
        block_write_bytes,
        net_rx_bytes,
        net_tx_bytes,
    }
}
