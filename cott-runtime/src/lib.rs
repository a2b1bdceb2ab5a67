//! Instance runtimes for cott
//!
//! A runtime launches the container a test case benchmarks, reports its
//! resource usage on demand and tears it down afterwards. Two
//! implementations are provided: [`DockerCliRuntime`] shells out to the
//! `docker` binary and [`DockerApiRuntime`] talks to the Docker Engine HTTP
//! API directly.

pub mod docker_api;
pub mod docker_cli;
pub mod error;
pub mod snapshot;

pub use docker_api::DockerApiRuntime;
pub use docker_cli::DockerCliRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use snapshot::ResourceSnapshot;

use async_trait::async_trait;
use cott_config::RuntimeConfig;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier the runtime assigned to a launched instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to launch
///
/// `port` is exposed by the container and published on the same host port.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub port: u16,
}

impl LaunchSpec {
    pub fn new(image: impl Into<String>, port: u16) -> Self {
        Self {
            image: image.into(),
            env: BTreeMap::new(),
            port,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// `KEY=VALUE` pairs in key order
    pub fn env_pairs(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }
}

/// Launches instances and reports on them
#[async_trait]
pub trait InstanceRuntime: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether `pull_image` should run before every launch
    fn pulls_images(&self) -> bool;

    async fn pull_image(&self, image: &str) -> RuntimeResult<()>;

    /// Create and start an instance
    async fn launch(&self, spec: &LaunchSpec) -> RuntimeResult<InstanceId>;

    async fn stop(&self, id: &InstanceId) -> RuntimeResult<()>;

    async fn remove(&self, id: &InstanceId) -> RuntimeResult<()>;

    /// Point-in-time resource counters of a running instance
    async fn resource_snapshot(&self, id: &InstanceId) -> RuntimeResult<ResourceSnapshot>;
}

/// Build the runtime selected by configuration
pub fn from_config(config: &RuntimeConfig) -> RuntimeResult<Arc<dyn InstanceRuntime>> {
    match config {
        RuntimeConfig::DockerCli {
            binary,
            pull_images,
            stop_timeout,
        } => Ok(Arc::new(
            DockerCliRuntime::new(binary.clone())
                .with_pull_images(*pull_images)
                .with_stop_timeout(*stop_timeout),
        )),
        RuntimeConfig::DockerApi {
            endpoint,
            pull_images,
            stop_timeout,
            request_timeout,
        } => Ok(Arc::new(
            DockerApiRuntime::new(endpoint, *request_timeout)?
                .with_pull_images(*pull_images)
                .with_stop_timeout(*stop_timeout),
        )),
    }
}
