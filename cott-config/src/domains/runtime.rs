//! Instance runtime configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which container runtime launches benchmark instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeConfig {
    /// Drive the local `docker` binary
    DockerCli {
        #[serde(default = "default_docker_binary")]
        binary: String,

        #[serde(default = "crate::domains::utils::default_true")]
        pull_images: bool,

        /// Grace period passed to `docker stop`
        #[serde(
            with = "crate::domains::utils::serde_duration",
            default = "default_stop_timeout"
        )]
        stop_timeout: Duration,
    },

    /// Talk to the Docker Engine HTTP API
    DockerApi {
        /// e.g. `http://127.0.0.1:2375`
        endpoint: String,

        #[serde(default = "crate::domains::utils::default_true")]
        pull_images: bool,

        #[serde(
            with = "crate::domains::utils::serde_duration",
            default = "default_stop_timeout"
        )]
        stop_timeout: Duration,

        /// Per-request timeout; image pulls can be slow
        #[serde(
            with = "crate::domains::utils::serde_duration",
            default = "default_request_timeout"
        )]
        request_timeout: Duration,
    },
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig::DockerCli {
            binary: default_docker_binary(),
            pull_images: true,
            stop_timeout: default_stop_timeout(),
        }
    }
}

impl RuntimeConfig {
    pub fn pull_images(&self) -> bool {
        match self {
            RuntimeConfig::DockerCli { pull_images, .. }
            | RuntimeConfig::DockerApi { pull_images, .. } => *pull_images,
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        match self {
            RuntimeConfig::DockerCli { stop_timeout, .. }
            | RuntimeConfig::DockerApi { stop_timeout, .. } => *stop_timeout,
        }
    }
}

impl Validatable for RuntimeConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self {
            RuntimeConfig::DockerCli { binary, .. } => {
                validate_required_string(binary, "binary", self.domain_name())?;
            }
            RuntimeConfig::DockerApi {
                endpoint,
                request_timeout,
                ..
            } => {
                validate_url(endpoint, "endpoint", self.domain_name())?;
                validate_positive(
                    request_timeout.as_secs(),
                    "request_timeout",
                    self.domain_name(),
                )?;
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runtime"
    }
}

fn default_docker_binary() -> String {
    "docker".to_string()
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}
