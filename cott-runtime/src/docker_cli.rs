//! Runtime backed by the local `docker` binary

use crate::error::{RuntimeError, RuntimeResult};
use crate::snapshot::{parse_human_size, parse_size_pair, ResourceSnapshot};
use crate::{InstanceId, InstanceRuntime, LaunchSpec};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Drives containers through `docker` subcommands
///
/// `docker stats` does not expose cumulative CPU time, so snapshots from this
/// runtime never carry `cpu_time_nanos`.
#[derive(Debug, Clone)]
pub struct DockerCliRuntime {
    binary: String,
    pull_images: bool,
    stop_timeout: Duration,
}

impl DockerCliRuntime {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            pull_images: true,
            stop_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_pull_images(mut self, pull_images: bool) -> Self {
        self.pull_images = pull_images;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Arguments of the `docker create` invocation for `spec`
    pub fn create_args(spec: &LaunchSpec) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "--publish".to_string(),
            format!("{}:{}", spec.port, spec.port),
        ];
        for pair in spec.env_pairs() {
            args.push("--env".to_string());
            args.push(pair);
        }
        args.push(spec.image.clone());
        args
    }

    /// Remove a container that was created but never became usable
    async fn force_remove(&self, id: &InstanceId) {
        match self
            .docker(&["rm".to_string(), "--force".to_string(), id.to_string()])
            .await
        {
            Ok(_) => debug!(id = %id, "Removed container that failed to start"),
            Err(err) => warn!(id = %id, error = %err, "Failed to remove container that failed to start"),
        }
    }

    async fn docker(&self, args: &[String]) -> RuntimeResult<String> {
        let command = format!("{} {}", self.binary, args.first().map_or("", String::as_str));
        trace!("Running {}", command);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RuntimeError::CommandFailed { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl InstanceRuntime for DockerCliRuntime {
    fn name(&self) -> &'static str {
        "docker-cli"
    }

    fn pulls_images(&self) -> bool {
        self.pull_images
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        self.docker(&["pull".to_string(), "--quiet".to_string(), image.to_string()])
            .await?;
        debug!(image = %image, "Container image pulled");
        Ok(())
    }

    async fn launch(&self, spec: &LaunchSpec) -> RuntimeResult<InstanceId> {
        let stdout = self.docker(&Self::create_args(spec)).await?;
        let id = stdout
            .lines()
            .last()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(InstanceId::new)
            .ok_or_else(|| {
                RuntimeError::UnexpectedOutput("docker create printed no container id".to_string())
            })?;
        debug!(image = %spec.image, id = %id, "Container created");

        if let Err(err) = self.docker(&["start".to_string(), id.to_string()]).await {
            self.force_remove(&id).await;
            return Err(err);
        }

        debug!(image = %spec.image, id = %id, "Container started");
        Ok(id)
    }

    async fn stop(&self, id: &InstanceId) -> RuntimeResult<()> {
        self.docker(&[
            "stop".to_string(),
            "--time".to_string(),
            self.stop_timeout.as_secs().to_string(),
            id.to_string(),
        ])
        .await?;
        debug!(id = %id, "Container stopped");
        Ok(())
    }

    async fn remove(&self, id: &InstanceId) -> RuntimeResult<()> {
        self.docker(&["rm".to_string(), id.to_string()]).await?;
        debug!(id = %id, "Container removed");
        Ok(())
    }

    async fn resource_snapshot(&self, id: &InstanceId) -> RuntimeResult<ResourceSnapshot> {
        let stdout = self
            .docker(&[
                "stats".to_string(),
                "--no-stream".to_string(),
                "--format".to_string(),
                "{{json .}}".to_string(),
                id.to_string(),
            ])
            .await?;
        parse_stats_line(&stdout)
    }
}

/// One line of `docker stats --format '{{json .}}'`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatsLine {
    mem_usage: String,
    #[serde(rename = "BlockIO")]
    block_io: String,
    #[serde(rename = "NetIO")]
    net_io: String,
}

/// Turn a `docker stats` JSON line into a snapshot
///
/// Columns the daemon reports as `--` are left empty.
pub fn parse_stats_line(line: &str) -> RuntimeResult<ResourceSnapshot> {
    let stats: StatsLine = serde_json::from_str(line.trim()).map_err(|e| {
        RuntimeError::UnexpectedOutput(format!("docker stats output is not JSON: {}", e))
    })?;

    let memory_bytes = stats
        .mem_usage
        .split_once('/')
        .and_then(|(used, _)| parse_human_size(used));
    let block = parse_size_pair(&stats.block_io);
    let net = parse_size_pair(&stats.net_io);

    Ok(ResourceSnapshot {
        cpu_time_nanos: None,
        memory_bytes,
        block_read_bytes: block.map(|(read, _)| read),
        block_write_bytes: block.map(|(_, write)| write),
        net_rx_bytes: net.map(|(rx, _)| rx),
        net_tx_bytes: net.map(|(_, tx)| tx),
    })
}
