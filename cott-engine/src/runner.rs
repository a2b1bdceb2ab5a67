//! Step runner: one measured invocation of one step

use crate::error::{EngineError, EngineResult};
use crate::steps::Step;
use cott_core::{MetricKey, ResourceKind, StepAccumulator};
use cott_drivers::ComponentDriver;
use cott_runtime::{InstanceId, InstanceRuntime, ResourceSnapshot};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Where resource snapshots come from and which kinds to record
#[derive(Clone)]
pub struct ResourceSampler {
    runtime: Arc<dyn InstanceRuntime>,
    instance: InstanceId,
    kinds: BTreeSet<ResourceKind>,
}

impl ResourceSampler {
    /// `None` when no kinds are requested; sampling is then skipped entirely
    pub fn new(
        runtime: Arc<dyn InstanceRuntime>,
        instance: InstanceId,
        kinds: BTreeSet<ResourceKind>,
    ) -> Option<Self> {
        if kinds.is_empty() {
            return None;
        }
        Some(Self {
            runtime,
            instance,
            kinds,
        })
    }

    pub fn kinds(&self) -> &BTreeSet<ResourceKind> {
        &self.kinds
    }

    async fn snapshot(&self) -> EngineResult<ResourceSnapshot> {
        self.runtime
            .resource_snapshot(&self.instance)
            .await
            .map_err(|e| EngineError::ResourceSnapshot(e.to_string()))
    }
}

/// Runs steps and feeds their accumulators
#[derive(Clone, Default)]
pub struct StepRunner {
    sampler: Option<ResourceSampler>,
}

impl StepRunner {
    pub fn new(sampler: Option<ResourceSampler>) -> Self {
        Self { sampler }
    }

    /// Run `step` once, recording samples or exactly one error
    ///
    /// A failed "before" snapshot skips the operation. A failed operation
    /// records no samples. A failed "after" snapshot keeps the duration but
    /// records no resource samples. Every failure is also returned so the
    /// caller can abort the repetition.
    pub async fn run(
        &self,
        step: &dyn Step,
        driver: &mut dyn ComponentDriver,
        repetition: u32,
        accumulator: &mut StepAccumulator,
    ) -> EngineResult<()> {
        let before = match &self.sampler {
            Some(sampler) => match sampler.snapshot().await {
                Ok(snapshot) => Some(snapshot),
                Err(err) => return Err(record_failure(accumulator, repetition, err)),
            },
            None => None,
        };

        let start = Instant::now();
        if let Err(err) = step.run(driver).await {
            return Err(record_failure(accumulator, repetition, err));
        }
        let micros = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        accumulator.add_sample(MetricKey::duration(), micros as f64);
        debug!(
            step = %step.name(),
            repetition,
            duration_us = micros,
            "Step finished"
        );

        if let (Some(sampler), Some(before)) = (&self.sampler, before) {
            let after = match sampler.snapshot().await {
                Ok(snapshot) => snapshot,
                Err(err) => return Err(record_failure(accumulator, repetition, err)),
            };
            record_resource_samples(accumulator, sampler.kinds(), &before, &after);
        }

        Ok(())
    }
}

fn record_failure(
    accumulator: &mut StepAccumulator,
    repetition: u32,
    err: EngineError,
) -> EngineError {
    warn!(step = %accumulator.step(), repetition, error = %err, "Error on step execution");
    accumulator.add_error(format!("repetition {}: {}", repetition, err));
    err
}

fn delta(before: Option<u64>, after: Option<u64>) -> Option<f64> {
    Some(after? as f64 - before? as f64)
}

/// Counters are recorded as `after - before`; memory as the absolute
/// reading plus its change over the step
pub fn record_resource_samples(
    accumulator: &mut StepAccumulator,
    kinds: &BTreeSet<ResourceKind>,
    before: &ResourceSnapshot,
    after: &ResourceSnapshot,
) {
    let mut record = |key: MetricKey, value: Option<f64>| {
        if let Some(value) = value {
            accumulator.add_sample(key, value);
        }
    };

    for kind in kinds {
        match kind {
            ResourceKind::Cpu => {
                record(
                    MetricKey::cpu_time(),
                    delta(before.cpu_time_nanos, after.cpu_time_nanos),
                );
            }
            ResourceKind::Memory => {
                record(
                    MetricKey::memory_usage(),
                    after.memory_bytes.map(|bytes| bytes as f64),
                );
                record(
                    MetricKey::memory_usage_diff(),
                    delta(before.memory_bytes, after.memory_bytes),
                );
            }
            ResourceKind::BlockIo => {
                record(
                    MetricKey::block_read(),
                    delta(before.block_read_bytes, after.block_read_bytes),
                );
                record(
                    MetricKey::block_write(),
                    delta(before.block_write_bytes, after.block_write_bytes),
                );
            }
            ResourceKind::Network => {
                record(
                    MetricKey::net_rx(),
                    delta(before.net_rx_bytes, after.net_rx_bytes),
                );
                record(
                    MetricKey::net_tx(),
                    delta(before.net_tx_bytes, after.net_tx_bytes),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(base: u64) -> ResourceSnapshot {
        ResourceSnapshot {
            cpu_time_nanos: Some(base * 1000),
            memory_bytes: Some(base * 10),
            block_read_bytes: Some(base),
            block_write_bytes: Some(base * 2),
            net_rx_bytes: Some(base * 3),
            net_tx_bytes: Some(base * 4),
        }
    }

    #[test]
    fn test_counters_are_deltas_and_memory_is_a_gauge() {
        let mut acc = StepAccumulator::new("createDatabase");
        record_resource_samples(&mut acc, &ResourceKind::all(), &snapshot(5), &snapshot(7));

        assert_eq!(acc.samples(&MetricKey::cpu_time()), &[2000.0]);
        assert_eq!(acc.samples(&MetricKey::memory_usage()), &[70.0]);
        assert_eq!(acc.samples(&MetricKey::memory_usage_diff()), &[20.0]);
        assert_eq!(acc.samples(&MetricKey::block_read()), &[2.0]);
        assert_eq!(acc.samples(&MetricKey::block_write()), &[4.0]);
        assert_eq!(acc.samples(&MetricKey::net_rx()), &[6.0]);
        assert_eq!(acc.samples(&MetricKey::net_tx()), &[8.0]);
    }

    #[test]
    fn test_memory_diff_can_be_negative() {
        let mut acc = StepAccumulator::new("dropDatabase");
        let kinds: BTreeSet<_> = [ResourceKind::Memory].into_iter().collect();
        record_resource_samples(&mut acc, &kinds, &snapshot(9), &snapshot(4));

        assert_eq!(acc.samples(&MetricKey::memory_usage()), &[40.0]);
        assert_eq!(acc.samples(&MetricKey::memory_usage_diff()), &[-50.0]);
        assert!(acc.samples(&MetricKey::cpu_time()).is_empty());
    }

    #[test]
    fn test_unsupported_fields_produce_no_samples() {
        let mut acc = StepAccumulator::new("startUp");
        let before = ResourceSnapshot {
            cpu_time_nanos: None,
            ..snapshot(1)
        };
        record_resource_samples(&mut acc, &ResourceKind::all(), &before, &snapshot(2));

        assert!(acc.samples(&MetricKey::cpu_time()).is_empty());
        assert_eq!(acc.keys().count(), 6);
    }
}
