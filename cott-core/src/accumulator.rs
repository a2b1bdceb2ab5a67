//! Sample accumulation across repetitions
//!
//! Accumulators are created when their scope starts executing and are
//! consumed by `finalize` when it ends, so a finalized scope can never be
//! written to again. Sample lists are append-only.

use crate::metric::{Metric, MetricKey};
use crate::report::{CaseResults, StepResults, TestCaseSummary};
use crate::test_case::TestCase;
use std::collections::BTreeMap;
use tracing::trace;

/// Samples and errors gathered for one named step
#[derive(Debug, Clone)]
pub struct StepAccumulator {
    step: String,
    samples: BTreeMap<MetricKey, Vec<f64>>,
    errors: Vec<String>,
}

impl StepAccumulator {
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            samples: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    /// Append one observation under `key`
    pub fn add_sample(&mut self, key: MetricKey, value: f64) {
        trace!(step = %self.step, metric = %key, value, "add step sample");
        self.samples.entry(key).or_default().push(value);
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Samples recorded so far under `key`
    pub fn samples(&self, key: &MetricKey) -> &[f64] {
        self.samples.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.samples.keys()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Reduce every sampled key to its mean.
    ///
    /// Keys that never received a sample are absent from the result.
    pub fn finalize(self) -> StepResults {
        let metrics = self
            .samples
            .into_iter()
            .filter_map(|(key, values)| Metric::from_samples(key, &values))
            .collect();

        StepResults {
            step: self.step,
            metrics,
            errors: self.errors,
        }
    }
}

/// One case's step accumulators plus case-level errors
#[derive(Debug, Clone)]
pub struct CaseAccumulator {
    test_case: TestCase,
    steps: Vec<StepAccumulator>,
    errors: Vec<String>,
}

impl CaseAccumulator {
    pub fn new(test_case: TestCase) -> Self {
        Self {
            test_case,
            steps: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn test_case(&self) -> &TestCase {
        &self.test_case
    }

    /// Accumulator for `name`, created on first use.
    ///
    /// Steps keep the order in which they were first seen.
    pub fn step_mut(&mut self, name: &str) -> &mut StepAccumulator {
        let index = match self.steps.iter().position(|s| s.step == name) {
            Some(index) => index,
            None => {
                self.steps.push(StepAccumulator::new(name));
                self.steps.len() - 1
            }
        };
        &mut self.steps[index]
    }

    pub fn step(&self, name: &str) -> Option<&StepAccumulator> {
        self.steps.iter().find(|s| s.step == name)
    }

    /// Record an error that never reached a step (configuration, launch)
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn finalize(self) -> CaseResults {
        CaseResults {
            test_case: TestCaseSummary::from(&self.test_case),
            steps_results: self
                .steps
                .into_iter()
                .map(StepAccumulator::finalize)
                .collect(),
            errors: self.errors,
        }
    }
}
