//! Report builder: every declared case, one report

use crate::error::{EngineError, EngineResult};
use crate::factory::{DefaultDriverFactory, DriverFactory};
use crate::orchestrator::{CaseOrchestrator, RepetitionPlan};
use crate::runner::{ResourceSampler, StepRunner};
use cott_config::ExecutionConfig;
use cott_core::{CaseAccumulator, CaseResults, Report, TestCase};
use cott_runtime::{InstanceId, InstanceRuntime, LaunchSpec};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs test cases against freshly launched instances
pub struct ReportBuilder {
    runtime: Arc<dyn InstanceRuntime>,
    drivers: Arc<dyn DriverFactory>,
    execution: ExecutionConfig,
}

impl ReportBuilder {
    pub fn new(runtime: Arc<dyn InstanceRuntime>, execution: ExecutionConfig) -> Self {
        Self {
            runtime,
            drivers: Arc::new(DefaultDriverFactory),
            execution,
        }
    }

    pub fn with_driver_factory(mut self, drivers: Arc<dyn DriverFactory>) -> Self {
        self.drivers = drivers;
        self
    }

    /// Run every case in declaration order
    ///
    /// Per-case failures end up inside the report; only an empty case list
    /// is returned as an error.
    pub async fn run(&self, test_cases: &[TestCase]) -> EngineResult<Report> {
        if test_cases.is_empty() {
            return Err(EngineError::NoTestCases);
        }

        let mut report = Report::new();
        for test_case in test_cases {
            report.add_case_results(self.run_case(test_case).await);
        }

        info!(
            cases = report.len(),
            clean = report.clean_cases(),
            "All test cases finished"
        );
        Ok(report)
    }

    async fn run_case(&self, test_case: &TestCase) -> CaseResults {
        let name = test_case.display_name();

        let prepared = self.drivers.create(test_case, &self.execution.host).and_then(|driver| {
            RepetitionPlan::canonical(test_case, &self.execution).map(|plan| (driver, plan))
        });
        let (mut driver, plan) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                error!(case = %name, error = %err, "Test case cannot be constructed");
                return CaseResults::configuration_error(test_case, err.to_string());
            }
        };

        let instance = match self.launch(test_case).await {
            Ok(instance) => instance,
            Err(message) => {
                error!(case = %name, error = %message, "Instance launch failed");
                let mut accumulator = CaseAccumulator::new(test_case.clone());
                accumulator.add_error(message);
                return accumulator.finalize();
            }
        };

        let sampler = ResourceSampler::new(
            Arc::clone(&self.runtime),
            instance.clone(),
            test_case.resource_metrics.clone(),
        );
        let orchestrator = CaseOrchestrator::new(StepRunner::new(sampler));
        let results = orchestrator
            .run_case(test_case.clone(), &plan, driver.as_mut())
            .await;

        self.dispose(&instance).await;
        results
    }

    async fn launch(&self, test_case: &TestCase) -> Result<InstanceId, String> {
        if self.runtime.pulls_images() {
            self.runtime
                .pull_image(&test_case.image)
                .await
                .map_err(|e| format!("failed to pull image '{}': {}", test_case.image, e))?;
        }

        let spec = LaunchSpec::new(test_case.image.clone(), test_case.port)
            .with_env(test_case.env_vars.clone());
        let instance = self
            .runtime
            .launch(&spec)
            .await
            .map_err(|e| format!("failed to launch instance of '{}': {}", test_case.image, e))?;

        info!(
            runtime = self.runtime.name(),
            image = %test_case.image,
            instance = %instance,
            "Instance launched"
        );
        Ok(instance)
    }

    /// Stop and remove the instance; failures are logged only
    async fn dispose(&self, instance: &InstanceId) {
        if let Err(err) = self.runtime.stop(instance).await {
            warn!(instance = %instance, error = %err, "Failed to stop instance");
        }
        if let Err(err) = self.runtime.remove(instance).await {
            warn!(instance = %instance, error = %err, "Failed to remove instance");
        }
    }
}
