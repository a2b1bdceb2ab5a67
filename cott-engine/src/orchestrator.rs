//! Case orchestrator: N repetitions of a case's step sequence

use crate::error::{EngineError, EngineResult};
use crate::runner::StepRunner;
use crate::steps::{
    self, CloseConnection, CreateDatabase, DropDatabase, OpenConnection, StartUp, Step,
    SwitchDatabase,
};
use cott_config::ExecutionConfig;
use cott_core::{CaseAccumulator, CaseResults, TestCase};
use cott_drivers::ComponentDriver;
use cott_resilience::RetryPolicy;
use std::collections::HashSet;
use tracing::{debug, info};

/// The step sequence of one repetition
pub struct RepetitionPlan {
    /// Connect and wait for readiness
    pub preamble: Vec<Box<dyn Step>>,

    /// Run unmeasured after the preamble; failure is only logged
    pub cleanup: Vec<Box<dyn Step>>,

    pub body: Vec<Box<dyn Step>>,

    /// Measured when the repetition succeeded, best-effort otherwise
    pub teardown: Vec<Box<dyn Step>>,
}

impl RepetitionPlan {
    /// Connect, wait for readiness, drop any stale database, create and
    /// enter a fresh one, run the declared steps, then leave, drop it and
    /// disconnect
    pub fn canonical(test_case: &TestCase, execution: &ExecutionConfig) -> EngineResult<Self> {
        let database = execution.resource_name.as_str();
        let readiness = RetryPolicy::fixed(
            execution.readiness_interval,
            execution.readiness_max_attempts,
        );

        let mut body = vec![
            Box::new(CreateDatabase::new(database)) as Box<dyn Step>,
            Box::new(SwitchDatabase::to(database)),
        ];
        body.extend(test_case.step_definitions().iter().map(steps::from_definition));

        let plan = Self {
            preamble: vec![
                Box::new(OpenConnection) as Box<dyn Step>,
                Box::new(StartUp::new(readiness)),
            ],
            cleanup: vec![Box::new(DropDatabase::new(database)) as Box<dyn Step>],
            body,
            teardown: vec![
                Box::new(SwitchDatabase::to_default()) as Box<dyn Step>,
                Box::new(DropDatabase::new(database)),
                Box::new(CloseConnection),
            ],
        };
        plan.check_unique_names()?;
        Ok(plan)
    }

    /// Every measured step needs its own accumulator
    pub fn check_unique_names(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        let measured = self
            .preamble
            .iter()
            .chain(&self.body)
            .chain(&self.teardown);
        for step in measured {
            if !seen.insert(step.name()) {
                return Err(EngineError::Configuration(format!(
                    "duplicate step name '{}'",
                    step.name()
                )));
            }
        }
        Ok(())
    }
}

/// Runs one case against one instance
pub struct CaseOrchestrator {
    runner: StepRunner,
}

impl CaseOrchestrator {
    pub fn new(runner: StepRunner) -> Self {
        Self { runner }
    }

    /// Run every repetition and finalize the accumulated results
    ///
    /// A failing step aborts only the repetition it belongs to.
    pub async fn run_case(
        &self,
        test_case: TestCase,
        plan: &RepetitionPlan,
        driver: &mut dyn ComponentDriver,
    ) -> CaseResults {
        let repetitions = test_case.repetition_count();
        let case_name = test_case.display_name();
        let mut accumulator = CaseAccumulator::new(test_case);

        info!(case = %case_name, repetitions, "Running test case");

        for repetition in 1..=repetitions {
            let succeeded = self
                .run_repetition(plan, driver, repetition, &mut accumulator)
                .await;
            debug!(case = %case_name, repetition, succeeded, "Repetition finished");
        }

        let results = accumulator.finalize();
        info!(
            case = %case_name,
            steps = results.steps_results.len(),
            errors = results.all_errors().len(),
            "Test case finished"
        );
        results
    }

    async fn run_repetition(
        &self,
        plan: &RepetitionPlan,
        driver: &mut dyn ComponentDriver,
        repetition: u32,
        accumulator: &mut CaseAccumulator,
    ) -> bool {
        let mut succeeded = self
            .run_measured(&plan.preamble, driver, repetition, accumulator)
            .await;

        if succeeded {
            // The resource may simply not exist
            run_best_effort(&plan.cleanup, driver, repetition).await;
            succeeded = self
                .run_measured(&plan.body, driver, repetition, accumulator)
                .await;
        }

        if succeeded {
            for step in &plan.teardown {
                let step_accumulator = accumulator.step_mut(step.name());
                if self
                    .runner
                    .run(step.as_ref(), driver, repetition, step_accumulator)
                    .await
                    .is_err()
                {
                    succeeded = false;
                }
            }
        } else {
            run_best_effort(&plan.teardown, driver, repetition).await;
        }

        succeeded
    }

    /// Run steps in order, stopping at the first failure
    async fn run_measured(
        &self,
        steps: &[Box<dyn Step>],
        driver: &mut dyn ComponentDriver,
        repetition: u32,
        accumulator: &mut CaseAccumulator,
    ) -> bool {
        for step in steps {
            let step_accumulator = accumulator.step_mut(step.name());
            if self
                .runner
                .run(step.as_ref(), driver, repetition, step_accumulator)
                .await
                .is_err()
            {
                return false;
            }
        }
        true
    }
}

async fn run_best_effort(
    steps: &[Box<dyn Step>],
    driver: &mut dyn ComponentDriver,
    repetition: u32,
) {
    for step in steps {
        if let Err(err) = step.run(driver).await {
            debug!(
                step = %step.name(),
                repetition,
                error = %err,
                "Unmeasured step failed"
            );
        }
    }
}

impl Default for CaseOrchestrator {
    fn default() -> Self {
        Self::new(StepRunner::default())
    }
}
