//! Finalized results and the run report

use crate::metric::{Metric, MetricKey};
use crate::test_case::TestCase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable per-step outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepResults {
    pub step: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StepResults {
    pub fn metric(&self, key: &MetricKey) -> Option<&Metric> {
        self.metrics.iter().find(|m| &m.key == key)
    }
}

/// The parts of a test case that are safe to publish.
///
/// Environment values carry credentials and are never written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestCaseSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub component_type: String,
    pub image: String,
    pub port: u16,
    pub repetitions: u32,
}

impl From<&TestCase> for TestCaseSummary {
    fn from(test_case: &TestCase) -> Self {
        Self {
            label: test_case.label.clone(),
            component_type: test_case.component_type.clone(),
            image: test_case.image.clone(),
            port: test_case.port,
            repetitions: test_case.repetition_count(),
        }
    }
}

/// Immutable per-case outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CaseResults {
    pub test_case: TestCaseSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps_results: Vec<StepResults>,
    /// Errors that never reached a step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CaseResults {
    /// Results for a case that could not be constructed
    pub fn configuration_error(test_case: &TestCase, error: impl Into<String>) -> Self {
        Self {
            test_case: TestCaseSummary::from(test_case),
            steps_results: Vec::new(),
            errors: vec![error.into()],
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepResults> {
        self.steps_results.iter().find(|s| s.step == name)
    }

    /// Case-level errors followed by every step's errors, in step order
    pub fn all_errors(&self) -> Vec<&str> {
        self.errors
            .iter()
            .chain(self.steps_results.iter().flat_map(|s| s.errors.iter()))
            .map(String::as_str)
            .collect()
    }

    pub fn has_metrics(&self) -> bool {
        self.steps_results.iter().any(|s| !s.metrics.is_empty())
    }

    pub fn is_clean(&self) -> bool {
        self.all_errors().is_empty()
    }
}

/// Final artefact of a run: one entry per declared case, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub test_case_results: Vec<CaseResults>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            test_case_results: Vec::new(),
        }
    }

    pub fn add_case_results(&mut self, results: CaseResults) {
        self.test_case_results.push(results);
    }

    pub fn len(&self) -> usize {
        self.test_case_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_case_results.is_empty()
    }

    /// Number of entries that finished without any error
    pub fn clean_cases(&self) -> usize {
        self.test_case_results
            .iter()
            .filter(|c| c.is_clean())
            .count()
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::CaseAccumulator;

    #[test]
    fn test_configuration_error_entry() {
        let case = TestCase::new("mongo", "mongo:7", 27017).with_env_var("SECRET", "hunter2");
        let results = CaseResults::configuration_error(&case, "unknown component");

        assert!(!results.has_metrics());
        assert_eq!(results.all_errors(), vec!["unknown component"]);
        assert_eq!(results.test_case.repetitions, 16);
    }

    #[test]
    fn test_report_json_shape_hides_env() {
        let case = TestCase::new("postgres", "postgres:16", 5432)
            .with_env_var("POSTGRES_PASSWORD", "hunter2")
            .with_repetitions(2);
        let mut acc = CaseAccumulator::new(case);
        acc.step_mut("createDatabase")
            .add_sample(MetricKey::duration(), 12.0);
        acc.step_mut("createDatabase")
            .add_error("repetition 2: already exists");

        let mut report = Report::new();
        report.add_case_results(acc.finalize());

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("hunter2"));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value["test-case-results"][0];
        assert_eq!(entry["test-case"]["component-type"], "postgres");
        assert_eq!(entry["steps-results"][0]["step"], "createDatabase");
        assert_eq!(entry["steps-results"][0]["metrics"][0]["value"], 12.0);
        assert_eq!(
            entry["steps-results"][0]["errors"][0],
            "repetition 2: already exists"
        );
        assert!(value["generated-at"].is_string());
    }

    #[test]
    fn test_all_errors_order() {
        let mut acc = CaseAccumulator::new(TestCase::new("postgres", "postgres:16", 5432));
        acc.step_mut("a").add_error("a failed");
        acc.step_mut("b").add_error("b failed");
        acc.add_error("launch failed");

        let results = acc.finalize();
        assert_eq!(
            results.all_errors(),
            vec!["launch failed", "a failed", "b failed"]
        );
        assert!(!results.is_clean());
    }
}
