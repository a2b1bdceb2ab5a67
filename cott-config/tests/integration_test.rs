//! Integration tests for cott-config

use cott_config::*;
use cott_core::{ResourceKind, StepDefinition, TableKind};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use temp_env::{with_vars, with_vars_unset};

const OVERRIDABLE: [&str; 8] = [
    "COTT_LOG_LEVEL",
    "COTT_LOG_FORMAT",
    "COTT_LOG_FILE_PATH",
    "COTT_REPORT_FILE_PATH",
    "COTT_REPORT_FORMAT",
    "COTT_DOCKER_BINARY",
    "COTT_RESOURCE_NAME",
    "COTT_READINESS_MAX_ATTEMPTS",
];

const MINIMAL: &str = r#"
test_cases:
  - component_type: postgres
    image: postgres:16
    port: 5432
"#;

#[test]
fn test_minimal_config_uses_defaults() {
    with_vars_unset(OVERRIDABLE, || {
        let config = ConfigLoader::new().from_yaml_str(MINIMAL).unwrap();

        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.report, ReportConfig::default());
        assert_eq!(config.runtime, RuntimeConfig::default());
        assert_eq!(config.execution, ExecutionConfig::default());
        assert_eq!(config.test_cases.len(), 1);
        assert_eq!(config.test_cases[0].repetition_count(), 16);
    });
}

#[test]
fn test_comprehensive_config() {
    let yaml = r#"
logging:
  level: debug
  format: json
  include_location: true
  targets:
    - type: console
      level: warn
    - type: file
      path: /var/log/cott/cott.log
      rotation: daily

report:
  file_path: out/report.yaml
  format: yaml
  create_dirs: false

runtime:
  type: docker_api
  endpoint: http://10.0.0.5:2375
  stop_timeout: 3

execution:
  resource_name: bench
  host: 10.0.0.5
  readiness_interval_ms: 50
  readiness_max_attempts: 20

test_cases:
  - label: pg16
    component_type: postgres
    image: postgres:16
    port: 5433
    repetitions: 4
    env_vars:
      POSTGRES_USER: cott
      POSTGRES_PASSWORD: secret
    resource_metrics: [memory, network]
    steps:
      - kind: create_table
        table: key_value
      - kind: insert_rows
        table: key_value
        count: 1000
      - kind: drop_table
        table: key_value
  - component_type: kafka
    image: bitnami/kafka:3
    port: 9092
"#;

    with_vars_unset(OVERRIDABLE, || {
        let config = ConfigLoader::new().from_yaml_str(yaml).unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.include_location);
        assert_eq!(
            config.logging.file_target(),
            Some(&LogTarget::File {
                path: PathBuf::from("/var/log/cott/cott.log"),
                level: None,
                rotation: FileRotation::Daily,
            })
        );

        assert_eq!(config.report.format, ReportFormat::Yaml);
        assert!(!config.report.create_dirs);

        assert_eq!(config.runtime.stop_timeout(), Duration::from_secs(3));
        assert!(matches!(config.runtime, RuntimeConfig::DockerApi { .. }));

        assert_eq!(config.execution.resource_name, "bench");
        assert_eq!(config.execution.readiness_budget(), Duration::from_secs(1));

        let pg = &config.test_cases[0];
        assert_eq!(pg.label.as_deref(), Some("pg16"));
        assert_eq!(pg.repetition_count(), 4);
        assert_eq!(
            pg.resource_metrics.iter().copied().collect::<Vec<_>>(),
            vec![ResourceKind::Memory, ResourceKind::Network]
        );
        assert_eq!(pg.steps.len(), 3);
        assert_eq!(
            pg.steps[1],
            StepDefinition::InsertRows {
                table: TableKind::KeyValue,
                count: 1000,
                name: None,
            }
        );
        assert_eq!(config.test_cases[1].component_type, "kafka");
    });
}

#[test]
fn test_unknown_component_type_is_not_a_config_error() {
    let yaml = r#"
test_cases:
  - component_type: cassandra
    image: cassandra:4
    port: 9042
"#;
    with_vars_unset(OVERRIDABLE, || {
        let config = ConfigLoader::new().from_yaml_str(yaml).unwrap();
        assert!(config.test_cases[0].parse_component_type().is_err());
    });
}

#[test]
fn test_empty_test_cases_is_rejected() {
    with_vars_unset(OVERRIDABLE, || {
        let result = ConfigLoader::new().from_yaml_str("test_cases: []");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    });
}

#[test]
fn test_malformed_yaml_is_rejected() {
    with_vars_unset(OVERRIDABLE, || {
        let result = ConfigLoader::new().from_yaml_str("test_cases: [ {component_type: ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    });
}

#[test]
fn test_env_overrides() {
    let vars = vec![
        ("COTT_LOG_LEVEL", Some("trace")),
        ("COTT_LOG_FORMAT", Some("compact")),
        ("COTT_LOG_FILE_PATH", Some("/tmp/cott-test.log")),
        ("COTT_REPORT_FILE_PATH", Some("/tmp/cott-report.json")),
        ("COTT_REPORT_FORMAT", Some("json_compact")),
        ("COTT_DOCKER_BINARY", Some("/usr/local/bin/podman")),
        ("COTT_RESOURCE_NAME", Some("bench_db")),
        ("COTT_READINESS_MAX_ATTEMPTS", Some("5")),
    ];

    with_vars(vars, || {
        let config = ConfigLoader::new().from_yaml_str(MINIMAL).unwrap();

        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(matches!(
            config.logging.file_target(),
            Some(LogTarget::File { path, .. }) if path == &PathBuf::from("/tmp/cott-test.log")
        ));
        assert_eq!(
            config.report.file_path,
            PathBuf::from("/tmp/cott-report.json")
        );
        assert_eq!(config.report.format, ReportFormat::JsonCompact);
        assert_eq!(
            config.runtime,
            RuntimeConfig::DockerCli {
                binary: "/usr/local/bin/podman".to_string(),
                pull_images: true,
                stop_timeout: Duration::from_secs(10),
            }
        );
        assert_eq!(config.execution.resource_name, "bench_db");
        assert_eq!(config.execution.readiness_max_attempts, 5);
    });
}

#[test]
fn test_invalid_env_override() {
    let mut vars: Vec<(&str, Option<&str>)> = OVERRIDABLE
        .iter()
        .filter(|k| **k != "COTT_LOG_LEVEL")
        .map(|k| (*k, None))
        .collect();
    vars.push(("COTT_LOG_LEVEL", Some("loud")));

    with_vars(vars, || {
        let result = ConfigLoader::new().from_yaml_str(MINIMAL);
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    });
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();

    with_vars_unset(OVERRIDABLE, || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();
        assert_eq!(config.test_cases[0].image, "postgres:16");
    });
}

#[test]
fn test_missing_file() {
    let result = ConfigLoader::new().load(Some("/definitely/not/here/config.yaml"));
    assert!(matches!(result, Err(ConfigError::FileReadError(_))));
}
