//! Declared test cases and their step definitions

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Repetition count used when a case does not declare one (or declares 0)
pub const DEFAULT_REPETITIONS: u32 = 16;

/// Kind of infrastructure component a case benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Postgres,
    Kafka,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Postgres => "postgres",
            ComponentType::Kafka => "kafka",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(ComponentType::Postgres),
            "kafka" => Ok(ComponentType::Kafka),
            _ => Err(ParseError::UnknownComponentType(s.to_string())),
        }
    }
}

/// Resource-usage figure sampled around every step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Cpu,
    Memory,
    BlockIo,
    Network,
}

impl ResourceKind {
    pub fn all() -> BTreeSet<ResourceKind> {
        [
            ResourceKind::Cpu,
            ResourceKind::Memory,
            ResourceKind::BlockIo,
            ResourceKind::Network,
        ]
        .into_iter()
        .collect()
    }
}

/// Built-in benchmark tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// `key VARCHAR(255), value VARCHAR(255)`
    KeyValue,
    /// One hundred `REAL` sensor columns
    Measurement,
}

impl TableKind {
    /// Table name used in SQL
    pub fn table_name(&self) -> &'static str {
        match self {
            TableKind::KeyValue => "key_value",
            TableKind::Measurement => "measurement",
        }
    }

    /// Fragment used in generated step names
    fn step_label(&self) -> &'static str {
        match self {
            TableKind::KeyValue => "KeyValueTable",
            TableKind::Measurement => "MeasurementsTable",
        }
    }
}

/// A declared data step.
///
/// Each variant maps to one benchmarked driver operation. `name` overrides
/// the generated step name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDefinition {
    CreateTable {
        table: TableKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    DropTable {
        table: TableKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    InsertRows {
        table: TableKind,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    SelectById {
        table: TableKind,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    SelectByCondition {
        table: TableKind,
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Truncate {
        table: TableKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl StepDefinition {
    /// Step name: the explicit override, else one derived from kind and table
    pub fn name(&self) -> String {
        let (explicit, generated) = match self {
            StepDefinition::CreateTable { table, name } => {
                (name, format!("create{}", table.step_label()))
            }
            StepDefinition::DropTable { table, name } => {
                (name, format!("drop{}", table.step_label()))
            }
            StepDefinition::InsertRows { table, count, name } if *count == 1 => {
                (name, format!("singleInsert{}", table.step_label()))
            }
            StepDefinition::InsertRows { table, count, name } => {
                (name, format!("{}xInsert{}", count, table.step_label()))
            }
            StepDefinition::SelectById { table, count, name } => {
                (name, format!("{}xSelectById{}", count, table.step_label()))
            }
            StepDefinition::SelectByCondition { table, count, name } => {
                (name, format!("{}xSelectByCondition{}", count, table.step_label()))
            }
            StepDefinition::Truncate { table, name } => {
                (name, format!("truncate{}", table.step_label()))
            }
        };
        explicit.clone().unwrap_or(generated)
    }

    pub fn table(&self) -> TableKind {
        match self {
            StepDefinition::CreateTable { table, .. }
            | StepDefinition::DropTable { table, .. }
            | StepDefinition::InsertRows { table, .. }
            | StepDefinition::SelectById { table, .. }
            | StepDefinition::SelectByCondition { table, .. }
            | StepDefinition::Truncate { table, .. } => *table,
        }
    }

    /// The suite run when a case declares no steps of its own
    pub fn standard_suite() -> Vec<StepDefinition> {
        [TableKind::KeyValue, TableKind::Measurement]
            .into_iter()
            .flat_map(|table| {
                let mut steps = vec![StepDefinition::CreateTable { table, name: None }];
                steps.extend([1, 100, 1000, 10000].into_iter().map(|count| {
                    StepDefinition::InsertRows {
                        table,
                        count,
                        name: None,
                    }
                }));
                steps.push(StepDefinition::SelectById {
                    table,
                    count: 100,
                    name: None,
                });
                steps.push(StepDefinition::SelectByCondition {
                    table,
                    count: 100,
                    name: None,
                });
                steps.push(StepDefinition::Truncate { table, name: None });
                steps.push(StepDefinition::DropTable { table, name: None });
                steps
            })
            .collect()
    }
}

fn default_resource_metrics() -> BTreeSet<ResourceKind> {
    ResourceKind::all()
}

/// One declared benchmark target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Optional human label, used in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Component type as declared; parsed when the case is constructed
    pub component_type: String,

    /// Image the instance is launched from
    pub image: String,

    /// Port the component listens on, bound to the same host port
    pub port: u16,

    /// Environment passed to the instance (credentials live here)
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,

    /// Number of repetitions; 0 means [`DEFAULT_REPETITIONS`]
    #[serde(default)]
    pub repetitions: u32,

    /// Resource figures sampled around each step
    #[serde(default = "default_resource_metrics")]
    pub resource_metrics: BTreeSet<ResourceKind>,

    /// Declared data steps; empty means [`StepDefinition::standard_suite`]
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl TestCase {
    pub fn new(component_type: impl Into<String>, image: impl Into<String>, port: u16) -> Self {
        Self {
            label: None,
            component_type: component_type.into(),
            image: image.into(),
            port,
            env_vars: BTreeMap::new(),
            repetitions: 0,
            resource_metrics: default_resource_metrics(),
            steps: Vec::new(),
        }
    }

    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_steps(mut self, steps: Vec<StepDefinition>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_resource_metrics(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.resource_metrics = kinds.into_iter().collect();
        self
    }

    /// Effective repetition count
    pub fn repetition_count(&self) -> u32 {
        if self.repetitions == 0 {
            DEFAULT_REPETITIONS
        } else {
            self.repetitions
        }
    }

    /// Effective data steps
    pub fn step_definitions(&self) -> Vec<StepDefinition> {
        if self.steps.is_empty() {
            StepDefinition::standard_suite()
        } else {
            self.steps.clone()
        }
    }

    pub fn parse_component_type(&self) -> Result<ComponentType, ParseError> {
        self.component_type.parse()
    }

    /// Name used for this case in logs
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{}@{}", self.component_type, self.image))
    }
}
