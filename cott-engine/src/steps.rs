//! Step capability and the concrete benchmarked operations

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use cott_core::{StepDefinition, TableKind};
use cott_drivers::{ComponentDriver, Condition, Row, TableSchema};
use cott_resilience::{RetryError, RetryExecutor, RetryPolicy};
use std::time::Duration;
use tokio::time::timeout;

pub const OPEN_CONNECTION: &str = "openConnection";
pub const START_UP: &str = "startUp";
pub const CREATE_DATABASE: &str = "createDatabase";
pub const SWITCH_DATABASE: &str = "switchDatabase";
pub const SWITCH_DEFAULT_DATABASE: &str = "switchDefaultDatabase";
pub const DROP_DATABASE: &str = "dropDatabase";
pub const CLOSE_CONNECTION: &str = "closeConnection";

/// One named benchmarked operation
#[async_trait]
pub trait Step: Send + Sync {
    /// Name unique within a case's sequence; keys the step's accumulator
    fn name(&self) -> &str;

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()>;
}

pub struct OpenConnection;

#[async_trait]
impl Step for OpenConnection {
    fn name(&self) -> &str {
        OPEN_CONNECTION
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.open().await?)
    }
}

/// Polls the driver until the instance answers
///
/// The whole poll is bounded by `interval * max_attempts`, so a probe that
/// hangs cannot stretch the readiness wait past its budget.
pub struct StartUp {
    executor: RetryExecutor,
    budget: Duration,
}

impl StartUp {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            budget: policy.interval.saturating_mul(policy.max_attempts.max(1)),
            executor: RetryExecutor::new(policy),
        }
    }
}

#[async_trait]
impl Step for StartUp {
    fn name(&self) -> &str {
        START_UP
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        let probe = self.executor.execute_on(driver, |driver| driver.ping());
        match timeout(self.budget, probe).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(RetryError::MaxAttemptsExceeded {
                attempts,
                last_error,
            })) => Err(EngineError::Connectivity(format!(
                "instance not ready after {} attempts: {}",
                attempts, last_error
            ))),
            Ok(Err(RetryError::NonRetryableError(err))) => {
                Err(EngineError::Connectivity(err.to_string()))
            }
            Err(_) => Err(EngineError::Connectivity(format!(
                "instance not ready within {:?}",
                self.budget
            ))),
        }
    }
}

pub struct CreateDatabase {
    database: String,
}

impl CreateDatabase {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

#[async_trait]
impl Step for CreateDatabase {
    fn name(&self) -> &str {
        CREATE_DATABASE
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.create_resource(&self.database).await?)
    }
}

/// Reconnects inside a database, or the server default
pub struct SwitchDatabase {
    name: &'static str,
    database: Option<String>,
}

impl SwitchDatabase {
    pub fn to(database: impl Into<String>) -> Self {
        Self {
            name: SWITCH_DATABASE,
            database: Some(database.into()),
        }
    }

    pub fn to_default() -> Self {
        Self {
            name: SWITCH_DEFAULT_DATABASE,
            database: None,
        }
    }
}

#[async_trait]
impl Step for SwitchDatabase {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.switch_context(self.database.as_deref()).await?)
    }
}

pub struct DropDatabase {
    database: String,
}

impl DropDatabase {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

#[async_trait]
impl Step for DropDatabase {
    fn name(&self) -> &str {
        DROP_DATABASE
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.drop_resource(&self.database).await?)
    }
}

pub struct CloseConnection;

#[async_trait]
impl Step for CloseConnection {
    fn name(&self) -> &str {
        CLOSE_CONNECTION
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.close().await?)
    }
}

pub struct CreateTable {
    name: String,
    schema: TableSchema,
}

#[async_trait]
impl Step for CreateTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.create_table(&self.schema).await?)
    }
}

pub struct DropTable {
    name: String,
    table: TableKind,
}

#[async_trait]
impl Step for DropTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.drop_table(self.table.table_name()).await?)
    }
}

/// Inserts the same row `count` times, one statement per row
pub struct InsertRows {
    name: String,
    table: TableKind,
    row: Row,
    count: u32,
}

#[async_trait]
impl Step for InsertRows {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        let rows = std::slice::from_ref(&self.row);
        for _ in 0..self.count {
            driver.insert_rows(self.table.table_name(), rows).await?;
        }
        Ok(())
    }
}

/// Reads ids `1..=count`; ids that were never inserted read zero rows
pub struct SelectById {
    name: String,
    table: TableKind,
    count: u32,
}

#[async_trait]
impl Step for SelectById {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        for id in 1..=i64::from(self.count) {
            driver.select_by_id(self.table.table_name(), id).await?;
        }
        Ok(())
    }
}

pub struct SelectByCondition {
    name: String,
    table: TableKind,
    condition: Condition,
    count: u32,
}

#[async_trait]
impl Step for SelectByCondition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        for _ in 0..self.count {
            driver
                .select_by_condition(self.table.table_name(), &self.condition)
                .await?;
        }
        Ok(())
    }
}

pub struct Truncate {
    name: String,
    table: TableKind,
}

#[async_trait]
impl Step for Truncate {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, driver: &mut dyn ComponentDriver) -> EngineResult<()> {
        Ok(driver.truncate(self.table.table_name()).await?)
    }
}

/// Build the step a declared definition describes
///
/// Insert payloads are generated here, outside the measured operation.
pub fn from_definition(definition: &StepDefinition) -> Box<dyn Step> {
    let name = definition.name();
    let table = definition.table();
    let schema = TableSchema::for_table(table);

    match definition {
        StepDefinition::CreateTable { .. } => Box::new(CreateTable { name, schema }),
        StepDefinition::DropTable { .. } => Box::new(DropTable { name, table }),
        StepDefinition::InsertRows { count, .. } => Box::new(InsertRows {
            name,
            table,
            row: schema.sample_row(&mut rand::thread_rng()),
            count: *count,
        }),
        StepDefinition::SelectById { count, .. } => Box::new(SelectById {
            name,
            table,
            count: *count,
        }),
        StepDefinition::SelectByCondition { count, .. } => Box::new(SelectByCondition {
            name,
            table,
            condition: schema.sample_condition(),
            count: *count,
        }),
        StepDefinition::Truncate { .. } => Box::new(Truncate { name, table }),
    }
}
