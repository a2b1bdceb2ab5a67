//! Component drivers for cott
//!
//! A driver issues the component-specific calls a benchmark step measures:
//! connection handling, creating and dropping the per-repetition database
//! and the data operations on the built-in tables.

pub mod error;
pub mod postgres;
pub mod schema;
pub mod value;

pub use error::{DriverError, DriverResult};
pub use postgres::{PostgresDriver, PostgresSettings};
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use value::{Comparison, Condition, Row, Value};

use async_trait::async_trait;
use cott_core::ComponentType;

/// Client for one benchmarked component
///
/// Methods take `&mut self`: a driver is owned by the orchestrator running
/// its case and is never shared between cases.
#[async_trait]
pub trait ComponentDriver: Send {
    fn component_type(&self) -> ComponentType;

    /// Prepare the connection; may defer the network round trip to `ping`
    async fn open(&mut self) -> DriverResult<()>;

    /// Check that the component answers
    async fn ping(&mut self) -> DriverResult<()>;

    /// Create the named resource (a database, for SQL components)
    async fn create_resource(&mut self, name: &str) -> DriverResult<()>;

    /// Reconnect inside `name`, or the default context when `None`
    async fn switch_context(&mut self, name: Option<&str>) -> DriverResult<()>;

    async fn drop_resource(&mut self, name: &str) -> DriverResult<()>;

    async fn close(&mut self) -> DriverResult<()>;

    async fn create_table(&mut self, schema: &TableSchema) -> DriverResult<()>;

    async fn drop_table(&mut self, table: &str) -> DriverResult<()>;

    /// Insert `rows` one statement at a time
    async fn insert_rows(&mut self, table: &str, rows: &[Row]) -> DriverResult<()>;

    /// Fetch the row with primary key `id`; returns the number of rows read
    async fn select_by_id(&mut self, table: &str, id: i64) -> DriverResult<u64>;

    /// Fetch every row matching `condition`; returns the number of rows read
    async fn select_by_condition(&mut self, table: &str, condition: &Condition)
        -> DriverResult<u64>;

    async fn truncate(&mut self, table: &str) -> DriverResult<()>;
}
