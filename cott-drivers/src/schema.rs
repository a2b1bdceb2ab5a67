//! Built-in benchmark tables

use crate::value::{Comparison, Condition, Row, Value};
use cott_core::TableKind;
use rand::Rng;
use std::fmt;

/// Number of `REAL` sample columns in the measurement table
pub const MEASUREMENT_COLUMNS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    SerialPrimaryKey,
    Varchar(u16),
    Real,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::SerialPrimaryKey => f.write_str("SERIAL PRIMARY KEY"),
            ColumnType::Varchar(len) => write!(f, "VARCHAR({})", len),
            ColumnType::Real => f.write_str("REAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDef {
    fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Layout of one built-in table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub kind: TableKind,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn for_table(kind: TableKind) -> Self {
        let mut columns = vec![ColumnDef::new("id", ColumnType::SerialPrimaryKey)];
        match kind {
            TableKind::KeyValue => {
                columns.push(ColumnDef::new("key", ColumnType::Varchar(255)));
                columns.push(ColumnDef::new("value", ColumnType::Varchar(255)));
            }
            TableKind::Measurement => {
                columns.extend(
                    (0..MEASUREMENT_COLUMNS).map(|i| ColumnDef::new(format!("s{}", i), ColumnType::Real)),
                );
            }
        }
        Self { kind, columns }
    }

    pub fn name(&self) -> &'static str {
        self.kind.table_name()
    }

    /// A row for every non-key column
    ///
    /// Key-value rows are constant; measurement rows carry random samples.
    pub fn sample_row<R: Rng>(&self, rng: &mut R) -> Row {
        let mut row = Row::new();
        for column in &self.columns {
            match column.column_type {
                ColumnType::SerialPrimaryKey => {}
                ColumnType::Varchar(_) => row.push(column.name.clone(), column.name.as_str()),
                ColumnType::Real => row.push(column.name.clone(), rng.gen::<f64>()),
            }
        }
        row
    }

    /// Filter used by condition selects on this table
    pub fn sample_condition(&self) -> Condition {
        match self.kind {
            TableKind::KeyValue => Condition::new("key", Comparison::Equal, "key"),
            TableKind::Measurement => {
                Condition::new("s0", Comparison::GreaterThan, Value::Real(0.5))
            }
        }
    }
}
