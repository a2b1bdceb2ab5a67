//! PostgreSQL driver

use crate::error::{check_identifier, DriverError, DriverResult};
use crate::schema::TableSchema;
use crate::value::{Condition, Row, Value};
use crate::ComponentDriver;
use async_trait::async_trait;
use cott_core::ComponentType;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgSslMode};
use sqlx::query::Query;
use sqlx::{Connection, Executor, Postgres};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, trace};

/// Connection parameters of a launched PostgreSQL instance
#[derive(Clone, PartialEq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl PostgresSettings {
    pub const USER_ENV_VAR: &'static str = "POSTGRES_USER";
    pub const PASSWORD_ENV_VAR: &'static str = "POSTGRES_PASSWORD";

    /// Take credentials from the env vars the instance was launched with
    pub fn from_env_vars(
        host: impl Into<String>,
        port: u16,
        env_vars: &BTreeMap<String, String>,
    ) -> DriverResult<Self> {
        let lookup = |key: &str| {
            env_vars
                .get(key)
                .cloned()
                .ok_or_else(|| DriverError::MissingEnvVar(key.to_string()))
        };

        Ok(Self {
            host: host.into(),
            port,
            user: lookup(Self::USER_ENV_VAR)?,
            password: lookup(Self::PASSWORD_ENV_VAR)?,
        })
    }

    pub fn connect_options(&self, database: Option<&str>) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(PgSslMode::Disable);
        match database {
            Some(name) => options.database(name),
            None => options,
        }
    }
}

impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Driver for one PostgreSQL instance
///
/// `open` only prepares connect options; the connection itself is made
/// lazily by the first call that needs it, so `ping` doubles as the
/// readiness probe.
pub struct PostgresDriver {
    settings: PostgresSettings,
    database: Option<String>,
    options: Option<PgConnectOptions>,
    connection: Option<PgConnection>,
    connect_timeout: Duration,
}

impl PostgresDriver {
    pub fn new(settings: PostgresSettings) -> Self {
        Self {
            settings,
            database: None,
            options: None,
            connection: None,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn settings(&self) -> &PostgresSettings {
        &self.settings
    }

    /// Database the next connection will use; `None` is the server default
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    async fn connection(&mut self) -> DriverResult<&mut PgConnection> {
        let options = self
            .options
            .as_ref()
            .ok_or(DriverError::ConnectionNotEstablished)?;

        if self.connection.is_none() {
            trace!(host = %self.settings.host, port = self.settings.port, "Connecting");
            let connection = timeout(self.connect_timeout, PgConnection::connect_with(options))
                .await
                .map_err(|_| DriverError::ConnectTimeout(self.connect_timeout))??;
            self.connection = Some(connection);
        }

        self.connection
            .as_mut()
            .ok_or(DriverError::ConnectionNotEstablished)
    }

    async fn disconnect(&mut self) -> DriverResult<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().await?;
        }
        Ok(())
    }

    /// Run a statement without bind parameters over the simple protocol
    async fn execute_statement(&mut self, sql: String) -> DriverResult<()> {
        let connection = self.connection().await?;
        debug!(sql = %sql, "Executing statement");
        connection.execute(sql.as_str()).await?;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Text(text) => query.bind(text.as_str()),
        Value::Integer(integer) => query.bind(*integer),
        Value::Real(real) => query.bind(*real),
    }
}

pub(crate) fn create_table_sql(schema: &TableSchema) -> DriverResult<String> {
    let columns = schema
        .columns
        .iter()
        .map(|c| Ok(format!("{} {}", check_identifier(&c.name)?, c.column_type)))
        .collect::<DriverResult<Vec<_>>>()?;
    Ok(format!(
        "CREATE TABLE {} ({})",
        check_identifier(schema.name())?,
        columns.join(", ")
    ))
}

pub(crate) fn insert_sql(table: &str, row: &Row) -> DriverResult<String> {
    let columns = row
        .columns()
        .map(check_identifier)
        .collect::<DriverResult<Vec<_>>>()?;
    let placeholders = (1..=columns.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>();
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        check_identifier(table)?,
        columns.join(", "),
        placeholders.join(", ")
    ))
}

pub(crate) fn select_by_condition_sql(table: &str, condition: &Condition) -> DriverResult<String> {
    Ok(format!(
        "SELECT * FROM {} WHERE {} {} $1",
        check_identifier(table)?,
        check_identifier(&condition.column)?,
        condition.comparison
    ))
}

#[async_trait]
impl ComponentDriver for PostgresDriver {
    fn component_type(&self) -> ComponentType {
        ComponentType::Postgres
    }

    async fn open(&mut self) -> DriverResult<()> {
        self.options = Some(self.settings.connect_options(self.database.as_deref()));
        Ok(())
    }

    async fn ping(&mut self) -> DriverResult<()> {
        let connect_timeout = self.connect_timeout;
        let result = match timeout(connect_timeout, async {
            self.connection().await?.ping().await?;
            Ok::<(), DriverError>(())
        })
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DriverError::ConnectTimeout(connect_timeout)),
        };

        if result.is_err() {
            // A half-open connection would poison the next probe
            self.connection = None;
        }
        result
    }

    async fn create_resource(&mut self, name: &str) -> DriverResult<()> {
        self.execute_statement(format!("CREATE DATABASE {}", check_identifier(name)?))
            .await
    }

    async fn switch_context(&mut self, name: Option<&str>) -> DriverResult<()> {
        if self.options.is_none() {
            return Err(DriverError::ConnectionNotEstablished);
        }
        if let Some(name) = name {
            check_identifier(name)?;
        }

        // Retarget first so a failed close still leaves the driver pointing at `name`
        self.database = name.map(str::to_string);
        self.options = Some(self.settings.connect_options(name));
        self.disconnect().await?;
        debug!(database = ?name, "Switched database");
        Ok(())
    }

    async fn drop_resource(&mut self, name: &str) -> DriverResult<()> {
        self.execute_statement(format!("DROP DATABASE {}", check_identifier(name)?))
            .await
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.options.is_none() {
            return Err(DriverError::ConnectionNotEstablished);
        }
        // The next open starts from the server default whatever happens here
        self.options = None;
        self.database = None;
        self.disconnect().await
    }

    async fn create_table(&mut self, schema: &TableSchema) -> DriverResult<()> {
        self.execute_statement(create_table_sql(schema)?).await
    }

    async fn drop_table(&mut self, table: &str) -> DriverResult<()> {
        self.execute_statement(format!("DROP TABLE {}", check_identifier(table)?))
            .await
    }

    async fn insert_rows(&mut self, table: &str, rows: &[Row]) -> DriverResult<()> {
        let connection = self.connection().await?;
        for row in rows {
            let sql = insert_sql(table, row)?;
            let query = row.values().fold(sqlx::query(&sql), bind_value);
            query.execute(&mut *connection).await?;
        }
        Ok(())
    }

    async fn select_by_id(&mut self, table: &str, id: i64) -> DriverResult<u64> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", check_identifier(table)?);
        let connection = self.connection().await?;
        let rows = sqlx::query(&sql).bind(id).fetch_all(&mut *connection).await?;
        Ok(rows.len() as u64)
    }

    async fn select_by_condition(
        &mut self,
        table: &str,
        condition: &Condition,
    ) -> DriverResult<u64> {
        let sql = select_by_condition_sql(table, condition)?;
        let connection = self.connection().await?;
        let rows = bind_value(sqlx::query(&sql), &condition.value)
            .fetch_all(&mut *connection)
            .await?;
        Ok(rows.len() as u64)
    }

    async fn truncate(&mut self, table: &str) -> DriverResult<()> {
        self.execute_statement(format!("TRUNCATE TABLE {}", check_identifier(table)?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Comparison;
    use cott_core::TableKind;

    fn settings() -> PostgresSettings {
        PostgresSettings {
            host: "localhost".to_string(),
            port: 5432,
            user: "cott".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_settings_from_env_vars() {
        let mut env = BTreeMap::new();
        env.insert("POSTGRES_USER".to_string(), "cott".to_string());

        let result = PostgresSettings::from_env_vars("localhost", 5432, &env);
        assert_eq!(
            result,
            Err(DriverError::MissingEnvVar("POSTGRES_PASSWORD".to_string()))
        );

        env.insert("POSTGRES_PASSWORD".to_string(), "secret".to_string());
        let settings = PostgresSettings::from_env_vars("localhost", 5432, &env).unwrap();
        assert_eq!(settings, self::settings());
        assert!(!format!("{:?}", settings).contains("secret"));
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&TableSchema::for_table(TableKind::KeyValue)).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE key_value (id SERIAL PRIMARY KEY, key VARCHAR(255), value VARCHAR(255))"
        );

        let sql = create_table_sql(&TableSchema::for_table(TableKind::Measurement)).unwrap();
        assert!(sql.starts_with("CREATE TABLE measurement (id SERIAL PRIMARY KEY, s0 REAL, s1 REAL"));
        assert!(sql.ends_with("s99 REAL)"));
    }

    #[test]
    fn test_insert_sql() {
        let row = Row::new().with("key", "k").with("value", "v");
        assert_eq!(
            insert_sql("key_value", &row).unwrap(),
            "INSERT INTO key_value (key, value) VALUES ($1, $2)"
        );

        let bad = Row::new().with("key); DROP TABLE x; --", "k");
        assert!(matches!(
            insert_sql("key_value", &bad),
            Err(DriverError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_select_by_condition_sql() {
        let condition = Condition::new("s0", Comparison::GreaterThan, 0.5);
        assert_eq!(
            select_by_condition_sql("measurement", &condition).unwrap(),
            "SELECT * FROM measurement WHERE s0 > $1"
        );
    }

    #[tokio::test]
    async fn test_calls_before_open_fail() {
        let mut driver = PostgresDriver::new(settings());

        assert_eq!(driver.ping().await, Err(DriverError::ConnectionNotEstablished));
        assert_eq!(
            driver.create_resource("cott").await,
            Err(DriverError::ConnectionNotEstablished)
        );
        assert_eq!(
            driver.switch_context(Some("cott")).await,
            Err(DriverError::ConnectionNotEstablished)
        );
        assert_eq!(driver.close().await, Err(DriverError::ConnectionNotEstablished));
    }

    #[tokio::test]
    async fn test_switch_context_tracks_database() {
        let mut driver = PostgresDriver::new(settings());
        driver.open().await.unwrap();

        driver.switch_context(Some("cott")).await.unwrap();
        assert_eq!(driver.database(), Some("cott"));

        driver.switch_context(None).await.unwrap();
        assert_eq!(driver.database(), None);

        driver.close().await.unwrap();
        assert_eq!(driver.close().await, Err(DriverError::ConnectionNotEstablished));
    }

    #[tokio::test]
    async fn test_close_forgets_the_current_database() {
        let mut driver = PostgresDriver::new(settings());
        driver.open().await.unwrap();
        driver.switch_context(Some("cott")).await.unwrap();

        driver.close().await.unwrap();
        assert_eq!(driver.database(), None);

        driver.open().await.unwrap();
        let options = driver.options.as_ref().unwrap();
        assert_eq!(options.get_database(), None);
    }

    #[tokio::test]
    async fn test_switch_context_retargets_without_connecting() {
        let mut driver = PostgresDriver::new(settings());
        driver.open().await.unwrap();

        driver.switch_context(Some("cott")).await.unwrap();
        let options = driver.options.as_ref().unwrap();
        assert_eq!(options.get_database(), Some("cott"));
        assert!(driver.connection.is_none());
    }

    #[tokio::test]
    async fn test_invalid_resource_name_is_rejected_before_connecting() {
        let mut driver = PostgresDriver::new(settings());
        driver.open().await.unwrap();

        assert_eq!(
            driver.drop_resource("cott; --").await,
            Err(DriverError::InvalidIdentifier("cott; --".to_string()))
        );
    }
}
