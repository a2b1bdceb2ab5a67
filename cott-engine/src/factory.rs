//! Driver construction per test case

use crate::error::{EngineError, EngineResult};
use cott_core::{ComponentType, TestCase};
use cott_drivers::{ComponentDriver, DriverError, PostgresDriver, PostgresSettings};

/// Builds the driver for a case, or explains why the case cannot run
pub trait DriverFactory: Send + Sync {
    fn create(&self, test_case: &TestCase, host: &str) -> EngineResult<Box<dyn ComponentDriver>>;
}

/// Drivers for the component types cott ships with
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDriverFactory;

impl DriverFactory for DefaultDriverFactory {
    fn create(&self, test_case: &TestCase, host: &str) -> EngineResult<Box<dyn ComponentDriver>> {
        match test_case.parse_component_type()? {
            ComponentType::Postgres => {
                let settings =
                    PostgresSettings::from_env_vars(host, test_case.port, &test_case.env_vars)
                        .map_err(configuration_error)?;
                Ok(Box::new(PostgresDriver::new(settings)))
            }
            other => Err(EngineError::Configuration(format!(
                "component type '{}' is not supported",
                other
            ))),
        }
    }
}

fn configuration_error(err: DriverError) -> EngineError {
    EngineError::Configuration(err.to_string())
}
