//! Domain-driven configuration management for cott
//!
//! Configuration is split by functional domain, loaded from YAML, overridden
//! from `COTT_*` environment variables and validated before a run starts.
//! The resulting [`CottConfig`] is passed explicitly to whatever needs it.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    execution::ExecutionConfig,
    logging::{FileRotation, LogFormat, LogLevel, LogTarget, LoggingConfig},
    report::{ReportConfig, ReportFormat},
    runtime::RuntimeConfig,
    CottConfig,
};

// Re-export utilities
pub use domains::utils::{serde_duration, serde_duration_millis};
