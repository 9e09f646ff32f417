//! Configuration loading, schema and validation.

mod error;
mod loader;
mod schema;
mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    ArborConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, ServicesConfig, SpanEventConfig,
};
pub use validation::validate_config;
