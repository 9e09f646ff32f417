//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ArborConfig, LogOutput, LoggingConfig, ServicesConfig};
use std::collections::HashSet;

/// Validates the entire configuration.
pub fn validate_config(config: &ArborConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_services_config(&config.services)?;
    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Validates the root service list.
fn validate_services_config(services: &ServicesConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for identity in &services.root {
        if identity.trim().is_empty() {
            return Err(ConfigError::validation(
                "Service identities in services.root must not be empty",
            ));
        }

        if !seen.insert(identity.as_str()) {
            return Err(ConfigError::DuplicateService(identity.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&ArborConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_duplicate_service() {
        let mut config = ArborConfig::default();
        config.services.root = vec!["app::Echo".to_string(), "app::Echo".to_string()];

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::DuplicateService(id)) if id == "app::Echo"));
    }

    #[test]
    fn test_validate_empty_service() {
        let mut config = ArborConfig::default();
        config.services.root = vec!["  ".to_string()];

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = ArborConfig::default();
        config.logging.output = LogOutput::File;

        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::MissingField { field }) if field == "logging.file_path"));
    }
}
