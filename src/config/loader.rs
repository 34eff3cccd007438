//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Merge error: {0}")]
    Merge(serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let config = parse_config("timeout_ms = 3000\n").unwrap();
        assert_eq!(config.timeout_ms, 3000);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(matches!(parse_config("timeout_ms = ="), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config("timeout_ms = 0\ndate_format = \"\"\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: timeout_ms must be greater than zero, date_format must not be empty"
        );
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let err = parse_config("date_format = \"%Q\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ref errors) if errors == &[ValidationError::InvalidDateFormat("%Q".into())]
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("orchestrator-config-{}.toml", std::process::id()));
        fs::write(&path, "auth_scheme = \"Bearer\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.auth_scheme, "Bearer");

        fs::remove_file(&path).unwrap_or_default();
        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }
}
