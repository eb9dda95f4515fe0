use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{FinsearchError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every failure before returning
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_semantic(config, &mut errors);
        Self::validate_hybrid(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FinsearchError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.database_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.database_path",
                "Database path cannot be empty",
            ));
        }

        if config.storage.pool_size == 0 {
            errors.push(ValidationError::new(
                "storage.pool_size",
                "Pool size must be greater than 0",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        let limit = config.search.default_limit;
        if !(1..=crate::search::MAX_LIMIT).contains(&limit) {
            errors.push(ValidationError::new(
                "search.default_limit",
                format!(
                    "Default limit must be between 1 and {}, got {}",
                    crate::search::MAX_LIMIT,
                    limit
                ),
            ));
        }
    }

    fn validate_semantic(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.semantic.dimensions == 0 {
            errors.push(ValidationError::new(
                "semantic.dimensions",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.semantic.model.is_empty() {
            errors.push(ValidationError::new(
                "semantic.model",
                "Model name cannot be empty",
            ));
        }

        let endpoint = &config.semantic.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            errors.push(ValidationError::new(
                "semantic.endpoint",
                format!("Endpoint must be an http(s) URL, got '{}'", endpoint),
            ));
        }

        // The credential itself may legitimately be absent; that only disables semantic search.
        if config.semantic.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "semantic.api_key_env",
                "Credential variable name cannot be empty",
            ));
        }
    }

    fn validate_hybrid(config: &Config, errors: &mut Vec<ValidationError>) {
        let hybrid = &config.hybrid;

        for (path, weight) in [
            ("hybrid.keyword_weight", hybrid.keyword_weight),
            ("hybrid.semantic_weight", hybrid.semantic_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be a non-negative number, got {}", weight),
                ));
            }
        }

        if hybrid.keyword_weight + hybrid.semantic_weight <= 0.0 {
            errors.push(ValidationError::new(
                "hybrid",
                "Default weights must not both be zero",
            ));
        }

        if hybrid.overfetch_multiplier == 0 {
            errors.push(ValidationError::new(
                "hybrid.overfetch_multiplier",
                "Over-fetch multiplier must be greater than 0",
            ));
        }

        if hybrid.overfetch_cap == 0 {
            errors.push(ValidationError::new(
                "hybrid.overfetch_cap",
                "Over-fetch cap must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_empty_database_path() {
        let mut config = Config::default();
        config.storage.database_path = PathBuf::new();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_zero_default_weights() {
        let mut config = Config::default();
        config.hybrid.keyword_weight = 0.0;
        config.hybrid.semantic_weight = 0.0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = Config::default();
        config.semantic.dimensions = 0;
        config.semantic.endpoint = "ftp://example".to_string();
        config.hybrid.overfetch_cap = 0;

        match ConfigValidator::validate(&config) {
            Err(FinsearchError::ConfigValidation { errors }) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
