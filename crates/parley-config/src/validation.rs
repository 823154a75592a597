// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;
use crate::settings::MAX_CONTEXT_DAYS;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.settings.path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "settings.path must not be empty".to_string(),
        });
    }

    let base_url = config.provider.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::Validation {
            message: format!("provider.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if config.provider.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "provider.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.context_memory.max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "context_memory.max_tokens must be at least 1".to_string(),
        });
    }

    if config.context_memory.days == 0 {
        errors.push(ConfigError::Validation {
            message: "context_memory.days must be at least 1".to_string(),
        });
    } else if config.context_memory.days > MAX_CONTEXT_DAYS {
        errors.push(ConfigError::Validation {
            message: format!("context_memory.days must be at most {MAX_CONTEXT_DAYS}"),
        });
    }

    if config.summarizer.min_exchanges == 0 {
        errors.push(ConfigError::Validation {
            message: "summarizer.min_exchanges must be at least 1".to_string(),
        });
    }

    if config.compaction.max_uncompacted == 0 {
        errors.push(ConfigError::Validation {
            message: "compaction.max_uncompacted must be at least 1".to_string(),
        });
    }

    if config.compaction.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "compaction.batch_size must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ParleyConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ParleyConfig::default();
        config.storage.database_path = "  ".into();
        config.context_memory.max_tokens = 0;
        config.compaction.batch_size = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "expected three errors, got {errors:?}");
    }

    #[test]
    fn rejects_oversized_day_window() {
        let mut config = ParleyConfig::default();
        config.context_memory.days = 200_000_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("context_memory.days"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut config = ParleyConfig::default();
        config.provider.base_url = "ftp://example.com".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("provider.base_url"));
    }
}
