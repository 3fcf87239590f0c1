use crate::config::Config;
use crate::error::{PeripheryError, Result, ValidationError};

const SUPPORTED_PROVIDERS: [&str; 1] = ["anthropic"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_registry(config, &mut errors);
        Self::validate_github(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_analysis(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PeripheryError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_registry(config: &Config, errors: &mut Vec<ValidationError>) {
        if !Self::is_http_url(&config.registry.base_url) {
            errors.push(ValidationError::new(
                "registry.base_url",
                format!("Not an http(s) URL: '{}'", config.registry.base_url),
            ));
        }

        if config.registry.concurrency == 0 {
            errors.push(ValidationError::new(
                "registry.concurrency",
                "Concurrency must be greater than 0",
            ));
        }
    }

    fn validate_github(config: &Config, errors: &mut Vec<ValidationError>) {
        if !Self::is_http_url(&config.github.api_base) {
            errors.push(ValidationError::new(
                "github.api_base",
                format!("Not an http(s) URL: '{}'", config.github.api_base),
            ));
        }

        if config.github.web_host.trim().is_empty() {
            errors.push(ValidationError::new(
                "github.web_host",
                "Web host cannot be empty",
            ));
        }

        // The hosting platform rejects requests without a user agent
        if config.github.user_agent.trim().is_empty() {
            errors.push(ValidationError::new(
                "github.user_agent",
                "User agent cannot be empty",
            ));
        }

        if !(1..=100).contains(&config.github.per_page) {
            errors.push(ValidationError::new(
                "github.per_page",
                format!(
                    "Page size must be between 1 and 100, got {}",
                    config.github.per_page
                ),
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.llm.provider;
        if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
            errors.push(ValidationError::new(
                "llm.provider",
                format!(
                    "Provider must be one of {:?}, got '{}'",
                    SUPPORTED_PROVIDERS, provider
                ),
            ));
        }

        if config.llm.model.is_empty() {
            errors.push(ValidationError::new(
                "llm.model",
                "Model name cannot be empty",
            ));
        }

        if !Self::is_http_url(&config.llm.endpoint) {
            errors.push(ValidationError::new(
                "llm.endpoint",
                format!("Not an http(s) URL: '{}'", config.llm.endpoint),
            ));
        }

        if config.llm.max_tokens == 0 {
            errors.push(ValidationError::new(
                "llm.max_tokens",
                "Max tokens must be greater than 0",
            ));
        }

        let temp = config.llm.temperature;
        if !(0.0..=1.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 1.0, got {}", temp),
            ));
        }
    }

    fn validate_analysis(config: &Config, errors: &mut Vec<ValidationError>) {
        let cutoff = config.analysis.signal_cutoff;
        if !(0.0..=1.0).contains(&cutoff) {
            errors.push(ValidationError::new(
                "analysis.signal_cutoff",
                format!("Cutoff must be between 0.0 and 1.0, got {}", cutoff),
            ));
        }

        if config.analysis.log_limit == 0 {
            errors.push(ValidationError::new(
                "analysis.log_limit",
                "Log limit must be greater than 0",
            ));
        }
    }

    fn is_http_url(s: &str) -> bool {
        s.starts_with("https://") || s.starts_with("http://")
    }
}
