use crate::config::types::{Config, CrawlConfig, ExtractionConfig, OutputConfig, ScheduleConfig};
use crate::url::{in_boundary, normalize, Boundary};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_output_config(&config.output)?;
    validate_schedule_config(&config.schedule)?;
    validate_extraction_config(&config.extraction)?;
    Ok(())
}

/// Validates the seed, boundary and fetch limits
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_host(&config.boundary_host)?;

    for prefix in &config.allowed_paths {
        if !prefix.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "allowed path '{}' must start with '/'",
                prefix
            )));
        }
    }

    let seed = normalize(&config.seed, None)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed '{}': {}", config.seed, e)))?;

    let boundary =
        Boundary::new(&config.boundary_host).with_allowed_paths(config.allowed_paths.clone());
    if !in_boundary(&seed, &boundary) {
        return Err(ConfigError::Validation(format!(
            "seed '{}' lies outside the boundary host '{}'",
            seed, config.boundary_host
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 64, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }

    if let Some(path) = &config.database_path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "database_path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_schedule_config(config: &ScheduleConfig) -> Result<(), ConfigError> {
    if config.interval_days < 1 {
        return Err(ConfigError::Validation(format!(
            "interval_days must be >= 1, got {}",
            config.interval_days
        )));
    }

    if config.poll_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "poll_interval_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 32 {
        return Err(ConfigError::Validation(format!(
            "extraction max_workers must be between 1 and 32, got {}",
            config.max_workers
        )));
    }

    if config.tool_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "tool_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a boundary host: a DNS name or an IPv4 literal, no port
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidHost(
            "boundary host cannot be empty".to_string(),
        ));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidHost(format!(
            "'{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidHost(format!(
            "'{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidHost(format!(
            "'{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}
