use crate::config::types::{
    BatchConfig, Config, ExtractorConfig, FieldSelector, OutputConfig, PagerConfig,
    ResolverConfig, SourceConfig,
};
use crate::storage::EntityId;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_resolver_config(&config.resolver)?;
    validate_pager_config(&config.pager)?;
    validate_extractor_config(&config.extractor)?;
    validate_batch_config(&config.batch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the source section: queries present, template usable
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if !config.url_template.contains("{id}") {
        return Err(ConfigError::InvalidTemplate(format!(
            "'{}' has no {{id}} placeholder",
            config.url_template
        )));
    }

    // A well-formed identifier must turn the template into a parseable URL
    let probe = EntityId::new("0").map_err(|e| ConfigError::Validation(e.to_string()))?;
    config
        .target_url(&probe)
        .map_err(|e| ConfigError::InvalidTemplate(format!("{}: {}", config.url_template, e)))?;

    validate_query("item-query", &config.item_query)?;
    validate_query("state-query", &config.state_query)?;
    if let Some(query) = &config.total_count_query {
        validate_query("total-count-query", query)?;
    }
    validate_field("timestamp", &config.timestamp)?;
    validate_field("rating", &config.rating)?;

    if config.snapshot_page_size == 0 {
        return Err(ConfigError::Validation(
            "snapshot-page-size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_query(name: &str, query: &str) -> Result<(), ConfigError> {
    if query.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }
    Ok(())
}

fn validate_field(name: &str, field: &FieldSelector) -> Result<(), ConfigError> {
    validate_query(&format!("{}.query", name), &field.query)?;
    if let Some(attribute) = &field.attribute {
        if attribute.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}.attribute cannot be empty when given",
                name
            )));
        }
    }
    Ok(())
}

/// Validates resolver configuration
fn validate_resolver_config(config: &ResolverConfig) -> Result<(), ConfigError> {
    if config.attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "resolver attempts must be >= 1, got {}",
            config.attempts
        )));
    }

    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "resolver timeout-ms must be > 0".to_string(),
        ));
    }

    if config.poll_interval_ms == 0 || config.poll_interval_ms > config.timeout_ms {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be between 1 and timeout-ms ({}), got {}",
            config.timeout_ms, config.poll_interval_ms
        )));
    }

    Ok(())
}

/// Validates pager configuration
fn validate_pager_config(config: &PagerConfig) -> Result<(), ConfigError> {
    if config.max_scroll_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-scroll-attempts must be >= 1".to_string(),
        ));
    }

    // The stall give-up must be able to fire before the hard ceiling
    if config.stall_threshold >= config.max_scroll_attempts {
        return Err(ConfigError::Validation(format!(
            "stall-threshold ({}) must be below max-scroll-attempts ({})",
            config.stall_threshold, config.max_scroll_attempts
        )));
    }

    if config.random_offset_min > config.random_offset_max {
        return Err(ConfigError::Validation(format!(
            "random-offset-min ({}) exceeds random-offset-max ({})",
            config.random_offset_min, config.random_offset_max
        )));
    }

    if config.pause_min_ms > config.pause_max_ms {
        return Err(ConfigError::Validation(format!(
            "pause-min-ms ({}) exceeds pause-max-ms ({})",
            config.pause_min_ms, config.pause_max_ms
        )));
    }

    Ok(())
}

/// Validates extractor configuration
fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    // Node pauses multiply by the revealed node count; keep them short
    if config.node_pause_ms > 10_000 {
        return Err(ConfigError::Validation(format!(
            "node-pause-ms must be <= 10000, got {}",
            config.node_pause_ms
        )));
    }
    Ok(())
}

/// Validates batch configuration
fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.default_limit < 1 {
        return Err(ConfigError::Validation(
            "default-limit must be >= 1".to_string(),
        ));
    }

    if config.delay_min_ms > config.delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "delay-min-ms ({}) exceeds delay-max-ms ({})",
            config.delay_min_ms, config.delay_max_ms
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.store_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "store-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
