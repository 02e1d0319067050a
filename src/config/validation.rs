use crate::config::types::{
    Config, ContractConfig, CrawlerConfig, SpiderConfig, StoreConfig, UserAgentConfig,
};
use crate::item::FIELD_NAMES;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_spider_config(&config.spider)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_store_config(&config.store)?;
    validate_contract_config(&config.contract)?;
    Ok(())
}

/// Validates start URLs and allowed domains
fn validate_spider_config(config: &SpiderConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "spider name cannot be empty".to_string(),
        ));
    }

    if config.start_urls.is_empty() {
        return Err(ConfigError::Validation(
            "at least one start URL is required".to_string(),
        ));
    }

    for start in &config.start_urls {
        validate_http_url(start, "start URL")?;
    }

    for domain in &config.allowed_domains {
        validate_domain_string(domain)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates document store settings
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.uri.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store uri cannot be empty".to_string(),
        ));
    }

    if config.database.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store database cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates contract bounds and scraped field names
fn validate_contract_config(config: &ContractConfig) -> Result<(), ConfigError> {
    if let Some(url) = &config.url {
        validate_http_url(url, "contract URL")?;
    }

    for (label, [min, max]) in [("items", config.items), ("requests", config.requests)] {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "contract {} bounds are reversed: [{}, {}]",
                label, min, max
            )));
        }
    }

    for field in &config.scrapes {
        if !FIELD_NAMES.contains(&field.as_str()) {
            return Err(ConfigError::Validation(format!(
                "contract scrapes unknown field '{}' (expected one of {:?})",
                field, FIELD_NAMES
            )));
        }
    }

    Ok(())
}

/// Parses a URL and requires an HTTP(S) scheme
fn validate_http_url(raw: &str, label: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", label, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS",
            label, raw
        )));
    }

    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => {
            return Err(ConfigError::Validation(format!(
                "Invalid email format: '{}'",
                email
            )))
        }
    };

    if local.is_empty() || !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
