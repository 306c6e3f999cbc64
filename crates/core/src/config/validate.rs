use reqwest::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - API base URL is an absolute http(s) URL
/// - Page size and channel buffer are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let base = Url::parse(&config.api.base_url).map_err(|e| {
        ConfigError::ValidationError(format!(
            "api.base_url '{}' is not a valid URL: {}",
            config.api.base_url, e
        ))
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ConfigError::ValidationError(format!(
            "api.base_url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if config.api.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "api.page_size cannot be 0".to_string(),
        ));
    }

    if config.sync.channel_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "sync.channel_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, ServerConfig, SyncConfig};

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                port: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_base_url_scheme() {
        let config = Config {
            api: ApiConfig {
                base_url: "ftp://pokeapi.co/api/v2".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_validate_base_url_unparseable() {
        let config = Config {
            api: ApiConfig {
                base_url: "pokeapi".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_page_size_zero_fails() {
        let config = Config {
            api: ApiConfig {
                page_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_channel_buffer_zero_fails() {
        let config = Config {
            sync: SyncConfig {
                channel_buffer: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
