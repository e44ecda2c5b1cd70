//! Configuration validation
//!
//! Validates config consistency:
//! - Required fields are present for enabled sinks
//! - Sink URLs parse
//! - Mutual TLS is only requested when `[tls]` carries a client identity
//! - The server listen address parses

use std::net::SocketAddr;

use url::Url;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::sinks::SinkConfig;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_metrics(config)?;
    validate_sinks(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    config
        .server
        .listen
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::invalid_value("server", "server", "listen", e.to_string()))?;

    if config.server.max_body_size == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "server",
            "max_body_size",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if let Some(ref statsd) = config.metrics.statsd
        && statsd.address.is_empty()
    {
        return Err(ConfigError::missing_field("metrics", "statsd", "address"));
    }
    Ok(())
}

/// Validate sink configurations
///
/// Disabled sinks are skipped entirely.
fn validate_sinks(config: &Config) -> Result<()> {
    for (name, sink) in config.sinks.iter() {
        if !sink.is_enabled() {
            continue;
        }

        match sink {
            SinkConfig::Teams(teams) => {
                require_url(name, "webhook_url", &teams.webhook_url)?;
                if !teams.activity_image.is_empty() {
                    parse_url(name, "activity_image", &teams.activity_image)?;
                }
            }
            SinkConfig::Fission(fission) => {
                if fission.function.is_empty() {
                    return Err(ConfigError::missing_field("sink", name, "function"));
                }
                if fission.router_port == 0 {
                    return Err(ConfigError::invalid_value(
                        "sink",
                        name,
                        "router_port",
                        "must be non-zero",
                    ));
                }
                if fission.router_namespace.is_empty() {
                    return Err(ConfigError::missing_field("sink", name, "router_namespace"));
                }
                if fission.router_service.is_empty() {
                    return Err(ConfigError::missing_field("sink", name, "router_service"));
                }
            }
            SinkConfig::Webhook(webhook) => {
                require_url(name, "address", &webhook.address)?;
            }
        }

        if sink.delivery().mutual_tls && !config.tls.has_client_identity() {
            return Err(ConfigError::invalid_value(
                "sink",
                name,
                "mutual_tls",
                "requires [tls] client_cert and client_key",
            ));
        }
    }

    Ok(())
}

fn require_url(name: &str, field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConfigError::missing_field("sink", name, field));
    }
    parse_url(name, field, value)
}

fn parse_url(name: &str, field: &'static str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::invalid_value("sink", name, field, e.to_string()))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::invalid_value(
            "sink",
            name,
            field,
            format!("unsupported scheme '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::Config;
    use crate::error::ConfigError;

    #[test]
    fn test_valid_minimal_config() {
        let config = Config::from_str(
            r#"
[sinks.teams]
webhook_url = "https://outlook.office.com/webhook/abc"
"#,
        );
        assert!(config.is_ok());
    }

    #[test]
    fn test_missing_teams_webhook_url() {
        let err = Config::from_str("[sinks.teams]\noutput_format = \"text\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { field: "webhook_url", .. }
        ));
    }

    #[test]
    fn test_invalid_webhook_address() {
        let err = Config::from_str("[sinks.webhook]\naddress = \"not a url\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "address", .. }));
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = Config::from_str("[sinks.webhook]\naddress = \"ftp://example.com\"").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_missing_fission_function() {
        let err = Config::from_str("[sinks.fission]\nrouter_port = 80").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "function", .. }));
    }

    #[test]
    fn test_zero_fission_port() {
        let err =
            Config::from_str("[sinks.fission]\nfunction = \"f\"\nrouter_port = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "router_port", .. }));
    }

    #[test]
    fn test_disabled_sink_no_validation() {
        let config = Config::from_str("[sinks.webhook]\nenabled = false");
        assert!(config.is_ok());
    }

    #[test]
    fn test_mutual_tls_requires_identity() {
        let toml = r#"
[sinks.webhook]
address = "https://hooks.example.com"
mutual_tls = true
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "mutual_tls", .. }));

        let with_tls = format!(
            "[tls]\nclient_cert = \"/certs/c.crt\"\nclient_key = \"/certs/c.key\"\n{toml}"
        );
        assert!(Config::from_str(&with_tls).is_ok());
    }

    #[test]
    fn test_invalid_listen_address() {
        let err = Config::from_str("[server]\nlisten = \"nowhere\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "listen", .. }));
    }

    #[test]
    fn test_statsd_requires_address() {
        let err = Config::from_str("[metrics.statsd]\naddress = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "address", .. }));
    }
}
