//! Sink construction from configuration
//!
//! Walks `[sinks.*]` in name order and builds one sink per enabled table.
//! Disabled tables are skipped with an info line; any construction failure
//! aborts startup.

use std::sync::Arc;

use herald_config::{Config, SinkConfig};
use herald_metrics::MetricsRegistry;
use tracing::info;

use crate::error::SinkError;
use crate::fission::FissionSink;
use crate::sink::Sink;
use crate::teams::TeamsSink;
use crate::webhook::WebhookSink;

/// Build every enabled sink
///
/// Each sink gets its recorder from `registry` under its configured name.
pub async fn build_sinks(
    config: &Config,
    registry: &MetricsRegistry,
) -> Result<Vec<Arc<dyn Sink>>, SinkError> {
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::with_capacity(config.sinks.len());

    for (name, sink_config) in config.sinks.iter() {
        if !sink_config.is_enabled() {
            info!(sink = %name, kind = sink_config.type_name(), "sink disabled, skipping");
            continue;
        }

        let sink: Arc<dyn Sink> = match sink_config {
            SinkConfig::Teams(teams) => {
                Arc::new(TeamsSink::from_config(name, teams, &config.tls, registry)?)
            }
            SinkConfig::Fission(fission) => {
                Arc::new(FissionSink::from_config(name, fission, &config.tls, registry).await?)
            }
            SinkConfig::Webhook(webhook) => {
                Arc::new(WebhookSink::from_config(name, webhook, &config.tls, registry)?)
            }
        };

        info!(
            sink = %name,
            kind = sink_config.type_name(),
            minimum_priority = %sink.minimum_priority(),
            "sink enabled"
        );
        sinks.push(sink);
    }

    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MetricsRegistry {
        MetricsRegistry::new("herald").unwrap()
    }

    #[tokio::test]
    async fn test_builds_enabled_sinks_in_name_order() {
        let config: Config = r#"
            [sinks.webhook]
            address = "http://127.0.0.1:9000/hook"

            [sinks.teams]
            webhook_url = "https://outlook.office.com/webhook/abc"
            minimum_priority = "warning"

            [sinks.fission]
            function = "falco-handler"
        "#
        .parse()
        .unwrap();
        let registry = registry();

        let sinks = build_sinks(&config, &registry).await.unwrap();

        let names: Vec<_> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["fission", "teams", "webhook"]);
        assert_eq!(sinks[1].minimum_priority(), herald_protocol::Priority::Warning);
        assert!(registry.sink_snapshot("teams").is_some());
    }

    #[tokio::test]
    async fn test_disabled_sinks_are_skipped() {
        let config: Config = r#"
            [sinks.teams]
            webhook_url = "https://outlook.office.com/webhook/abc"

            [sinks.teams_secops]
            enabled = false
        "#
        .parse()
        .unwrap();
        let registry = registry();

        let sinks = build_sinks(&config, &registry).await.unwrap();

        assert_eq!(sinks.len(), 1);
        assert_eq!(sinks[0].name(), "teams");
        assert!(registry.sink_snapshot("teams_secops").is_none());
    }

    #[tokio::test]
    async fn test_no_sinks() {
        let config = Config::default();
        let sinks = build_sinks(&config, &registry()).await.unwrap();
        assert!(sinks.is_empty());
    }

    #[tokio::test]
    async fn test_construction_failure_aborts() {
        let config: Config = r#"
            [sinks.fission]
            function = "falco-handler"
            kubeconfig = "/nonexistent/kubeconfig"
        "#
        .parse()
        .unwrap();

        let result = build_sinks(&config, &registry()).await;
        assert!(matches!(result, Err(SinkError::Transport(_))));
    }
}
