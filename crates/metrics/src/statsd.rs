//! StatsD push
//!
//! Each recorded outcome is sent as one counter line over UDP. The send
//! runs on a detached task so the recording caller never waits on the
//! network. Failures are logged at debug and otherwise dropped.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use herald_config::{StatsdConfig, StatsdFlavor};
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tracing::{debug, trace};

/// Fire-and-forget StatsD client
///
/// Cheap to clone; all clones share one lazily bound socket.
#[derive(Debug, Clone)]
pub struct StatsdPusher {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    address: String,
    flavor: StatsdFlavor,
    prefix: String,
    socket: OnceCell<(UdpSocket, SocketAddr)>,
}

impl StatsdPusher {
    /// Create a pusher for the configured collector
    ///
    /// Nothing is resolved or bound until the first push.
    pub fn new(config: &StatsdConfig, prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                address: config.address.clone(),
                flavor: config.flavor,
                prefix: prefix.into(),
                socket: OnceCell::new(),
            }),
        }
    }

    /// Collector address as configured
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Render one counter increment
    ///
    /// StatsD folds tag values into the metric name
    /// (`herald.outputs.teams.ok:1|c`); DogStatsD sends them as tags
    /// (`herald.outputs:1|c|#output:teams,status:ok`).
    pub fn format_line(&self, metric: &str, tags: &[(&str, &str)]) -> String {
        let prefix = &self.inner.prefix;
        match self.inner.flavor {
            StatsdFlavor::Statsd => {
                let mut name = format!("{prefix}.{metric}");
                for (_, value) in tags {
                    name.push('.');
                    name.push_str(value);
                }
                format!("{name}:1|c")
            }
            StatsdFlavor::Dogstatsd => {
                let tags = tags
                    .iter()
                    .map(|(key, value)| format!("{key}:{value}"))
                    .collect::<Vec<_>>()
                    .join(",");
                if tags.is_empty() {
                    format!("{prefix}.{metric}:1|c")
                } else {
                    format!("{prefix}.{metric}:1|c|#{tags}")
                }
            }
        }
    }

    /// Push one counter increment without waiting for it
    ///
    /// Outside a tokio runtime the push is skipped.
    pub fn push(&self, metric: &str, tags: &[(&str, &str)]) {
        let Ok(handle) = Handle::try_current() else {
            trace!(metric, "no runtime, statsd push skipped");
            return;
        };

        let line = self.format_line(metric, tags);
        let pusher = self.clone();
        handle.spawn(async move {
            if let Err(e) = pusher.send(line.as_bytes()).await {
                debug!(address = %pusher.inner.address, error = %e, "statsd push failed");
            }
        });
    }

    async fn send(&self, line: &[u8]) -> io::Result<()> {
        let (socket, target) = self
            .inner
            .socket
            .get_or_try_init(|| bind(&self.inner.address))
            .await?;
        socket.send_to(line, *target).await?;
        Ok(())
    }
}

/// Resolve the collector and bind a local socket of the same family
async fn bind(address: &str) -> io::Result<(UdpSocket, SocketAddr)> {
    let target = tokio::net::lookup_host(address)
        .await?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address resolved"))?;

    let local = if target.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };
    let socket = UdpSocket::bind(local).await?;
    Ok((socket, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pusher(address: &str, flavor: StatsdFlavor) -> StatsdPusher {
        StatsdPusher::new(
            &StatsdConfig {
                address: address.into(),
                flavor,
            },
            "herald",
        )
    }

    #[test]
    fn test_statsd_line() {
        let p = pusher("127.0.0.1:8125", StatsdFlavor::Statsd);
        assert_eq!(
            p.format_line("outputs", &[("output", "teams"), ("status", "ok")]),
            "herald.outputs.teams.ok:1|c"
        );
    }

    #[test]
    fn test_dogstatsd_line() {
        let p = pusher("127.0.0.1:8125", StatsdFlavor::Dogstatsd);
        assert_eq!(
            p.format_line("outputs", &[("output", "teams"), ("status", "error")]),
            "herald.outputs:1|c|#output:teams,status:error"
        );
        assert_eq!(p.format_line("events", &[]), "herald.events:1|c");
    }

    #[test]
    fn test_push_without_runtime_is_skipped() {
        let p = pusher("127.0.0.1:8125", StatsdFlavor::Statsd);
        p.push("outputs", &[("output", "teams"), ("status", "ok")]);
    }

    #[tokio::test]
    async fn test_push_reaches_collector() {
        let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = collector.local_addr().unwrap().to_string();
        let p = pusher(&address, StatsdFlavor::Statsd);

        p.push("outputs", &[("output", "webhook"), ("status", "total")]);

        let mut buf = [0u8; 256];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), collector.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..len], b"herald.outputs.webhook.total:1|c");
    }

    #[tokio::test]
    async fn test_unresolvable_collector_is_swallowed() {
        let p = pusher("collector.invalid:8125", StatsdFlavor::Statsd);
        p.push("outputs", &[("output", "teams"), ("status", "ok")]);
        assert!(p.send(b"x:1|c").await.is_err());
    }
}
