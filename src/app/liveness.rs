//! Keep-alive pinger.
//!
//! Some hosting platforms suspend a service that sees no inbound traffic for a
//! while. The pinger calls the service's own `/health` endpoint through its
//! public URL on a fixed schedule so the platform keeps counting it as active.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// One liveness check. Returns the HTTP status code observed.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self) -> anyhow::Result<u16>;
}

/// Probes `GET {base_url}/health` over HTTP.
pub struct HttpStatusProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpStatusProbe {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/health", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusProbe for HttpStatusProbe {
    async fn probe(&self) -> anyhow::Result<u16> {
        let response = self.client.get(&self.url).send().await?;
        Ok(response.status().as_u16())
    }
}

/// Background task that probes the service after a grace period and then
/// once per interval until shut down.
pub struct LivenessPinger {
    probe: Arc<dyn StatusProbe>,
    initial_delay: Duration,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl LivenessPinger {
    pub fn new(probe: Arc<dyn StatusProbe>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            probe,
            initial_delay,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Spawns the ping loop. Call once per process.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                initial_delay_secs = self.initial_delay.as_secs(),
                interval_secs = self.interval.as_secs(),
                "liveness pinger started"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.initial_delay) => {}
                _ = self.shutdown.notified() => {
                    tracing::info!("liveness pinger stopped before first ping");
                    return;
                }
            }

            loop {
                self.ping_once().await;

                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = self.shutdown.notified() => {
                        tracing::info!("liveness pinger shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Runs a single probe and logs the outcome. Never fails: errors and
    /// panics inside the probe are contained to this iteration.
    pub async fn ping_once(&self) {
        let probe = self.probe.clone();
        match tokio::spawn(async move { probe.probe().await }).await {
            Ok(Ok(200)) => tracing::info!(status = 200, "liveness ping ok"),
            Ok(Ok(status)) => tracing::warn!(status, "liveness ping returned non-200 status"),
            Ok(Err(e)) => tracing::warn!(error = %e, "liveness ping failed"),
            Err(e) => tracing::error!(error = %e, "liveness ping task aborted"),
        }
    }

    /// Stops the loop at its next suspension point.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
