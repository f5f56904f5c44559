//! Waiting for a freshly launched server

use crate::config::TestConfig;
use crate::error::{Result, TesterError};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const MAX_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// How the runner decides a server is ready to receive requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Sleep a fixed time; the server gives no ready signal
    Delay(Duration),

    /// Retry a GET with exponential backoff until any response arrives
    Probe {
        url: Url,
        timeout: Duration,
        interval: Duration,
    },
}

impl Readiness {
    /// Pick the strategy for a scenario. `warmup_override` replaces the fixed delay.
    pub fn for_scenario(config: &TestConfig, warmup_override: Option<Duration>) -> Result<Self> {
        match &config.ready_probe {
            Some(probe) => {
                let url = Url::parse(&config.base_address)
                    .and_then(|base| base.join(&probe.path))
                    .map_err(|source| TesterError::InvalidUrl {
                        base: config.base_address.clone(),
                        url: probe.path.clone(),
                        source,
                    })?;

                Ok(Readiness::Probe {
                    url,
                    timeout: Duration::from_millis(probe.timeout_ms),
                    interval: Duration::from_millis(probe.interval_ms.max(1)),
                })
            }
            None => Ok(Readiness::Delay(
                warmup_override.unwrap_or_else(|| config.warmup()),
            )),
        }
    }

    pub async fn wait(&self, client: &reqwest::Client) -> Result<()> {
        match self {
            Readiness::Delay(delay) => {
                log::debug!("Waiting {:?} for server warm-up", delay);
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            Readiness::Probe {
                url,
                timeout,
                interval,
            } => probe(client, url, *timeout, *interval).await,
        }
    }
}

async fn probe(
    client: &reqwest::Client,
    url: &Url,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut delay = interval;
    let mut attempt = 1;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TesterError::NotReady {
                url: url.to_string(),
                waited: started.elapsed(),
            });
        }

        match client.get(url.clone()).timeout(remaining).send().await {
            Ok(response) => {
                log::info!(
                    "Server ready after {} attempt(s) ({} from {})",
                    attempt,
                    response.status(),
                    url
                );
                return Ok(());
            }
            Err(e) => log::debug!("Attempt {}: server not ready - {}", attempt, e),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(delay.min(remaining)).await;
        delay = (delay * 2).min(MAX_PROBE_INTERVAL);
        attempt += 1;
    }
}
