use std::time::{Duration, Instant};

use reqwest::{header::CONTENT_TYPE, StatusCode};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    config::{Config, DEFAULT_ENDPOINT, TOKEN_HEADER},
    error::{ConfigError, FlushError},
    registry::Registry,
    sample::sample,
};

/// What a successful flush did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The registry had nothing we could export, no request was made.
    Skipped,
    Sent { datapoints: usize },
}

/// The flusher is used to run our periodic exports of a registry to a
/// SignalFx style ingestion endpoint.
#[derive(Debug, Clone)]
pub struct Flusher {
    client: reqwest::Client,
    config: Config,
}

impl Flusher {
    /// An empty `endpoint` is replaced by [`DEFAULT_ENDPOINT`].
    pub fn new(mut config: Config) -> Result<Self, ConfigError> {
        if config.endpoint.is_empty() {
            config.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sample `registry` once and post the result. An empty sample is not
    /// sent at all.
    pub async fn flush<R: Registry + ?Sized>(
        &self,
        registry: &R,
    ) -> Result<FlushOutcome, FlushError> {
        let collection_start = Instant::now();
        let batch = sample(registry, &self.config);
        let collection_dur = collection_start.elapsed();
        tracing::debug!(message="collected metrics", duration=?collection_dur, datapoints=batch.len());

        if batch.is_empty() {
            return Ok(FlushOutcome::Skipped);
        }
        let body = serde_json::to_vec(&batch)?;

        let resp = self
            .client
            .post(&self.config.endpoint)
            .header(TOKEN_HEADER, &self.config.token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        // the response, body included, is released when it drops at the end
        // of this scope whatever the status
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FlushError::status(status));
        }
        Ok(FlushOutcome::Sent {
            datapoints: batch.len(),
        })
    }

    /// Flush `registry` every `interval`, forever. The first flush happens
    /// one interval after the call. Failures are logged and the next tick is
    /// the retry. A tick that comes due while a flush is still in flight is
    /// skipped rather than queued.
    ///
    /// This does not spawn anything, the returned future only completes if
    /// the caller drops it. See [`Flusher::spawn`] to run it in the
    /// background.
    pub async fn run<R: Registry>(self, registry: R, interval: Duration) {
        if interval.is_zero() {
            tracing::error!(message = "flush interval must be non-zero, not flushing");
            return std::future::pending().await;
        }
        tracing::info!(message = "starting metrics flusher", endpoint = %self.config.endpoint, interval = ?interval);
        let Some(start) = tokio::time::Instant::now().checked_add(interval) else {
            tracing::error!(message = "flush interval is too large, not flushing", interval = ?interval);
            return std::future::pending().await;
        };
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.flush(&registry).await {
                Ok(outcome) => tracing::debug!(message = "flushed metrics", ?outcome),
                Err(e) => {
                    tracing::error!(message = "failed to export metrics", endpoint = %self.config.endpoint, error = %e)
                }
            }
        }
    }

    /// Run [`Flusher::run`] on a background tokio task. Aborting the returned
    /// handle is how the flusher is stopped.
    pub fn spawn<R: Registry + 'static>(self, registry: R, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(self.run(registry, interval))
    }
}

/// Flush `registry` to the endpoint in `config` every `interval`. Never
/// returns, even when `config` can't be turned into a working client: that is
/// logged once and nothing is ever flushed.
pub async fn run<R: Registry>(registry: R, interval: Duration, config: Config) {
    match Flusher::new(config) {
        Ok(flusher) => flusher.run(registry, interval).await,
        Err(e) => {
            tracing::error!(message = "failed to create metrics flusher", error = %e);
            std::future::pending().await
        }
    }
}
