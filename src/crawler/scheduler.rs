//! Staleness-driven recrawl scheduling
//!
//! This module handles:
//! - Deciding whether the archive is stale enough to crawl again
//! - Running a crawl once (optionally forced) or on a polling loop
//! - Recording the last successful crawl, only after a completed run
//! - Stopping promptly when cancelled, without touching saved state

use crate::config::{Config, ScheduleConfig};
use crate::crawler::coordinator::{run_crawl, CrawlSummary};
use crate::state::{CrawlState, CrawlStateStore};
use crate::HarvestError;
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One full crawl, as seen by the scheduler
#[async_trait]
pub trait CrawlJob: Send {
    async fn crawl(&mut self, cancel: CancellationToken) -> Result<CrawlSummary, HarvestError>;
}

/// Crawls the configured site into the configured database
///
/// Each call builds a fresh coordinator, so tool detection and the
/// missing-tools warning happen once per run.
#[derive(Debug, Clone)]
pub struct HarvestJob {
    config: Config,
    config_hash: String,
}

impl HarvestJob {
    pub fn new(config: Config, config_hash: impl Into<String>) -> Self {
        Self {
            config,
            config_hash: config_hash.into(),
        }
    }
}

#[async_trait]
impl CrawlJob for HarvestJob {
    async fn crawl(&mut self, cancel: CancellationToken) -> Result<CrawlSummary, HarvestError> {
        run_crawl(&self.config, &self.config_hash, cancel).await
    }
}

/// Decides when to crawl and keeps the last-crawl timestamp
pub struct Scheduler<S: CrawlStateStore> {
    store: S,
    interval_days: u32,
    poll_interval: Duration,
}

impl<S: CrawlStateStore> Scheduler<S> {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `store` - Where the last successful crawl time is kept
    /// * `interval_days` - Age after which the archive is stale
    /// * `poll_interval` - Longest sleep between checks in run-forever mode
    pub fn new(store: S, interval_days: u32, poll_interval: Duration) -> Self {
        Self {
            store,
            interval_days,
            poll_interval,
        }
    }

    pub fn from_config(store: S, config: &ScheduleConfig) -> Self {
        Self::new(store, config.interval_days, config.poll_interval())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current staleness state, read fresh from the store
    pub fn state(&self) -> Result<CrawlState, HarvestError> {
        Ok(CrawlState::load(&self.store, self.interval_days)?)
    }

    /// Crawls at most once
    ///
    /// # Returns
    ///
    /// * `Ok(Some(summary))` - A crawl ran (completed or not)
    /// * `Ok(None)` - The archive is fresh and `force` was not set
    /// * `Err(HarvestError)` - The crawl or the state store failed
    pub async fn run_once<J: CrawlJob>(
        &mut self,
        job: &mut J,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<CrawlSummary>, HarvestError> {
        let state = self.state()?;
        let now = Utc::now();

        if !force && !state.is_due(now) {
            if let Some(due_at) = state.next_due(now) {
                info!("Archive is up to date; next crawl due {}", due_at.to_rfc3339());
            }
            return Ok(None);
        }

        match state.last_crawl {
            Some(last) if force => info!("Forced crawl (last crawl {})", last.to_rfc3339()),
            Some(last) => info!("Archive is stale (last crawl {})", last.to_rfc3339()),
            None => info!("No previous crawl recorded"),
        }

        let summary = job.crawl(cancel.clone()).await?;

        if summary.completed {
            self.store.record_success(Utc::now())?;
            info!("Recorded successful crawl");
        } else {
            warn!("Crawl did not complete; last crawl time left unchanged");
        }

        Ok(Some(summary))
    }

    /// Re-checks staleness until cancelled
    ///
    /// Sleeps until the archive is next due, but never longer than the poll
    /// interval. A failed crawl is logged and retried at the next check.
    pub async fn run_forever<J: CrawlJob>(
        &mut self,
        job: &mut J,
        cancel: CancellationToken,
    ) -> Result<(), HarvestError> {
        info!(
            "Scheduler started: interval {} days, polling every {:?}",
            self.interval_days, self.poll_interval
        );

        while !cancel.is_cancelled() {
            if let Err(e) = self.run_once(job, false, &cancel).await {
                error!("Crawl failed: {}", e);
            }
            if cancel.is_cancelled() {
                break;
            }

            let wait = match self.state() {
                Ok(state) => state.time_until_due(Utc::now()).min(self.poll_interval),
                Err(e) => {
                    error!("Could not read crawl state: {}", e);
                    self.poll_interval
                }
            };
            // Still due means the last attempt failed; back off a full poll.
            let wait = if wait.is_zero() {
                self.poll_interval
            } else {
                wait
            };

            debug!("Next staleness check in {:?}", wait);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }
}
