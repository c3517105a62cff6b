//! Staleness bookkeeping for recrawls

use crate::storage::StorageResult;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Last successful crawl plus the interval after which it goes stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlState {
    /// `None` until the first run completes
    pub last_crawl: Option<DateTime<Utc>>,
    pub interval: TimeDelta,
}

impl CrawlState {
    pub fn new(last_crawl: Option<DateTime<Utc>>, interval_days: u32) -> Self {
        Self {
            last_crawl,
            interval: TimeDelta::days(i64::from(interval_days)),
        }
    }

    /// Reads the last crawl time from `store`
    pub fn load(store: &dyn CrawlStateStore, interval_days: u32) -> StorageResult<Self> {
        Ok(Self::new(store.load_last_crawl()?, interval_days))
    }

    /// True if no crawl ever completed or the last one is at least
    /// `interval` old
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeDelta, TimeZone, Utc};
    /// use site_harvest::state::CrawlState;
    ///
    /// let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    /// let state = CrawlState::new(Some(t0), 30);
    /// assert!(!state.is_due(t0 + TimeDelta::days(29)));
    /// assert!(state.is_due(t0 + TimeDelta::days(30)));
    /// ```
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_crawl {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// When the next crawl becomes due, `None` if it already is
    pub fn next_due(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let due_at = self.last_crawl? + self.interval;
        (due_at > now).then_some(due_at)
    }

    /// How long until the next crawl is due (zero if due now)
    pub fn time_until_due(&self, now: DateTime<Utc>) -> Duration {
        self.next_due(now)
            .and_then(|due_at| (due_at - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

/// Durable home of the last-successful-crawl timestamp
pub trait CrawlStateStore {
    /// Returns the timestamp written by the last successful run, if any
    fn load_last_crawl(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Persists `at` as the last successful crawl, atomically
    fn record_success(&mut self, at: DateTime<Utc>) -> StorageResult<()>;
}

/// A process-local store, for callers that do not persist state
#[derive(Debug, Default, Clone)]
pub struct InMemoryStateStore {
    last_crawl: Option<DateTime<Utc>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CrawlStateStore for InMemoryStateStore {
    fn load_last_crawl(&self) -> StorageResult<Option<DateTime<Utc>>> {
        Ok(self.last_crawl)
    }

    fn record_success(&mut self, at: DateTime<Utc>) -> StorageResult<()> {
        self.last_crawl = Some(at);
        Ok(())
    }
}
