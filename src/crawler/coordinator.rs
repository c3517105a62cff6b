//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties everything together:
//! - Seeding the frontier and pulling locators from it
//! - Running fetches concurrently and persisting what they return
//! - Feeding discovered links back into the frontier
//! - Running extraction for stored documents under a worker bound
//! - Recording the run and its counters

use crate::config::Config;
use crate::crawler::fetcher::{ContentKind, FetchOutcome, FetchResult, Fetcher};
use crate::crawler::frontier::{Frontier, Offer};
use crate::crawler::parser::parse_html;
use crate::extract::{save_outcome, ExtractError, ExtractionPipeline, ExtractionRecord};
use crate::storage::{
    OutputLayout, ResourceSource, RunStatus, SqliteStorage, Storage, StoredResource,
};
use crate::url::{normalize, Boundary, Locator};
use crate::HarvestError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters describing one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Locators fetched successfully, of every kind (redirects excluded)
    pub pages: u64,
    /// PDFs and images stored for extraction
    pub documents: u64,
    /// Documents that yielded text
    pub extracted: u64,
    /// Documents that ended with the "no text" outcome
    pub no_text: u64,
    /// Failed fetches plus failed extractions
    pub failures: u64,
    /// Links and redirect targets dropped by normalization or the boundary
    pub rejected: u64,
    /// True only if the frontier drained; false when cancelled
    pub completed: bool,
    pub elapsed: Duration,
}

type ExtractionOutcome = (i64, StoredResource, Result<ExtractionRecord, ExtractError>);

/// Main crawler coordinator structure
///
/// A coordinator drives exactly one run; build a new one for the next.
pub struct Coordinator<S: Storage = SqliteStorage> {
    seed: Locator,
    boundary: Boundary,
    fetcher: Fetcher,
    pipeline: Arc<ExtractionPipeline>,
    layout: OutputLayout,
    storage: S,
    max_fetches: usize,
    extraction_permits: Arc<Semaphore>,
    config_hash: String,
}

impl Coordinator<SqliteStorage> {
    /// Creates a coordinator that stores into the configured database
    pub fn from_config(
        config: &Config,
        pipeline: Arc<ExtractionPipeline>,
    ) -> Result<Self, HarvestError> {
        let storage = SqliteStorage::new(&config.output.database_path())?;
        let fetcher = Fetcher::from_config(&config.crawl)?;
        Self::new(config, storage, fetcher, pipeline)
    }
}

impl<S: Storage> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The harvester configuration
    /// * `storage` - Where runs, resources and extractions are recorded
    /// * `fetcher` - HTTP fetcher shared by all fetch tasks
    /// * `pipeline` - Extraction pipeline shared by all extraction tasks
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The seed does not normalize
    pub fn new(
        config: &Config,
        storage: S,
        fetcher: Fetcher,
        pipeline: Arc<ExtractionPipeline>,
    ) -> Result<Self, HarvestError> {
        let seed = normalize(&config.crawl.seed, None)?;

        Ok(Self {
            seed,
            boundary: config.boundary(),
            fetcher,
            pipeline,
            layout: OutputLayout::new(&config.output.root),
            storage,
            max_fetches: config.crawl.max_concurrent_fetches.max(1) as usize,
            extraction_permits: Arc::new(Semaphore::new(
                config.extraction.max_workers.max(1) as usize,
            )),
            config_hash: String::new(),
        })
    }

    /// Sets the config hash recorded with the run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Runs the crawl until the frontier drains or `cancel` fires
    ///
    /// Per-resource failures are counted and the loop continues. Storage
    /// and filesystem failures end the run with an error; the run record is
    /// then left marked as interrupted.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<CrawlSummary, HarvestError> {
        self.layout.ensure_dirs()?;
        let run_id = self.storage.create_run(&self.config_hash)?;
        info!("Starting crawl run {} from {}", run_id, self.seed);

        let start = Instant::now();
        let mut summary = CrawlSummary::default();
        let outcome = self.drive(run_id, &mut summary, &cancel).await;
        summary.elapsed = start.elapsed();

        match outcome {
            Ok(()) => {
                let status = if summary.completed {
                    RunStatus::Completed
                } else {
                    RunStatus::Interrupted
                };
                self.storage.finish_run(run_id, status, &summary)?;
                info!(
                    "Crawl run {} {}: {} pages, {} documents, {} failures in {:?}",
                    run_id,
                    status.to_db_string(),
                    summary.pages,
                    summary.documents,
                    summary.failures,
                    summary.elapsed
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Crawl run {} aborted: {}", run_id, e);
                if let Err(finish_err) =
                    self.storage
                        .finish_run(run_id, RunStatus::Interrupted, &summary)
                {
                    warn!("Could not close run {}: {}", run_id, finish_err);
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        run_id: i64,
        summary: &mut CrawlSummary,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        let frontier = Frontier::new(self.boundary.clone());
        frontier.offer(self.seed.clone());

        let mut fetches: JoinSet<FetchResult> = JoinSet::new();
        let mut extractions: JoinSet<ExtractionOutcome> = JoinSet::new();

        loop {
            while fetches.len() < self.max_fetches {
                let Some(locator) = frontier.next() else {
                    break;
                };
                debug!("Fetching {}", locator);
                let fetcher = self.fetcher.clone();
                fetches.spawn(async move { fetcher.fetch(locator).await });
            }

            if fetches.is_empty() && extractions.is_empty() {
                info!("Frontier is empty, crawl complete");
                summary.completed = true;
                return Ok(());
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(
                        "Crawl cancelled with {} fetches and {} extractions in flight",
                        fetches.len(),
                        extractions.len()
                    );
                    fetches.abort_all();
                    extractions.abort_all();
                    return Ok(());
                }
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                    match joined {
                        Ok(result) => {
                            self.handle_fetch(result, run_id, &frontier, summary, &mut extractions)?;
                        }
                        Err(e) => task_failed("fetch", e, summary),
                    }
                }
                Some(joined) = extractions.join_next(), if !extractions.is_empty() => {
                    self.handle_extraction(joined, summary)?;
                }
            }
        }
    }

    fn handle_fetch(
        &mut self,
        result: FetchResult,
        run_id: i64,
        frontier: &Frontier,
        summary: &mut CrawlSummary,
        extractions: &mut JoinSet<ExtractionOutcome>,
    ) -> Result<(), HarvestError> {
        let FetchResult {
            locator,
            kind,
            status,
            outcome,
        } = result;

        let bytes = match outcome {
            FetchOutcome::Body(bytes) => bytes,
            FetchOutcome::Redirect(target) => {
                self.follow_redirect(&locator, &target, frontier, summary);
                return Ok(());
            }
            FetchOutcome::Failed(failure) => {
                warn!("Failed to fetch {}: {}", locator, failure);
                summary.failures += 1;
                return Ok(());
            }
        };

        summary.pages += 1;
        debug!("Fetched {} ({}, status {:?}, {} bytes)", locator, kind, status, bytes.len());

        if summary.pages % 10 == 0 {
            info!(
                "Progress: {} pages fetched, {} pending, {} documents",
                summary.pages,
                frontier.pending_len(),
                summary.documents
            );
        }

        match kind {
            ContentKind::Html => {
                let path = self.layout.html_path(&locator);
                self.store(run_id, &locator, path, kind, &bytes)?;

                let parsed = parse_html(&String::from_utf8_lossy(&bytes));
                let base = parsed
                    .base
                    .as_deref()
                    .and_then(|b| locator.as_url().join(b).ok())
                    .unwrap_or_else(|| locator.as_url().clone());
                debug!(
                    "Parsed {} ({}): {} links",
                    locator,
                    parsed.title.as_deref().unwrap_or("untitled"),
                    parsed.links.len()
                );

                for link in &parsed.links {
                    match normalize(link, Some(&base)) {
                        Ok(candidate) => {
                            if frontier.offer(candidate) == Offer::OutOfBoundary {
                                summary.rejected += 1;
                            }
                        }
                        Err(e) => {
                            debug!("Rejected link {} on {}: {}", link, locator, e);
                            summary.rejected += 1;
                        }
                    }
                }
            }
            ContentKind::Pdf | ContentKind::Image => {
                let path = self.layout.document_path(&locator, kind);
                let (resource_id, resource) = self.store(run_id, &locator, path, kind, &bytes)?;
                summary.documents += 1;

                let permits = Arc::clone(&self.extraction_permits);
                let pipeline = Arc::clone(&self.pipeline);
                extractions.spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    let record = pipeline.extract(&resource).await;
                    (resource_id, resource, record)
                });
            }
            ContentKind::Other => {
                debug!("Not storing {} ({})", locator, kind);
            }
        }

        Ok(())
    }

    /// Treats a redirect target like a link found on the redirecting page
    fn follow_redirect(
        &self,
        locator: &Locator,
        target: &str,
        frontier: &Frontier,
        summary: &mut CrawlSummary,
    ) {
        match normalize(target, Some(locator.as_url())) {
            Ok(candidate) => {
                debug!("{} redirects to {}", locator, candidate);
                if frontier.offer(candidate) == Offer::OutOfBoundary {
                    warn!("{} redirects out of bounds to {}", locator, target);
                    summary.rejected += 1;
                }
            }
            Err(e) => {
                debug!("Rejected redirect {} from {}: {}", target, locator, e);
                summary.rejected += 1;
            }
        }
    }

    fn store(
        &mut self,
        run_id: i64,
        locator: &Locator,
        path: std::path::PathBuf,
        kind: ContentKind,
        bytes: &[u8],
    ) -> Result<(i64, StoredResource), HarvestError> {
        self.layout.write_atomic(&path, bytes)?;

        let resource = StoredResource {
            source: ResourceSource::Crawled(locator.clone()),
            path,
            kind,
            byte_len: bytes.len() as u64,
        };
        let resource_id = self.storage.insert_resource(Some(run_id), &resource)?;
        Ok((resource_id, resource))
    }

    fn handle_extraction(
        &mut self,
        joined: Result<ExtractionOutcome, JoinError>,
        summary: &mut CrawlSummary,
    ) -> Result<(), HarvestError> {
        match joined {
            Ok((resource_id, resource, Ok(record))) => {
                save_outcome(&self.layout, &mut self.storage, resource_id, &resource, &record)?;
                if record.has_text() {
                    summary.extracted += 1;
                } else {
                    summary.no_text += 1;
                }
                debug!("Extracted {} with strategy {}", resource.source, record.strategy);
            }
            Ok((_, resource, Err(e))) => {
                warn!("Extraction of {} failed: {}", resource.source, e);
                summary.failures += 1;
            }
            Err(e) => task_failed("extraction", e, summary),
        }
        Ok(())
    }
}

fn task_failed(what: &str, e: JoinError, summary: &mut CrawlSummary) {
    error!("{} task failed: {}", what, e);
    summary.failures += 1;
}

/// Runs one crawl against the configured database and host tools
///
/// # Example
///
/// ```no_run
/// use site_harvest::config::load_config_with_hash;
/// use site_harvest::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let summary = run_crawl(&config, &hash, CancellationToken::new()).await?;
/// println!("{} pages", summary.pages);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    cancel: CancellationToken,
) -> Result<CrawlSummary, HarvestError> {
    let pipeline = Arc::new(ExtractionPipeline::detect(config.extraction.tool_timeout()));
    Coordinator::<SqliteStorage>::from_config(config, pipeline)?
        .with_config_hash(config_hash)
        .run(cancel)
        .await
}
