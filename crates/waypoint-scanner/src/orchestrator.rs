//! Scrape orchestrator driving one run end to end.
//!
//! A run walks a fixed protocol against a single browser session:
//! search, listing pagination, then per place a cache check or a detail
//! scrape plus geocode, and finally cleaning, persistence and export.
//! Everything is sequential because the session has one navigation context.
//!
//! The run observes its [`RunControl`] at checkpoints between steps. A stop
//! request, a dead browser session or a missing listing unwinds to a single
//! halt path that tears down the session, reports `halted` and yields no
//! places.

use crate::cancel::{RunControl, TeardownGuard};
use crate::error::{soft, Result, ScanError};
use crate::export;
use crate::extractor::{detect_layout, ReviewCrawl};
use crate::filter::{self, ScrapedPlace};
use crate::listing::ListingCrawl;
use crate::selectors::Selectors;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;
use waypoint_browser::{PageDriver, WaitCondition};
use waypoint_core::{
    EventSink, ListingEntry, Place, PipelineEvent, ScrapingConfig, SearchQuery,
};
use waypoint_db::Store;
use waypoint_geocode::{persist_usage, Geocoder};

/// Event text sent when a run unwinds before completing.
pub const HALTED_MESSAGE: &str = "worker halted forcefully";

/// Event text sent when geocoding spend passes the monthly allowance.
pub const QUOTA_MESSAGE: &str = "places API allowance exceeded";

/// Result of a scrape run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    /// Identifier of the run, also recorded on its tracing span
    pub run_id: Uuid,
    /// Cleaned places; always empty for a halted run
    pub places: Vec<Place>,
    /// Whether the run was cancelled or aborted
    pub halted: bool,
}

impl ScrapeOutcome {
    fn halted(run_id: Uuid) -> Self {
        Self {
            run_id,
            places: Vec::new(),
            halted: true,
        }
    }
}

/// Runs the scrape protocol over injected collaborators.
///
/// An orchestrator owns its browser session for exactly one run; the session
/// is closed when the run ends.
pub struct ScrapeOrchestrator {
    driver: Arc<dyn PageDriver>,
    store: Store,
    geocoder: Arc<dyn Geocoder>,
    events: Arc<dyn EventSink>,
    config: ScrapingConfig,
    selectors: Selectors,
    csv_path: Option<PathBuf>,
    state_path: Option<PathBuf>,
    control: RunControl,
    teardown: TeardownGuard,
}

impl ScrapeOrchestrator {
    /// Create an orchestrator with default selectors and no file outputs.
    #[must_use]
    pub fn new(
        driver: Arc<dyn PageDriver>,
        store: Store,
        geocoder: Arc<dyn Geocoder>,
        events: Arc<dyn EventSink>,
        config: ScrapingConfig,
    ) -> Self {
        Self {
            driver,
            store,
            geocoder,
            events,
            config,
            selectors: Selectors::default(),
            csv_path: None,
            state_path: None,
            control: RunControl::new(),
            teardown: TeardownGuard::new(),
        }
    }

    /// Override the site selectors.
    #[must_use]
    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Export cleaned places to this CSV file at the end of the run.
    #[must_use]
    pub fn with_csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv_path = Some(path.into());
        self
    }

    /// Persist geocoding usage to this state file on teardown.
    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Share a stop signal created elsewhere.
    #[must_use]
    pub fn with_control(mut self, control: RunControl) -> Self {
        self.control = control;
        self
    }

    /// Handle for requesting a stop from another task.
    #[must_use]
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Ask the run to halt at its next checkpoint.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Run the whole protocol for `query`.
    ///
    /// Never fails: every error ends in a halted outcome, reported through the
    /// event sink.
    pub async fn run(&self, query: &SearchQuery) -> ScrapeOutcome {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("scrape", %run_id, term = %query.term);
        self.run_inner(run_id, query).instrument(span).await
    }

    /// Run on a dedicated task; events keep flowing through the sink.
    pub fn spawn(self: Arc<Self>, query: SearchQuery) -> ScrapeHandle {
        let control = self.control.clone();
        let join = tokio::spawn(async move { self.run(&query).await });
        ScrapeHandle { control, join }
    }

    async fn run_inner(&self, run_id: Uuid, query: &SearchQuery) -> ScrapeOutcome {
        tracing::info!("starting run");

        match self.execute(query).await {
            Ok(places) => {
                self.teardown().await;
                tracing::info!(places = places.len(), "finished");
                self.events.emit(PipelineEvent::Finished {
                    places: places.len(),
                    halted: false,
                });
                ScrapeOutcome {
                    run_id,
                    places,
                    halted: false,
                }
            }
            Err(e) => {
                self.halt(&e).await;
                ScrapeOutcome::halted(run_id)
            }
        }
    }

    async fn execute(&self, query: &SearchQuery) -> Result<Vec<Place>> {
        self.search(query).await?;

        let entries = ListingCrawl::new(
            self.driver.as_ref(),
            &self.selectors.listing,
            &self.config,
            &self.control,
        )
        .collect()
        .await?;
        tracing::info!("{} results loaded", entries.len());
        self.events.emit(PipelineEvent::Total {
            count: entries.len(),
        });
        self.control.checkpoint("listing.done")?;

        let mut scraped = Vec::with_capacity(entries.len());
        for entry in entries {
            self.control.checkpoint("place.start")?;
            let item = self.process(entry, query).await?;

            let message = format!(
                "{}: {} reviews downloaded",
                item.place.name,
                item.place.reviews.len()
            );
            tracing::info!("{message}");
            self.events.emit(PipelineEvent::message(message));

            scraped.push(item);
            self.events.emit(PipelineEvent::Progress {
                count: scraped.len(),
            });
        }

        let places = filter::clean_places(scraped, query);
        tracing::info!(kept = places.len(), "cleaned results");
        self.control.checkpoint("cleaned")?;

        self.persist(&places).await;
        self.control.checkpoint("persisted")?;

        if let Some(path) = &self.csv_path {
            if let Err(e) = export::write_csv(path, &places) {
                tracing::error!("export to {} failed: {}", path.display(), e);
                self.events
                    .emit(PipelineEvent::error(format!("CSV export failed: {e}")));
            }
        }

        Ok(places)
    }

    /// Submit the search term and switch to the configured result category.
    ///
    /// Every step here degrades to a warning; an unusable search shows up
    /// later as a missing listing.
    async fn search(&self, query: &SearchQuery) -> Result<()> {
        let base = &self.config.base_url;
        if soft(self.driver.navigate(base).await)?.is_none() {
            tracing::warn!("could not load {}", base);
        }
        self.control.checkpoint("search.loaded")?;

        let search_box = WaitCondition::present(self.selectors.search.search_box.clone());
        match soft(
            self.driver
                .wait_until(&search_box, self.config.search_box_wait())
                .await,
        )?
        .and_then(|found| found.into_iter().next())
        {
            Some(input) => {
                soft(self.driver.submit_text(input, &query.term).await)?;
            }
            None => tracing::warn!("search box did not appear on {}", base),
        }
        self.control.checkpoint("search.submitted")?;

        let filters = WaitCondition::present(self.selectors.search.filter_list.clone());
        let list = soft(
            self.driver
                .wait_until(&filters, self.config.search_filter_wait())
                .await,
        )?
        .and_then(|found| found.into_iter().next());
        match list {
            Some(list) => self.select_category(list).await?,
            None => tracing::warn!("search filters did not appear"),
        }
        self.control.checkpoint("search.filtered")?;

        Ok(())
    }

    async fn select_category(&self, list: waypoint_browser::ElementHandle) -> Result<()> {
        let links = soft(
            self.driver
                .find_all_in(list, &self.selectors.search.filter_link)
                .await,
        )?
        .unwrap_or_default();

        for link in links {
            let label = soft(self.driver.text(link).await)?.unwrap_or_default();
            if label.trim() == self.config.category_label {
                soft(self.driver.click(link).await)?;
                return Ok(());
            }
        }
        tracing::warn!(label = %self.config.category_label, "category filter not found");
        Ok(())
    }

    /// Cache hit or fresh scrape for one listing entry.
    async fn process(&self, entry: ListingEntry, query: &SearchQuery) -> Result<ScrapedPlace> {
        let cached = self.store.lookup(&entry.url).await;
        let mut place = Place::from_listing(entry);

        if let Some(cached) = cached {
            tracing::debug!(url = %place.url, "cache hit");
            place.mode = cached.mode;
            place.reviews = cached.reviews;
            place.place_id = cached.place_id;
            place.coordinates = cached.coordinates;
            return Ok(ScrapedPlace::cached(place));
        }

        self.fetch_reviews(&mut place).await?;
        self.control.checkpoint("place.geocode")?;
        self.geocode(&mut place, query).await;
        Ok(ScrapedPlace::fresh(place))
    }

    async fn fetch_reviews(&self, place: &mut Place) -> Result<()> {
        if soft(self.driver.navigate(&place.url).await)?.is_none() {
            tracing::warn!(url = %place.url, "could not load place page");
        }
        self.control.checkpoint("place.loaded")?;

        let Some(extractor) =
            detect_layout(self.driver.as_ref(), &self.selectors, &self.config).await?
        else {
            tracing::warn!(url = %place.url, "no review section found");
            return Ok(());
        };

        place.mode = extractor.mode();
        place.reviews = ReviewCrawl::new(
            self.driver.as_ref(),
            extractor.as_ref(),
            &self.config,
            &self.control,
        )
        .collect()
        .await?;
        Ok(())
    }

    async fn geocode(&self, place: &mut Place, query: &SearchQuery) {
        let outcome = self
            .geocoder
            .resolve(&place.name, query.center, query.radius_m)
            .await;

        if outcome.billed {
            self.events.emit(PipelineEvent::Usage {
                count: outcome.usage.count,
                estimated_cost: outcome.usage.estimated_cost,
            });
            if outcome.usage.over_allowance {
                tracing::warn!(
                    cost = outcome.usage.estimated_cost,
                    "geocoding over monthly allowance"
                );
                self.events.emit(PipelineEvent::error(QUOTA_MESSAGE));
            }
        }

        place.coordinates = outcome.coordinates;
        place.place_id = outcome.place_id;
    }

    async fn persist(&self, places: &[Place]) {
        tracing::info!("writing {} places to the cache", places.len());
        match self.store.upsert(places).await {
            Ok(report) => tracing::info!(
                inserted = report.inserted,
                duplicates = report.duplicates,
                "cache updated"
            ),
            Err(e) => tracing::warn!("cache write incomplete: {}", e),
        }
    }

    async fn halt(&self, cause: &ScanError) {
        match cause {
            ScanError::Cancelled => tracing::info!("run cancelled"),
            other => {
                tracing::error!("run aborted: {}", other);
                self.events.emit(PipelineEvent::error(other.to_string()));
                self.control.stop();
            }
        }

        self.teardown().await;
        self.events.emit(PipelineEvent::message(HALTED_MESSAGE));
        self.events.emit(PipelineEvent::Finished {
            places: 0,
            halted: true,
        });
    }

    /// Persist usage and close the session; later calls do nothing.
    async fn teardown(&self) {
        if !self.teardown.claim() {
            return;
        }

        if let Some(path) = &self.state_path {
            let today = chrono::Local::now().date_naive();
            if let Err(e) = persist_usage(path, self.geocoder.usage_state(), today) {
                tracing::warn!("failed to save local state to {}: {}", path.display(), e);
            }
        }

        if let Err(e) = self.driver.close().await {
            tracing::debug!("browser close failed: {}", e);
        }
    }
}

/// A run executing on its own task.
pub struct ScrapeHandle {
    control: RunControl,
    join: JoinHandle<ScrapeOutcome>,
}

impl ScrapeHandle {
    /// Ask the run to halt at its next checkpoint.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Stop handle that outlives this one, e.g. for a signal handler.
    #[must_use]
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Wait for the run to end.
    ///
    /// A worker task that panicked counts as halted.
    pub async fn wait(self) -> ScrapeOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("scrape worker failed: {}", e);
                ScrapeOutcome::halted(Uuid::nil())
            }
        }
    }
}
