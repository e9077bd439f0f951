//! `waypoint scrape`: run the pipeline against a live browser.

use crate::cli::ScrapeArgs;
use crate::state::AppState;
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use waypoint_browser::BrowserEngine;
use waypoint_core::{ChannelSink, EventSink, FanoutSink, PipelineEvent, TracingSink};
use waypoint_db::Store;
use waypoint_geocode::{LocalState, PlacesGeocoder};
use waypoint_scanner::{ScrapeOrchestrator, ScrapeOutcome};

/// Turns pipeline events into terminal lines.
#[derive(Debug, Default)]
pub struct ProgressView {
    total: Option<usize>,
}

impl ProgressView {
    /// Line to print for `event`, if any.
    pub fn line(&mut self, event: &PipelineEvent) -> Option<String> {
        match event {
            PipelineEvent::Message { text } => Some(text.clone()),
            PipelineEvent::Error { text } => Some(format!("error: {text}")),
            PipelineEvent::Total { count } => {
                self.total = Some(*count);
                Some(format!("Found {count} places"))
            }
            PipelineEvent::Progress { count } => Some(match self.total {
                Some(total) => format!("[{count}/{total}] places processed"),
                None => format!("[{count}] places processed"),
            }),
            PipelineEvent::Usage {
                count,
                estimated_cost,
            } => Some(format!(
                "Places API: {count} calls this month, estimated cost ${estimated_cost:.2}"
            )),
            PipelineEvent::Finished { .. } => None,
        }
    }
}

async fn render(mut events: UnboundedReceiver<PipelineEvent>) {
    let mut view = ProgressView::default();
    while let Some(event) = events.recv().await {
        let finished = matches!(event, PipelineEvent::Finished { .. });
        if let Some(line) = view.line(&event) {
            if matches!(event, PipelineEvent::Error { .. }) {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
        if finished {
            break;
        }
    }
}

/// Scrape the area described by `args`, stopping cleanly on Ctrl-C.
pub async fn run(state: &AppState, args: &ScrapeArgs) -> anyhow::Result<()> {
    let query = args.search_query()?;
    let mut config = state.config.clone();
    args.apply(&mut config);

    let store = Store::open_and_migrate(&state.database_path)
        .await
        .with_context(|| format!("failed to open {}", state.database_path.display()))?;

    let today = chrono::Local::now().date_naive();
    let usage = LocalState::load(&state.state_path)
        .with_context(|| format!("failed to read {}", state.state_path.display()))?
        .usage_state(today);
    if config.geocode.api_key.is_none() {
        tracing::warn!("No geocode API key configured, scraped places will not be geocoded");
    }
    let geocoder = PlacesGeocoder::new(&config.geocode, usage).context("geocoder setup")?;

    let driver = BrowserEngine::launch(&config.browser)
        .await
        .context("failed to launch browser")?;

    let (channel, events) = ChannelSink::channel();
    let sink: Arc<dyn EventSink> = Arc::new(
        FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(channel)),
    );

    let orchestrator = Arc::new(
        ScrapeOrchestrator::new(
            Arc::new(driver),
            store.clone(),
            Arc::new(geocoder),
            sink,
            config.scraping.clone(),
        )
        .with_csv_path(config.export.csv_path.clone())
        .with_state_path(state.state_path.clone()),
    );

    tracing::info!(
        term = %query.term,
        radius_m = query.radius_m,
        "Starting scrape"
    );
    let handle = orchestrator.spawn(query);

    let control = handle.control();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping at the next checkpoint");
            control.stop();
        }
    });
    let renderer = tokio::spawn(render(events));

    let outcome = handle.wait().await;
    interrupt.abort();
    if let Err(e) = renderer.await {
        tracing::warn!("Progress renderer failed: {}", e);
    }
    store.close().await;

    summarize(&outcome, &config.export.csv_path)
}

fn summarize(outcome: &ScrapeOutcome, csv_path: &std::path::Path) -> anyhow::Result<()> {
    if outcome.halted {
        anyhow::bail!("scrape {} halted before completion", outcome.run_id);
    }
    let reviews: usize = outcome.places.iter().map(|p| p.reviews.len()).sum();
    println!(
        "Scraped {} places with {} reviews into {}",
        outcome.places.len(),
        reviews,
        csv_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::{Mode, Place};

    fn outcome(halted: bool, places: usize) -> ScrapeOutcome {
        let places = (0..places)
            .map(|i| Place {
                name: format!("Place {i}"),
                url: format!("https://example.com/{i}"),
                page: 1,
                mode: Mode::Todo,
                place_id: None,
                coordinates: None,
                reviews: vec![],
            })
            .collect();
        ScrapeOutcome {
            run_id: uuid::Uuid::nil(),
            places,
            halted,
        }
    }

    #[test]
    fn test_progress_lines() {
        let mut view = ProgressView::default();

        assert_eq!(
            view.line(&PipelineEvent::Progress { count: 1 }).as_deref(),
            Some("[1] places processed")
        );
        assert_eq!(
            view.line(&PipelineEvent::Total { count: 4 }).as_deref(),
            Some("Found 4 places")
        );
        assert_eq!(
            view.line(&PipelineEvent::Progress { count: 2 }).as_deref(),
            Some("[2/4] places processed")
        );
        assert_eq!(
            view.line(&PipelineEvent::error("places API allowance exceeded"))
                .as_deref(),
            Some("error: places API allowance exceeded")
        );
        assert_eq!(
            view.line(&PipelineEvent::Usage {
                count: 12,
                estimated_cost: 0.204
            })
            .as_deref(),
            Some("Places API: 12 calls this month, estimated cost $0.20")
        );
        assert!(view
            .line(&PipelineEvent::Finished {
                places: 4,
                halted: false
            })
            .is_none());
    }

    #[tokio::test]
    async fn test_render_stops_on_finished() {
        let (sink, events) = ChannelSink::channel();
        sink.emit(PipelineEvent::message("Tiger Hill: 3 reviews downloaded"));
        sink.emit(PipelineEvent::Finished {
            places: 1,
            halted: false,
        });

        // the sender is still alive, so only the finished event ends the loop
        tokio::time::timeout(std::time::Duration::from_secs(1), render(events))
            .await
            .expect("renderer returned");
        drop(sink);
    }

    #[test]
    fn test_summary() {
        let path = std::path::Path::new("reviews.csv");
        assert!(summarize(&outcome(false, 2), path).is_ok());
        assert!(summarize(&outcome(true, 0), path).is_err());
    }
}
