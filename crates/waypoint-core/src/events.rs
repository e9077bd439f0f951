//! Outbound event stream of a scrape run.
//!
//! The pipeline never talks to a UI or a logger directly. It emits
//! [`PipelineEvent`]s into an injected [`EventSink`]; logging and user
//! notification are independent consumers of the same stream.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// A single notification from the scrape worker to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Informational progress message
    Message {
        /// Human readable text
        text: String,
    },
    /// User-visible failure (fatal transport error, quota warning)
    Error {
        /// Human readable text
        text: String,
    },
    /// Number of places processed so far
    Progress {
        /// Places processed
        count: usize,
    },
    /// Number of places found in the listing
    Total {
        /// Listing size
        count: usize,
    },
    /// Geocoding usage after a billed call
    Usage {
        /// Calls made this month
        count: u64,
        /// Estimated spend this month
        estimated_cost: f64,
    },
    /// The run reached a terminal state
    Finished {
        /// Number of places in the result
        places: usize,
        /// Whether the run was halted (cancelled or fatal)
        halted: bool,
    },
}

impl PipelineEvent {
    /// Shorthand for [`PipelineEvent::Message`].
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    /// Shorthand for [`PipelineEvent::Error`].
    pub fn error(text: impl Into<String>) -> Self {
        Self::Error { text: text.into() }
    }
}

/// Consumer of pipeline events.
///
/// Implementations must not block; the worker emits from its hot path.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: PipelineEvent);
}

/// Forwards events over an unbounded channel to an asynchronous reader.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver end the caller reads from.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PipelineEvent) {
        // a caller that stopped listening is not an error for the worker
        let _ = self.tx.send(event);
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Message { text } => tracing::info!("{text}"),
            PipelineEvent::Error { text } => tracing::error!("{text}"),
            PipelineEvent::Progress { count } => tracing::debug!(count, "progress"),
            PipelineEvent::Total { count } => tracing::info!(count, "listing total"),
            PipelineEvent::Usage {
                count,
                estimated_cost,
            } => tracing::debug!(count, estimated_cost, "geocode usage"),
            PipelineEvent::Finished { places, halted } => {
                tracing::info!(places, halted, "run finished");
            }
        }
    }
}

/// Delivers each event to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to the fan-out.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: PipelineEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.emit(PipelineEvent::Total { count: 3 });
        sink.emit(PipelineEvent::message("hello"));

        assert_eq!(rx.recv().await, Some(PipelineEvent::Total { count: 3 }));
        assert_eq!(rx.recv().await, Some(PipelineEvent::message("hello")));
    }

    #[test]
    fn test_channel_sink_tolerates_dropped_receiver() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.emit(PipelineEvent::Progress { count: 1 });
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let (a, mut rx_a) = ChannelSink::channel();
        let (b, mut rx_b) = ChannelSink::channel();
        let fanout = FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(a))
            .with(Arc::new(b));

        fanout.emit(PipelineEvent::error("quota"));

        assert_eq!(rx_a.recv().await, Some(PipelineEvent::error("quota")));
        assert_eq!(rx_b.recv().await, Some(PipelineEvent::error("quota")));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(PipelineEvent::Usage {
            count: 2,
            estimated_cost: 0.034,
        })
        .expect("serialize event");
        assert_eq!(json["kind"], "usage");
        assert_eq!(json["count"], 2);
    }
}
