//! Prometheus metrics for the lottery engine.
//!
//! Counters and histograms for:
//! - Draws (outcome, winners, duration)
//! - Single-entrant transitions
//! - Optimistic concurrency conflicts
//! - Notification hand-off
//!
//! The recorders below write through the `metrics` facade; they are no-ops
//! until a recorder is installed, e.g. by [`MetricsServer::start`].
//!
//! # Example
//!
//! ```rust,no_run
//! use lottery_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Scrape output
//! let text = server.render();
//! # Ok(())
//! # }
//! ```

use lottery_core::{NotificationKind, Transition};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder and renderer.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a metrics server for `addr` (e.g. `0.0.0.0:9090`).
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Describe the lottery metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (several tests in one process), this
    /// logs a warning and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Address the metrics are meant to be scraped from
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!("lottery_draws_total", "Draws attempted, labelled by outcome");
    describe_counter!(
        "lottery_draw_winners_total",
        "Entrants moved from waiting to invited by draws"
    );
    describe_histogram!(
        "lottery_draw_duration_seconds",
        "Time from draw request to committed batch"
    );
    describe_counter!(
        "lottery_transitions_total",
        "Committed single-entrant transitions, labelled by transition"
    );
    describe_counter!(
        "lottery_conflicts_total",
        "Writes rejected because the event changed concurrently"
    );
    describe_counter!(
        "lottery_notifications_sent_total",
        "Notifications handed to the transport"
    );
    describe_counter!(
        "lottery_notifications_failed_total",
        "Notifications the transport refused or timed out on"
    );
}

/// How a draw ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Winners were invited
    Committed,
    /// Waiting list empty or no places left
    Empty,
    /// Lost an optimistic concurrency race
    Conflict,
    /// Validation or store failure
    Failed,
}

impl DrawOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Empty => "empty",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        }
    }
}

/// Draw metrics recorder.
pub struct DrawMetrics;

impl DrawMetrics {
    /// Record a finished draw.
    pub fn record_draw(outcome: DrawOutcome, winners: usize, duration: Duration) {
        counter!("lottery_draws_total", "outcome" => outcome.as_str()).increment(1);
        counter!("lottery_draw_winners_total").increment(winners as u64);
        histogram!("lottery_draw_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Lifecycle metrics recorder.
pub struct TransitionMetrics;

impl TransitionMetrics {
    /// Record committed transitions; batches count each entrant.
    pub fn record_transition(transition: Transition, count: usize) {
        counter!("lottery_transitions_total", "transition" => transition.as_str())
            .increment(count as u64);
    }

    /// Record a write that lost an optimistic concurrency race.
    pub fn record_conflict(operation: &'static str) {
        counter!("lottery_conflicts_total", "operation" => operation).increment(1);
    }
}

/// Notification metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a message handed to the transport.
    pub fn record_sent(kind: NotificationKind) {
        counter!("lottery_notifications_sent_total", "kind" => kind.as_str()).increment(1);
    }

    /// Record a message the transport did not take.
    pub fn record_failed(kind: NotificationKind) {
        counter!("lottery_notifications_failed_total", "kind" => kind.as_str()).increment(1);
    }
}
