//! Scrape-driven collector: polls SABnzbd and renders Prometheus metrics.
//!
//! There is no background poller. Each `/metrics` request fetches the queue
//! and server stats views concurrently, feeds server stats through the
//! [`ServerStatsCache`], and renders the result. A view that fails to fetch
//! or parse contributes no samples for that scrape and bumps
//! `sabnzbd_exporter_scrape_errors_total`; the cache keeps its previous
//! values.

pub mod metrics;

use std::time::Instant;

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::ServerStatsCache;
use crate::client::SabnzbdClient;
use crate::models::{QueueStats, ServerStats};

/// Static labels and switches for process-level metrics.
#[derive(Debug, Clone)]
pub struct ExporterOptions {
    pub app_name: String,
    pub version: String,
    pub base_url: String,
    /// Export `process_*` metrics for this process (Linux only).
    pub process_collector: bool,
}

/// The scrape view a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Queue,
    ServerStats,
}

impl View {
    fn as_str(self) -> &'static str {
        match self {
            View::Queue => "queue",
            View::ServerStats => "server_stats",
        }
    }
}

pub struct SabnzbdExporter {
    client: SabnzbdClient,
    cache: ServerStatsCache,
    /// Serializes poll-and-update; cache updates apply in poll order.
    poll: Mutex<()>,
    /// Process-level metrics that live across scrapes.
    registry: Registry,
    scrape_errors: IntCounterVec,
}

impl SabnzbdExporter {
    pub fn new(client: SabnzbdClient, options: &ExporterOptions) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let info = GaugeVec::new(
            Opts::new("info", "Info about this sabnzbd-exporter").namespace("exporter"),
            &["app_name", "version", "base_url"],
        )?;
        registry.register(Box::new(info.clone()))?;
        info.with_label_values(&[
            options.app_name.as_str(),
            options.version.as_str(),
            options.base_url.as_str(),
        ])
        .set(1.0);

        let scrape_errors = IntCounterVec::new(
            Opts::new(
                "exporter_scrape_errors_total",
                "Failed fetches of a sabnzbd API view",
            )
            .namespace(metrics::NAMESPACE),
            &["view"],
        )?;
        registry.register(Box::new(scrape_errors.clone()))?;
        for view in [View::Queue, View::ServerStats] {
            scrape_errors.with_label_values(&[view.as_str()]);
        }

        if options.process_collector {
            register_process_collector(&registry)?;
        }

        Ok(Self {
            client,
            cache: ServerStatsCache::new(),
            poll: Mutex::new(()),
            registry,
            scrape_errors,
        })
    }

    pub fn cache(&self) -> &ServerStatsCache {
        &self.cache
    }

    /// Runs one poll-and-publish cycle and returns every metric family,
    /// sorted by name.
    pub async fn collect(&self) -> prometheus::Result<Vec<MetricFamily>> {
        let started = Instant::now();
        let scrape = Registry::new();

        let poll = self.poll.lock().await;
        let (queue, server_stats) = tokio::join!(self.client.queue(), self.client.server_stats());

        match queue {
            Ok(response) => match QueueStats::from_response(response) {
                Ok(q) => metrics::register_queue(&scrape, &q)?,
                Err(e) => self.record_failure(View::Queue, &e),
            },
            Err(e) => self.record_failure(View::Queue, &e),
        }

        match server_stats {
            Ok(response) => {
                self.cache.update(&ServerStats::from_response(response));
                let total = self.cache.total();
                let servers = self.cache.server_counters();
                metrics::register_servers(&scrape, total, &servers)?;
            }
            Err(e) => self.record_failure(View::ServerStats, &e),
        }
        drop(poll);

        let mut families = self.registry.gather();
        families.extend(scrape.gather());
        families.sort_by(|a, b| a.get_name().cmp(b.get_name()));

        debug!(
            families = families.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "scrape completed"
        );
        Ok(families)
    }

    /// [`collect`](Self::collect) rendered in the Prometheus text format.
    pub async fn scrape(&self) -> prometheus::Result<String> {
        let families = self.collect().await?;
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    fn record_failure(&self, view: View, error: &dyn std::fmt::Display) {
        warn!(view = view.as_str(), error = %error, "failed to collect sabnzbd view");
        self.scrape_errors.with_label_values(&[view.as_str()]).inc();
    }
}

#[cfg(all(feature = "process", target_os = "linux"))]
fn register_process_collector(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))
}

#[cfg(not(all(feature = "process", target_os = "linux")))]
fn register_process_collector(_registry: &Registry) -> prometheus::Result<()> {
    warn!("process metrics are not supported on this platform");
    Ok(())
}

/// Content type of the text exposition format.
pub fn text_content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
