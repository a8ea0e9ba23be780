//! Prometheus metric families built from one scrape.
//!
//! Each scrape registers into a fresh [`Registry`], so a family only appears
//! when the view it comes from was fetched successfully, and concurrent scrapes
//! never share metric state.

use std::collections::HashMap;

use prometheus::{Gauge, GaugeVec, IntCounterVec, Opts, Registry};

use crate::cache::ServerCounters;
use crate::models::QueueStats;

pub const NAMESPACE: &str = "sabnzbd";

fn gauge(registry: &Registry, name: &str, help: &str, value: f64) -> prometheus::Result<()> {
    let g = Gauge::with_opts(Opts::new(name, help).namespace(NAMESPACE))?;
    g.set(value);
    registry.register(Box::new(g))
}

fn gauge_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    let g = GaugeVec::new(Opts::new(name, help).namespace(NAMESPACE), labels)?;
    registry.register(Box::new(g.clone()))?;
    Ok(g)
}

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Registers the `mode=queue` families.
pub fn register_queue(registry: &Registry, q: &QueueStats) -> prometheus::Result<()> {
    let info = gauge_vec(registry, "info", "Info about the sabnzbd instance", &["version"])?;
    info.with_label_values(&[q.version.as_str()]).set(1.0);

    gauge(registry, "paused", "Is the sabnzbd queue globally paused?", flag(q.paused))?;
    gauge(
        registry,
        "paused_all",
        "Are all actions causing disk activity paused?",
        flag(q.paused_all),
    )?;
    gauge(
        registry,
        "pause_duration_seconds",
        "Time until the queue is unpaused",
        q.pause_duration.as_secs_f64(),
    )?;

    let used = gauge_vec(registry, "disk_used_bytes", "Used disk space", &["folder"])?;
    used.with_label_values(&["download"]).set(q.download_dir_diskspace_used);
    used.with_label_values(&["complete"]).set(q.completed_dir_diskspace_used);

    let total = gauge_vec(registry, "disk_total_bytes", "Total disk space", &["folder"])?;
    total.with_label_values(&["download"]).set(q.download_dir_diskspace_total);
    total.with_label_values(&["complete"]).set(q.completed_dir_diskspace_total);

    gauge(
        registry,
        "speed_limit",
        "Speed limit as a percentage of the configured line speed",
        q.speed_limit,
    )?;
    gauge(registry, "speed_limit_abs", "Speed limit in bytes per second", q.speed_limit_abs)?;
    gauge(registry, "warnings", "Number of warnings", q.have_warnings)?;
    gauge(registry, "quota_bytes", "Total download quota", q.quota)?;
    gauge(registry, "have_quota", "Is a periodic quota set?", flag(q.have_quota))?;
    gauge(registry, "remaining_quota_bytes", "Remaining download quota", q.remaining_quota)?;
    gauge(registry, "article_cache_articles", "Articles in the article cache", q.cache_art)?;
    gauge(registry, "article_cache_bytes", "Size of the article cache", q.cache_size)?;
    gauge(registry, "speed_bps", "Current download speed in bytes per second", q.speed)?;
    gauge(registry, "remaining_bytes", "Bytes left to download in the queue", q.remaining_size)?;
    gauge(registry, "total_bytes", "Total bytes in the queue", q.size)?;
    gauge(registry, "item_queue_size", "Number of items in the queue", q.items_in_queue)?;
    gauge(
        registry,
        "status",
        "Queue status (0 unknown, 1 idle, 2 paused, 3 downloading)",
        q.status.as_f64(),
    )?;
    gauge(
        registry,
        "time_estimate_seconds",
        "Estimated time to download the queue",
        q.time_estimate.as_secs_f64(),
    )?;
    Ok(())
}

/// Registers the server families from reconciled cache values.
pub fn register_servers(
    registry: &Registry,
    total: i64,
    servers: &HashMap<String, ServerCounters>,
) -> prometheus::Result<()> {
    gauge(registry, "downloaded_bytes", "Total bytes downloaded", total as f64)?;

    let downloaded = gauge_vec(
        registry,
        "server_downloaded_bytes",
        "Total bytes downloaded from the server",
        &["server"],
    )?;
    let tried = IntCounterVec::new(
        Opts::new("server_articles_total", "Articles tried on the server").namespace(NAMESPACE),
        &["server"],
    )?;
    registry.register(Box::new(tried.clone()))?;
    let success = IntCounterVec::new(
        Opts::new(
            "server_articles_success",
            "Articles successfully downloaded from the server",
        )
        .namespace(NAMESPACE),
        &["server"],
    )?;
    registry.register(Box::new(success.clone()))?;

    for (name, c) in servers {
        let labels = [name.as_str()];
        downloaded.with_label_values(&labels).set(c.total as f64);
        tried
            .with_label_values(&labels)
            .inc_by(u64::try_from(c.articles_tried).unwrap_or(0));
        success
            .with_label_values(&labels)
            .inc_by(u64::try_from(c.articles_success).unwrap_or(0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use prometheus::proto::MetricFamily;
    use std::time::Duration;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.get_name() == name)
            .unwrap_or_else(|| panic!("missing family {}", name))
    }

    #[test]
    fn queue_families() {
        let registry = Registry::new();
        let q = QueueStats {
            version: "4.2.1".to_string(),
            paused: true,
            status: Status::Paused,
            time_estimate: Duration::from_secs(90),
            download_dir_diskspace_used: 10.0,
            completed_dir_diskspace_used: 20.0,
            ..Default::default()
        };
        register_queue(&registry, &q).unwrap();
        let families = registry.gather();

        assert_eq!(family(&families, "sabnzbd_paused").get_metric()[0].get_gauge().get_value(), 1.0);
        assert_eq!(family(&families, "sabnzbd_status").get_metric()[0].get_gauge().get_value(), 2.0);
        assert_eq!(
            family(&families, "sabnzbd_time_estimate_seconds").get_metric()[0]
                .get_gauge()
                .get_value(),
            90.0
        );
        assert_eq!(family(&families, "sabnzbd_disk_used_bytes").get_metric().len(), 2);
        let info = family(&families, "sabnzbd_info");
        assert_eq!(info.get_metric()[0].get_label()[0].get_value(), "4.2.1");
    }

    #[test]
    fn server_families_use_counter_type() {
        let registry = Registry::new();
        let mut servers = HashMap::new();
        servers.insert(
            "news".to_string(),
            ServerCounters {
                total: 4096,
                articles_tried: 12,
                articles_success: 10,
            },
        );
        register_servers(&registry, 8192, &servers).unwrap();
        let families = registry.gather();

        let tried = family(&families, "sabnzbd_server_articles_total");
        assert_eq!(tried.get_field_type(), prometheus::proto::MetricType::COUNTER);
        assert_eq!(tried.get_metric()[0].get_counter().get_value(), 12.0);

        let success = family(&families, "sabnzbd_server_articles_success");
        assert_eq!(success.get_metric()[0].get_counter().get_value(), 10.0);

        let downloaded = family(&families, "sabnzbd_server_downloaded_bytes");
        assert_eq!(downloaded.get_field_type(), prometheus::proto::MetricType::GAUGE);
        assert_eq!(downloaded.get_metric()[0].get_gauge().get_value(), 4096.0);

        assert_eq!(
            family(&families, "sabnzbd_downloaded_bytes").get_metric()[0]
                .get_gauge()
                .get_value(),
            8192.0
        );
    }

    #[test]
    fn no_servers_still_reports_aggregate() {
        let registry = Registry::new();
        register_servers(&registry, 7, &HashMap::new()).unwrap();
        let families = registry.gather();
        assert!(families.iter().any(|f| f.get_name() == "sabnzbd_downloaded_bytes"));
        assert!(!families.iter().any(|f| f.get_name() == "sabnzbd_server_articles_total"));
    }
}
