//! Reconciliation of SABnzbd's per-day server counters into lifetime counters.
//!
//! `mode=server_stats` reports a lifetime byte total per server, but article
//! counts only as a small per-day breakdown that upstream trims to recent
//! days. Prometheus counters must never go down, so each server keeps a
//! frozen historical sum plus the latest day's value. When the reported day
//! changes, the last value seen for the previous day is folded into the
//! historical sum.
//!
//! If polling skips a whole day, only the last value seen before the gap is
//! folded in; days upstream never showed us are not recovered.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::models::{ServerStat, ServerStats};

// ---------------------------------------------------------------------------
// Per-server counters
// ---------------------------------------------------------------------------

/// Running counters for one server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStatCache {
    /// Last reported lifetime bytes. Mirrors upstream and may decrease.
    pub total: i64,
    pub articles_tried_historical: i64,
    pub articles_tried_today: i64,
    pub articles_success_historical: i64,
    pub articles_success_today: i64,
    /// Day the `*_today` fields belong to.
    pub today_key: String,
}

impl ServerStatCache {
    /// Applies a new reading and returns the reconciled counters.
    ///
    /// Readings for the same day overwrite `*_today`; a new day first folds
    /// the previous day's last value into the historical sums.
    pub fn updated(mut self, stat: &ServerStat) -> Self {
        self.total = stat.total;
        if stat.day_parsed != self.today_key {
            self.articles_tried_historical += self.articles_tried_today;
            self.articles_success_historical += self.articles_success_today;
            self.articles_tried_today = 0;
            self.articles_success_today = 0;
            self.today_key = stat.day_parsed.clone();
        }
        self.articles_tried_today = stat.articles_tried;
        self.articles_success_today = stat.articles_success;
        self
    }

    pub fn articles_tried(&self) -> i64 {
        self.articles_tried_historical + self.articles_tried_today
    }

    pub fn articles_success(&self) -> i64 {
        self.articles_success_historical + self.articles_success_today
    }

    pub fn counters(&self) -> ServerCounters {
        ServerCounters {
            total: self.total,
            articles_tried: self.articles_tried(),
            articles_success: self.articles_success(),
        }
    }
}

/// Externally visible values for one server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerCounters {
    /// Lifetime bytes as last reported by upstream.
    pub total: i64,
    /// Articles tried, never decreasing.
    pub articles_tried: i64,
    /// Articles downloaded successfully, never decreasing.
    pub articles_success: i64,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Inner {
    total: i64,
    servers: HashMap<String, ServerStatCache>,
}

/// Shared server stats cache.
///
/// Scrapes read concurrently; an update takes the write lock. Readers always
/// get owned copies, never a view into the live map. Servers are created on
/// first sighting and kept for the life of the process, so a server missing
/// from a later snapshot keeps its last values.
#[derive(Debug, Default)]
pub struct ServerStatsCache {
    inner: RwLock<Inner>,
}

impl ServerStatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, stats: &ServerStats) {
        // Lock poisoning is ignored: every statement below leaves `Inner` valid.
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.total = stats.total;
        for (name, stat) in &stats.servers {
            let cached = inner.servers.remove(name).unwrap_or_default();
            inner.servers.insert(name.clone(), cached.updated(stat));
        }
    }

    /// Aggregate bytes downloaded across all servers.
    pub fn total(&self) -> i64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }

    /// Copy of the full per-server state.
    pub fn server_map(&self) -> HashMap<String, ServerStatCache> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .servers
            .clone()
    }

    /// Copy of the per-server values to export.
    pub fn server_counters(&self) -> HashMap<String, ServerCounters> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .servers
            .iter()
            .map(|(name, cache)| (name.clone(), cache.counters()))
            .collect()
    }
}
