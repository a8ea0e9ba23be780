//! sabnzbd-exporter-core: library behind the sabnzbd Prometheus exporter.
//!
//! Provides:
//! - `parse`: size, duration and float parsers for SABnzbd's formatted values
//! - `models`: API response types and the snapshots derived from them
//! - `cache`: reconciliation of per-day server counters into lifetime counters
//! - `client`: SABnzbd HTTP API client
//! - `exporter`: scrape-driven collector and Prometheus rendering

pub mod cache;
pub mod client;
pub mod exporter;
pub mod models;
pub mod parse;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
