//! Raw JSON shapes returned by the SABnzbd API.
//!
//! Field names follow the API verbatim. Missing fields deserialize to their
//! defaults, matching how SABnzbd omits values between versions.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// Response of `mode=server_stats`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerStatsResponse {
    /// Total data downloaded in bytes.
    pub total: i64,
    pub servers: HashMap<String, ServerStatResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerStatResponse {
    /// Total data downloaded from this server in bytes.
    pub total: i64,
    /// Articles tried, keyed by `YYYY-MM-DD`.
    pub articles_tried: BTreeMap<String, i64>,
    /// Articles successfully downloaded, keyed by `YYYY-MM-DD`.
    pub articles_success: BTreeMap<String, i64>,
}

/// Response of `mode=queue`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueResponse {
    pub queue: QueueResponseQueue,
}

/// The `queue` object. `paused` stops new work but lets in-flight articles
/// finish, `paused_all` is a hard pause including disk activity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueResponseQueue {
    pub version: String,
    pub paused: bool,
    /// `minutes:seconds` until the queue resumes (minutes unpadded).
    pub pause_int: String,
    pub paused_all: bool,
    /// Download directory used, MB.
    pub diskspace1: String,
    /// Completed directory used, MB.
    pub diskspace2: String,
    /// Download directory total, MB.
    pub diskspacetotal1: String,
    /// Completed directory total, MB.
    pub diskspacetotal2: String,
    /// Speed limit as a percentage of the configured line speed.
    pub speedlimit: String,
    /// Speed limit in B/s.
    pub speedlimitabs: String,
    pub have_warnings: String,
    /// Normalized to K/M/G/T/P.
    pub quota: String,
    pub have_quota: bool,
    /// Normalized to K/M/G/T/P.
    pub left_quota: String,
    pub cache_art: String,
    /// Normalized to B/MB/GB/TB/PB.
    pub cache_size: String,
    pub kbpersec: String,
    pub mbleft: String,
    pub mb: String,
    pub noofslots_total: i64,
    /// `Idle`, `Paused` or `Downloading`.
    pub status: String,
    /// `HH:MM:SS`, optionally prefixed by days.
    pub timeleft: String,
}
