//! Internal snapshots built from SABnzbd responses.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use super::response::{QueueResponse, ServerStatsResponse};
use crate::parse::{KB, MB, ParseError, parse_duration, parse_float, parse_size};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Download status of the SABnzbd queue.
///
/// The numeric value is what gets exported: 0 unknown, 1 idle, 2 paused,
/// 3 downloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Unknown = 0,
    Idle = 1,
    Paused = 2,
    Downloading = 3,
}

impl Status {
    pub fn as_f64(self) -> f64 {
        self as i32 as f64
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s {
            "Idle" => Status::Idle,
            "Paused" => Status::Paused,
            "Downloading" => Status::Downloading,
            _ => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "Idle",
            Status::Paused => "Paused",
            Status::Downloading => "Downloading",
            Status::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Server stats
// ---------------------------------------------------------------------------

/// One server's reading, reduced to the most recent day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStat {
    /// Total data downloaded in bytes, cumulative across all days.
    pub total: i64,
    /// Articles tried on `day_parsed`.
    pub articles_tried: i64,
    /// Articles downloaded successfully on `day_parsed`.
    pub articles_success: i64,
    /// Date key the counts belong to. Empty when upstream reported no days.
    pub day_parsed: String,
}

/// Snapshot of `mode=server_stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Total data downloaded in bytes.
    pub total: i64,
    pub servers: HashMap<String, ServerStat>,
}

impl ServerStats {
    pub fn from_response(response: ServerStatsResponse) -> Self {
        let servers = response
            .servers
            .into_iter()
            .map(|(name, stats)| {
                let (day, tried) = latest_stat(&stats.articles_tried);
                let (_, success) = latest_stat(&stats.articles_success);
                let stat = ServerStat {
                    total: stats.total,
                    articles_tried: tried,
                    articles_success: success,
                    day_parsed: day,
                };
                (name, stat)
            })
            .collect();

        Self {
            total: response.total,
            servers,
        }
    }
}

/// Value of the greatest date key. ISO dates sort chronologically as strings.
/// An empty map yields an empty key and a zero count.
fn latest_stat(by_day: &BTreeMap<String, i64>) -> (String, i64) {
    by_day
        .last_key_value()
        .map(|(day, count)| (day.clone(), *count))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Queue stats
// ---------------------------------------------------------------------------

/// Snapshot of `mode=queue`, in bytes, bytes/s and durations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStats {
    pub version: String,
    /// Queue is globally paused.
    pub paused: bool,
    /// Hard pause, including disk activity.
    pub paused_all: bool,
    /// Time left until the queue resumes.
    pub pause_duration: Duration,
    pub download_dir_diskspace_used: f64,
    pub download_dir_diskspace_total: f64,
    pub completed_dir_diskspace_used: f64,
    pub completed_dir_diskspace_total: f64,
    /// Speed limit as a percentage of the configured line speed.
    pub speed_limit: f64,
    /// Speed limit in B/s.
    pub speed_limit_abs: f64,
    pub have_warnings: f64,
    pub quota: f64,
    pub have_quota: bool,
    pub remaining_quota: f64,
    /// Articles in the article cache.
    pub cache_art: f64,
    pub cache_size: f64,
    /// Current download speed in B/s.
    pub speed: f64,
    pub remaining_size: f64,
    pub size: f64,
    pub items_in_queue: f64,
    pub status: Status,
    pub time_estimate: Duration,
}

impl QueueStats {
    /// Converts the raw queue view. Any malformed field fails the whole
    /// conversion.
    pub fn from_response(response: QueueResponse) -> Result<Self, ParseError> {
        let q = response.queue;

        Ok(Self {
            pause_duration: parse_duration(&q.pause_int)?,
            download_dir_diskspace_used: parse_float(&q.diskspace1)? * MB,
            download_dir_diskspace_total: parse_float(&q.diskspacetotal1)? * MB,
            completed_dir_diskspace_used: parse_float(&q.diskspace2)? * MB,
            completed_dir_diskspace_total: parse_float(&q.diskspacetotal2)? * MB,
            remaining_quota: parse_size(&q.left_quota)?,
            cache_art: parse_size(&q.cache_art)?,
            cache_size: parse_size(&q.cache_size)?,
            speed: parse_float(&q.kbpersec)? * KB,
            remaining_size: parse_float(&q.mbleft)? * MB,
            size: parse_float(&q.mb)? * MB,
            quota: parse_size(&q.quota)?,
            speed_limit: parse_size(&q.speedlimit)?,
            speed_limit_abs: parse_size(&q.speedlimitabs)?,
            have_warnings: parse_float(&q.have_warnings)?,
            time_estimate: parse_duration(&q.timeleft)?,
            items_in_queue: q.noofslots_total as f64,
            status: Status::from(q.status.as_str()),
            paused: q.paused,
            paused_all: q.paused_all,
            have_quota: q.have_quota,
            version: q.version,
        })
    }
}
