//! SABnzbd API response types and the snapshots derived from them.

pub mod response;
pub mod stats;

pub use response::{QueueResponse, QueueResponseQueue, ServerStatResponse, ServerStatsResponse};
pub use stats::{QueueStats, ServerStat, ServerStats, Status};
