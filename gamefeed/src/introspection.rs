//! Aggregate health/stats surface. This crate does not open an HTTP listener itself (§1
//! Non-goals); [`Snapshot`] is the exact shape an embedding handler would serialize verbatim as
//! a `/health` or `/stats` JSON body, mirroring the original FastAPI app's response.

use crate::broadcaster::BroadcasterStats;
use crate::connector::UpstreamStats;
use gamefeed_core::pipeline::PipelineStats;
use serde::Serialize;

/// Service identity reported alongside every snapshot.
pub const SERVICE_NAME: &str = "gamefeed";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub upstream: UpstreamStats,
    pub pipeline: PipelineStats,
    pub broadcaster: BroadcasterStats,
    pub history: crate::history_collector::CollectorStats,
}

impl Snapshot {
    pub fn new(
        uptime_seconds: u64,
        upstream: UpstreamStats,
        pipeline: PipelineStats,
        broadcaster: BroadcasterStats,
        history: crate::history_collector::CollectorStats,
    ) -> Self {
        Self {
            service: SERVICE_NAME,
            version: SERVICE_VERSION,
            uptime_seconds,
            upstream,
            pipeline,
            broadcaster,
            history,
        }
    }
}
