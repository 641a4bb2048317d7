//! Maintenance collector — polls the server inventory and publishes gauges.
//!
//! Each cycle is independent: fetch the full server list, then for every
//! server with a complete identity publish the window start, window end
//! and the one-hot status. A failed fetch leaves every gauge at its last
//! value; a server with missing identity fields is skipped without
//! touching its series.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use maintenance_inventory::{InventorySource, ServerRecord};

use crate::registry::{MetricSink, Registry};
use crate::status::encode_status;

/// Window start, Unix seconds.
pub const START_METRIC: &str = "stackit_server_maintenance_start_timestamp";
/// Window end, Unix seconds.
pub const END_METRIC: &str = "stackit_server_maintenance_end_timestamp";
/// One-hot status, one series per recognized status.
pub const STATUS_METRIC: &str = "stackit_server_maintenance_status";

/// Labels identifying a server on every series.
pub const BASE_LABELS: [&str; 4] = ["server_id", "name", "zone", "machine_type"];
/// Labels of the status series.
pub const STATUS_LABELS: [&str; 5] = ["server_id", "name", "zone", "machine_type", "status"];

/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Declare the three maintenance gauge families on `registry`.
pub fn register_maintenance_metrics(registry: &Registry) {
    registry.describe_gauge(
        START_METRIC,
        "Scheduled maintenance window start time (Unix timestamp)",
        &BASE_LABELS,
    );
    registry.describe_gauge(
        END_METRIC,
        "Scheduled maintenance window end time (Unix timestamp)",
        &BASE_LABELS,
    );
    registry.describe_gauge(
        STATUS_METRIC,
        "Status of the maintenance window (one-hot encoded: PLANNED or ONGOING = 1, others = 0)",
        &STATUS_LABELS,
    );
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the inventory, malformed ones included.
    pub fetched: usize,
    /// Records whose gauges were written.
    pub published: usize,
    /// Records skipped as undecodable or for missing identity fields.
    pub skipped: usize,
    /// Stale series removed (only with pruning enabled).
    pub pruned: usize,
}

/// Periodically mirrors server maintenance windows into a metric sink.
pub struct MaintenanceCollector {
    source: Arc<dyn InventorySource>,
    sink: Arc<dyn MetricSink>,
    project_id: String,
    interval: Duration,
    prune_stale: bool,
}

impl MaintenanceCollector {
    pub fn new(
        source: Arc<dyn InventorySource>,
        sink: Arc<dyn MetricSink>,
        project_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            sink,
            project_id: project_id.into(),
            interval,
            prune_stale: false,
        }
    }

    /// Remove series of servers absent from the latest successful fetch.
    pub fn with_pruning(mut self, prune_stale: bool) -> Self {
        self.prune_stale = prune_stale;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Publish the gauges of a single server.
    ///
    /// Returns false, writing nothing, if the server lacks any identity field.
    /// Otherwise writes exactly four series: start, end, and one status
    /// series per recognized status.
    pub fn publish_server(&self, server: &ServerRecord) -> bool {
        let Some(identity) = server.identity() else {
            return false;
        };
        let base = identity.label_values();

        self.sink
            .set_series(START_METRIC, &base, server.maintenance_start_secs() as f64);
        self.sink
            .set_series(END_METRIC, &base, server.maintenance_end_secs() as f64);

        for (status, value) in encode_status(server.maintenance_status()) {
            let [id, name, zone, machine_type] = base;
            self.sink.set_series(
                STATUS_METRIC,
                &[id, name, zone, machine_type, status.as_str()],
                value,
            );
        }
        true
    }

    /// Run one fetch-and-publish cycle.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        let listing = self
            .source
            .list_servers(&self.project_id)
            .await
            .with_context(|| format!("list servers for project {}", self.project_id))?;

        let mut report = CycleReport {
            fetched: listing.servers.len() + listing.malformed,
            skipped: listing.malformed,
            ..Default::default()
        };
        let mut seen: HashSet<Vec<String>> = HashSet::new();

        for server in &listing.servers {
            if self.publish_server(server) {
                report.published += 1;
                if let Some(identity) = server.identity() {
                    seen.insert(identity.label_values().map(str::to_string).to_vec());
                }
            } else {
                report.skipped += 1;
                debug!(server_id = ?server.id, "server missing identity fields, skipped");
            }
        }

        if self.prune_stale {
            report.pruned = self.prune(&seen);
        }

        info!(
            project_id = %self.project_id,
            servers = report.fetched,
            published = report.published,
            skipped = report.skipped,
            pruned = report.pruned,
            "maintenance metrics updated"
        );
        Ok(report)
    }

    /// Drop series whose base labels were not published this cycle.
    fn prune(&self, seen: &HashSet<Vec<String>>) -> usize {
        let keep = |labels: &[String]| {
            labels.len() >= BASE_LABELS.len() && seen.contains(&labels[..BASE_LABELS.len()])
        };
        [START_METRIC, END_METRIC, STATUS_METRIC]
            .into_iter()
            .map(|metric| self.sink.retain_series(metric, &keep))
            .sum()
    }

    /// Run cycles until shutdown signal. The first cycle starts immediately.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(
            project_id = %self.project_id,
            interval_secs = self.interval.as_secs(),
            prune_stale = self.prune_stale,
            "maintenance collector started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %format!("{e:#}"), "maintenance metrics update failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("maintenance collector shutting down");
                    break;
                }
            }
        }
    }
}
