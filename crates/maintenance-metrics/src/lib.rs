//! maintenance-metrics — server maintenance windows as Prometheus gauges.
//!
//! Keeps a process-owned gauge registry, renders it in the Prometheus
//! text exposition format, and runs the loop that mirrors the server
//! inventory into it.
//!
//! # Architecture
//!
//! ```text
//! MaintenanceCollector
//!   ├── run() → periodic loop, first cycle immediately
//!   ├── run_cycle() → InventorySource::list_servers → publish_server()
//!   └── publish_server() → MetricSink::set_series (start, end, 2× status)
//!
//! Registry (MetricSink)
//!   ├── describe_gauge() → declare a family and its label names
//!   ├── set_series() ← last write wins per label tuple
//!   └── render() → text/plain for the /metrics endpoint
//! ```

pub mod collector;
pub mod prometheus;
pub mod registry;
pub mod status;

pub use collector::{
    CycleReport, END_METRIC, MaintenanceCollector, START_METRIC, STATUS_METRIC,
    register_maintenance_metrics,
};
pub use prometheus::{CONTENT_TYPE, render_prometheus};
pub use registry::{MetricSink, Registry};
pub use status::{MaintenanceStatus, RECOGNIZED_STATUSES, encode_status};
