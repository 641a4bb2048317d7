//! maintenance-inventory — server inventory for the maintenance exporter.
//!
//! Models the subset of the STACKIT IaaS server resource that carries
//! scheduled maintenance information, and fetches it from the IaaS API.
//!
//! # Architecture
//!
//! ```text
//! InventorySource (trait)
//!   ├── StackitClient   → GET /v1/projects/{project_id}/servers
//!   └── test doubles    → in-memory server lists
//!
//! ServerRecord
//!   ├── identity()      → Option<ServerIdentity> (record filter)
//!   └── maintenance_window: Option<MaintenanceWindow>
//! ```
//!
//! Every field of a server record is optional on the wire. Callers decide
//! what a usable record is; `ServerRecord::identity` is the canonical check.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientConfig, InventorySource, StackitClient};
pub use error::{InventoryError, InventoryResult};
pub use types::*;
