//! Domain types for the server inventory.
//!
//! These mirror the JSON shape of the IaaS `Server` resource. Only the
//! fields the exporter reads are modelled; everything else is ignored on
//! deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{InventoryError, InventoryResult};

// ── Server ─────────────────────────────────────────────────────────

/// Servers returned by one list call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerListing {
    pub servers: Vec<ServerRecord>,
    /// Items that could not be decoded as a server and were dropped.
    pub malformed: usize,
}

impl ServerListing {
    /// Decode a list-servers response body.
    ///
    /// Only a body that is not a JSON object, or whose `items` is present
    /// and not an array, is an error. An item that fails to decode (bad
    /// timestamp, wrong field type) is logged and counted in `malformed`;
    /// the rest are kept.
    pub fn from_json(bytes: &[u8]) -> InventoryResult<Self> {
        let body: Value =
            serde_json::from_slice(bytes).map_err(|e| InventoryError::Decode(e.to_string()))?;
        let Value::Object(mut body) = body else {
            return Err(InventoryError::Decode(
                "expected a JSON object with an `items` array".to_string(),
            ));
        };
        let items = match body.remove("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(InventoryError::Decode(format!(
                    "`items` must be an array, got {other}"
                )));
            }
        };

        let mut listing = Self::default();
        for item in items {
            let server_id = item
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
            match serde_json::from_value::<ServerRecord>(item) {
                Ok(server) => listing.servers.push(server),
                Err(e) => {
                    listing.malformed += 1;
                    warn!(?server_id, error = %e, "dropping malformed server record");
                }
            }
        }
        Ok(listing)
    }
}

impl From<Vec<ServerRecord>> for ServerListing {
    fn from(servers: Vec<ServerRecord>) -> Self {
        Self {
            servers,
            malformed: 0,
        }
    }
}

/// A single server as returned by the IaaS API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub machine_type: Option<String>,
    #[serde(default)]
    pub maintenance_window: Option<MaintenanceWindow>,
}

/// Scheduled maintenance attached to a server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    /// Start of the window. Offsets on the wire are normalised to UTC.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// Free-form status, e.g. "PLANNED", "ONGOING".
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

// ── Identity ───────────────────────────────────────────────────────

/// Stable identity of a server: the base label tuple of every series.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerIdentity {
    pub server_id: String,
    pub name: String,
    pub zone: String,
    pub machine_type: String,
}

impl ServerIdentity {
    /// Label values in series order: server_id, name, zone, machine_type.
    pub fn label_values(&self) -> [&str; 4] {
        [&self.server_id, &self.name, &self.zone, &self.machine_type]
    }
}

impl ServerRecord {
    /// The identity of this server, or `None` if any required field is missing.
    pub fn identity(&self) -> Option<ServerIdentity> {
        Some(ServerIdentity {
            server_id: self.id.clone()?,
            name: self.name.clone()?,
            zone: self.availability_zone.clone()?,
            machine_type: self.machine_type.clone()?,
        })
    }

    /// Maintenance window start as Unix seconds, 0 when unknown.
    pub fn maintenance_start_secs(&self) -> i64 {
        self.maintenance_window
            .as_ref()
            .and_then(|w| w.starts_at)
            .map(|t| t.timestamp())
            .unwrap_or(0)
    }

    /// Maintenance window end as Unix seconds, 0 when unknown.
    pub fn maintenance_end_secs(&self) -> i64 {
        self.maintenance_window
            .as_ref()
            .and_then(|w| w.ends_at)
            .map(|t| t.timestamp())
            .unwrap_or(0)
    }

    /// Maintenance status, if a window with a status is attached.
    pub fn maintenance_status(&self) -> Option<&str> {
        self.maintenance_window
            .as_ref()
            .and_then(|w| w.status.as_deref())
    }
}
