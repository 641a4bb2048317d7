//! Error types for inventory fetching.

use thiserror::Error;

/// Result type alias for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors that can occur while building the client or listing servers.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("STACKIT_SERVICE_ACCOUNT_TOKEN is not set")]
    MissingToken,

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("request to IaaS API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IaaS API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode server list: {0}")]
    Decode(String),
}
