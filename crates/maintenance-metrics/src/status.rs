//! One-hot encoding of the maintenance status.
//!
//! The status on the wire is free-form. Only the values in
//! [`RECOGNIZED_STATUSES`] get their own series; anything else, including
//! no status at all, encodes as all zeros.

/// A maintenance status that has its own series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceStatus {
    Planned,
    Ongoing,
}

/// Every status with a series, in emission order.
pub const RECOGNIZED_STATUSES: [MaintenanceStatus; 2] =
    [MaintenanceStatus::Planned, MaintenanceStatus::Ongoing];

impl MaintenanceStatus {
    /// The `status` label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Ongoing => "ONGOING",
        }
    }

    /// Exact, case-sensitive match against the label values.
    pub fn parse(s: &str) -> Option<Self> {
        RECOGNIZED_STATUSES.into_iter().find(|st| st.as_str() == s)
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gauge value per recognized status: 1 for the active one, 0 otherwise.
pub fn encode_status(status: Option<&str>) -> [(MaintenanceStatus, f64); 2] {
    let active = status.and_then(MaintenanceStatus::parse);
    RECOGNIZED_STATUSES.map(|st| (st, if active == Some(st) { 1.0 } else { 0.0 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(status: Option<&str>) -> (f64, f64) {
        let [(p, planned), (o, ongoing)] = encode_status(status);
        assert_eq!(p, MaintenanceStatus::Planned);
        assert_eq!(o, MaintenanceStatus::Ongoing);
        (planned, ongoing)
    }

    #[test]
    fn planned() {
        assert_eq!(values(Some("PLANNED")), (1.0, 0.0));
    }

    #[test]
    fn ongoing() {
        assert_eq!(values(Some("ONGOING")), (0.0, 1.0));
    }

    #[test]
    fn absent_or_unrecognized_is_all_zero() {
        assert_eq!(values(None), (0.0, 0.0));
        assert_eq!(values(Some("")), (0.0, 0.0));
        assert_eq!(values(Some("COMPLETED")), (0.0, 0.0));
        assert_eq!(values(Some("planned")), (0.0, 0.0));
        assert_eq!(values(Some(" PLANNED")), (0.0, 0.0));
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(MaintenanceStatus::parse("ONGOING"), Some(MaintenanceStatus::Ongoing));
        assert_eq!(MaintenanceStatus::parse("ongoing"), None);
        assert_eq!(MaintenanceStatus::Planned.to_string(), "PLANNED");
    }
}
