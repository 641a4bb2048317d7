//! Gauge registry — named gauge families addressed by ordered label tuples.
//!
//! Each family owns its series map behind its own `RwLock`. A series value
//! is an `AtomicU64` holding the `f64` bits, so updating a series that
//! already exists only needs the read lock and proceeds while a scrape is
//! rendering. Creating a series takes the write lock for one insert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::prometheus::{FamilySnapshot, render_prometheus};

/// Destination for gauge updates.
///
/// The collector writes through this trait so tests can capture updates
/// without a real registry.
pub trait MetricSink: Send + Sync {
    /// Set the series of family `name` addressed by `labels` (values in the
    /// family's label order) to `value`. Last write wins.
    fn set_series(&self, name: &str, labels: &[&str], value: f64);

    /// Drop every series of `name` for which `keep` returns false.
    /// Returns the number of series removed. Sinks without removal
    /// support keep everything.
    fn retain_series(&self, name: &str, keep: &dyn Fn(&[String]) -> bool) -> usize {
        let _ = (name, keep);
        0
    }
}

/// One gauge family.
struct Family {
    name: String,
    help: String,
    label_names: Vec<String>,
    series: RwLock<HashMap<Vec<String>, Arc<AtomicU64>>>,
}

impl Family {
    fn snapshot(&self) -> FamilySnapshot {
        let series = read(&self.series);
        let mut rows: Vec<(Vec<String>, f64)> = series
            .iter()
            .map(|(labels, v)| (labels.clone(), f64::from_bits(v.load(Ordering::Relaxed))))
            .collect();
        drop(series);
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        FamilySnapshot {
            name: self.name.clone(),
            help: self.help.clone(),
            label_names: self.label_names.clone(),
            series: rows,
        }
    }
}

/// Process-owned set of gauge families.
///
/// Cheap to clone; clones share the same families.
#[derive(Clone, Default)]
pub struct Registry {
    families: Arc<RwLock<Vec<Arc<Family>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a gauge family. Returns false (and keeps the existing
    /// declaration) if a family with this name is already registered.
    pub fn describe_gauge(&self, name: &str, help: &str, label_names: &[&str]) -> bool {
        let mut families = write(&self.families);
        if let Some(existing) = families.iter().find(|f| f.name == name) {
            if existing.label_names.iter().map(String::as_str).ne(label_names.iter().copied()) {
                warn!(metric = name, "gauge redeclared with different labels; keeping original");
            }
            return false;
        }

        families.push(Arc::new(Family {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            series: RwLock::new(HashMap::new()),
        }));
        debug!(metric = name, "gauge family registered");
        true
    }

    fn family(&self, name: &str) -> Option<Arc<Family>> {
        read(&self.families).iter().find(|f| f.name == name).cloned()
    }

    /// Current value of a series, if it exists.
    pub fn get(&self, name: &str, labels: &[&str]) -> Option<f64> {
        let family = self.family(name)?;
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let value = read(&family.series)
            .get(&key)
            .map(|v| f64::from_bits(v.load(Ordering::Relaxed)));
        value
    }

    /// Number of series currently held by a family (0 if undeclared).
    pub fn series_count(&self, name: &str) -> usize {
        self.family(name).map(|f| read(&f.series).len()).unwrap_or(0)
    }

    /// Render every family in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let families: Vec<Arc<Family>> = read(&self.families).clone();
        let snapshots: Vec<FamilySnapshot> = families.iter().map(|f| f.snapshot()).collect();
        render_prometheus(&snapshots)
    }
}

impl MetricSink for Registry {
    fn set_series(&self, name: &str, labels: &[&str], value: f64) {
        let Some(family) = self.family(name) else {
            warn!(metric = name, "update for undeclared gauge ignored");
            return;
        };
        if labels.len() != family.label_names.len() {
            warn!(
                metric = name,
                expected = family.label_names.len(),
                got = labels.len(),
                "label count mismatch; update ignored"
            );
            return;
        }

        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let bits = value.to_bits();

        if let Some(cell) = read(&family.series).get(&key) {
            cell.store(bits, Ordering::Relaxed);
            return;
        }

        write(&family.series)
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicU64::new(bits)))
            .store(bits, Ordering::Relaxed);
    }

    fn retain_series(&self, name: &str, keep: &dyn Fn(&[String]) -> bool) -> usize {
        let Some(family) = self.family(name) else {
            return 0;
        };
        let mut series = write(&family.series);
        let before = series.len();
        series.retain(|labels, _| keep(labels.as_slice()));
        before - series.len()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
