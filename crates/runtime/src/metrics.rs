use std::collections::BTreeMap;

pub const LOCATIONS_ADDED: &str = "locations.added";
pub const LOCATIONS_UPDATED: &str = "locations.updated";
pub const LOCATIONS_SKIPPED: &str = "locations.skipped";
pub const LINKS_CREATED: &str = "links.created";
pub const LINKS_UPDATED: &str = "links.updated";
pub const LINKS_SKIPPED: &str = "links.skipped";
pub const REQUESTS_FAILED: &str = "requests.failed";
pub const RESPONSES_STALE: &str = "responses.stale";
pub const PROCESS_MS: &str = "process.ms";

/// Counters and histograms collected across reconciliation cycles.
///
/// Keys live in sorted maps so snapshots have a stable order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncMetrics {
    counters: BTreeMap<String, u64>,
    histograms: BTreeMap<String, Histogram>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
}

impl Histogram {
    pub fn record(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(String, u64)>,
    pub histograms: Vec<(String, Histogram)>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: impl Into<String>, by: u64) {
        if by == 0 {
            return;
        }
        *self.counters.entry(name.into()).or_insert(0) += by;
    }

    pub fn record_histogram(&mut self, name: impl Into<String>, value: u64) {
        self.histograms.entry(name.into()).or_default().record(value);
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            histograms: self
                .histograms
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}
