use std::collections::BTreeMap;

use foundation::{GeoBounds, Millis};
use tokio::sync::watch;

/// Bookkeeping key for one in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Describes a fetch for tracking purposes only.
///
/// The id is `<op>-<discriminant>-<issued_at>` with the JSON form of the
/// bounds appended when present. It carries no retry or ordering meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub op: &'static str,
    pub discriminant: String,
    pub issued_at: Millis,
    pub bounds: Option<GeoBounds>,
}

impl RequestDescriptor {
    pub fn new(op: &'static str, discriminant: impl Into<String>, bounds: Option<GeoBounds>) -> Self {
        Self::at(op, discriminant, Millis::now(), bounds)
    }

    pub fn at(
        op: &'static str,
        discriminant: impl Into<String>,
        issued_at: Millis,
        bounds: Option<GeoBounds>,
    ) -> Self {
        Self {
            op,
            discriminant: discriminant.into(),
            issued_at,
            bounds,
        }
    }

    pub fn id(&self) -> RequestId {
        let mut id = format!("{}-{}-{}", self.op, self.discriminant, self.issued_at);
        if let Some(bounds) = &self.bounds {
            if let Ok(json) = serde_json::to_string(bounds) {
                id.push('-');
                id.push_str(&json);
            }
        }
        RequestId(id)
    }
}

/// Counts outstanding fetches and drives the global loading flag.
///
/// The flag turns on with the first `start` and off when the last outstanding
/// request ends. Identical ids are counted, not collapsed, so two fetches that
/// happen to share an id still need two `end` calls.
#[derive(Debug)]
pub struct RequestTracker {
    in_flight: BTreeMap<RequestId, usize>,
    outstanding: usize,
    loading: watch::Sender<bool>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        let (loading, _rx) = watch::channel(false);
        Self {
            in_flight: BTreeMap::new(),
            outstanding: 0,
            loading,
        }
    }

    /// Receiver that observes every loading flag transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn start(&mut self, id: RequestId) {
        tracing::trace!(request = %id, "request started");
        *self.in_flight.entry(id).or_insert(0) += 1;
        self.outstanding += 1;
        if !self.is_loading() {
            self.loading.send_replace(true);
        }
    }

    /// Ends a request started with [`start`](Self::start).
    ///
    /// Returns `false` for an id that is not in flight; the count is left
    /// untouched in that case.
    pub fn end(&mut self, id: &RequestId) -> bool {
        let Some(count) = self.in_flight.get_mut(id) else {
            tracing::warn!(request = %id, "end for unknown request");
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.in_flight.remove(id);
        }
        self.outstanding -= 1;
        tracing::trace!(request = %id, outstanding = self.outstanding, "request ended");
        if self.outstanding == 0 {
            self.loading.send_replace(false);
        }
        true
    }
}
