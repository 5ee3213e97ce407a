use layers::{LinkSummary, MergeSummary};
use runtime::Generation;

/// What one reconciliation cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub generation: Generation,
    pub locations: MergeSummary,
    /// `None` when links are hidden or the cycle was superseded.
    pub links: Option<LinkSummary>,
    pub requests: usize,
    pub failed_requests: usize,
    /// Responses dropped because a newer cycle had started.
    pub stale_responses: usize,
    /// A newer cycle of the same scope began before this one finished.
    pub superseded: bool,
    /// Segments that never signalled completion; the link pass waits for zero.
    pub pending_segments: usize,
}

impl CycleReport {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            locations: MergeSummary::default(),
            links: None,
            requests: 0,
            failed_requests: 0,
            stale_responses: 0,
            superseded: false,
            pending_segments: 0,
        }
    }

    pub fn absorb(&mut self, part: &BatchReport) {
        self.locations.added += part.locations.added;
        self.locations.updated += part.locations.updated;
        self.locations.skipped += part.locations.skipped;
        self.requests += part.requests;
        self.failed_requests += part.failed_requests;
        self.stale_responses += part.stale_responses;
        self.pending_segments += part.pending_segments;
    }
}

/// Partial tally for one group of requests inside a cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub locations: MergeSummary,
    pub requests: usize,
    pub failed_requests: usize,
    pub stale_responses: usize,
    pub pending_segments: usize,
}

/// Result of applying one response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Merged(MergeSummary),
    Stale,
}

impl BatchReport {
    pub fn record_failure(&mut self) {
        self.requests += 1;
        self.failed_requests += 1;
    }

    pub fn record_applied(&mut self, applied: Applied) {
        self.requests += 1;
        match applied {
            Applied::Merged(m) => {
                self.locations.added += m.added;
                self.locations.updated += m.updated;
                self.locations.skipped += m.skipped;
            }
            Applied::Stale => self.stale_responses += 1,
        }
    }

    pub fn merge(&mut self, other: &BatchReport) {
        self.locations.added += other.locations.added;
        self.locations.updated += other.locations.updated;
        self.locations.skipped += other.locations.skipped;
        self.requests += other.requests;
        self.failed_requests += other.failed_requests;
        self.stale_responses += other.stale_responses;
        self.pending_segments += other.pending_segments;
    }
}

#[cfg(test)]
mod tests {
    use super::{Applied, BatchReport, CycleReport};
    use layers::MergeSummary;
    use runtime::Generation;

    #[test]
    fn batches_roll_up_into_cycle() {
        let mut a = BatchReport::default();
        a.record_applied(Applied::Merged(MergeSummary {
            added: 2,
            updated: 1,
            skipped: 0,
        }));
        a.record_failure();
        let mut b = BatchReport::default();
        b.record_applied(Applied::Stale);
        b.pending_segments = 1;
        a.merge(&b);

        let mut report = CycleReport::new(Generation(3));
        report.absorb(&a);
        assert_eq!(report.requests, 3);
        assert_eq!(report.failed_requests, 1);
        assert_eq!(report.stale_responses, 1);
        assert_eq!(report.locations.added, 2);
        assert_eq!(report.locations.updated, 1);
        assert_eq!(report.pending_segments, 1);
    }
}
