use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Identifies one reconciliation cycle.
///
/// Generations are handed out in strictly increasing order, so a larger value
/// always belongs to a cycle that was started later.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// What a cycle loads, e.g. the whole view or one grid tile.
///
/// A cycle only supersedes earlier cycles of the same scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleScope(String);

impl CycleScope {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CycleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A started cycle: its scope and the generation it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTicket {
    pub scope: CycleScope,
    pub generation: Generation,
}

/// Hands out generations and remembers the latest one per scope.
///
/// Results of a cycle that arrive after a newer cycle of the same scope has
/// begun are stale and must not be merged. Cycles of other scopes run
/// independently.
#[derive(Debug, Default)]
pub struct CycleClock {
    next: AtomicU64,
    latest: Mutex<HashMap<CycleScope, Generation>>,
}

impl CycleClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, scope: CycleScope) -> CycleTicket {
        let generation = Generation(self.next.fetch_add(1, Ordering::AcqRel) + 1);
        self.latest.lock().insert(scope.clone(), generation);
        CycleTicket { scope, generation }
    }

    /// The most recently started generation of `scope`.
    pub fn latest(&self, scope: &CycleScope) -> Option<Generation> {
        self.latest.lock().get(scope).copied()
    }

    pub fn is_current(&self, ticket: &CycleTicket) -> bool {
        self.latest(&ticket.scope) == Some(ticket.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::{CycleClock, CycleScope};

    #[test]
    fn newer_cycle_supersedes_same_scope() {
        let clock = CycleClock::new();
        let scope = CycleScope::new("reload:view");
        assert_eq!(clock.latest(&scope), None);
        let a = clock.begin(scope.clone());
        let b = clock.begin(scope.clone());
        assert!(b.generation > a.generation);
        assert!(clock.is_current(&b));
        assert!(!clock.is_current(&a));
        assert_eq!(clock.latest(&scope), Some(b.generation));
    }

    #[test]
    fn other_scopes_stay_current() {
        let clock = CycleClock::new();
        let west = clock.begin(CycleScope::new("tile:host:0,0,1,1"));
        let east = clock.begin(CycleScope::new("tile:router:10,10,11,11"));
        assert!(clock.is_current(&west));
        assert!(clock.is_current(&east));
        assert!(east.generation > west.generation);
    }
}
