//! Tracks which scheduled callbacks are recurring.
//!
//! The live count of active recurring callbacks is the engine's primary
//! signal for whether ticking should continue after a drain with no other
//! work left.

use crate::common::CallbackId;
use std::collections::HashSet;

/// Membership registry for recurring ("looping") callbacks.
///
/// Marking is idempotent: the active count moves exactly once per add and
/// once per remove, so re-marking an already-recurring callback never double
/// counts it.
#[derive(Debug, Default)]
pub(crate) struct LoopRegistry {
    marked: HashSet<CallbackId>,
}

impl LoopRegistry {
    /// Marks a callback as recurring. No-op if already marked.
    pub(crate) fn mark(&mut self, id: CallbackId) {
        self.marked.insert(id);
    }

    /// Unmarks a callback. No-op if it was never marked.
    pub(crate) fn unmark(&mut self, id: CallbackId) {
        self.marked.remove(&id);
    }

    pub(crate) fn is_marked(&self, id: CallbackId) -> bool {
        self.marked.contains(&id)
    }

    /// Number of currently active recurring callbacks.
    pub(crate) fn active_count(&self) -> usize {
        self.marked.len()
    }

    pub(crate) fn clear(&mut self) {
        self.marked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<CallbackId> {
        let mut arena: SlotMap<CallbackId, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn mark_counts_each_identity_once() {
        let mut loops = LoopRegistry::default();
        let ids = ids(2);
        loops.mark(ids[0]);
        loops.mark(ids[0]);
        loops.mark(ids[1]);
        assert_eq!(loops.active_count(), 2);
        assert!(loops.is_marked(ids[0]));
    }

    #[test]
    fn unmark_is_idempotent() {
        let mut loops = LoopRegistry::default();
        let ids = ids(1);
        loops.mark(ids[0]);
        loops.unmark(ids[0]);
        loops.unmark(ids[0]);
        assert_eq!(loops.active_count(), 0);
        assert!(!loops.is_marked(ids[0]));
    }

    #[test]
    fn clear_empties_the_registry() {
        let mut loops = LoopRegistry::default();
        for id in ids(3) {
            loops.mark(id);
        }
        loops.clear();
        assert_eq!(loops.active_count(), 0);
    }
}
