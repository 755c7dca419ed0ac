//! Double-buffered per-phase callback queues.
//!
//! Each phase holds two swappable, insertion-ordered buffers: the one being
//! drained this frame and the one accumulating work for the next. The swap is
//! a pointer exchange, never a copy, and replaces a single mutable iteration
//! target so callbacks may schedule freely while their own phase is running.

use crate::common::{CallbackId, Phase};
use std::mem;

/// Callback queue for a single phase.
#[derive(Debug, Default)]
pub(crate) struct PhaseQueue {
    this_frame: Vec<CallbackId>,
    next_frame: Vec<CallbackId>,
    is_running: bool,
    flush_next: bool,
}

impl PhaseQueue {
    /// Queues a callback id.
    ///
    /// Mid-drain with `run_now` set, the id joins the in-progress buffer and
    /// executes within the current drain; otherwise it lands in the pending
    /// buffer for the next one. Enqueueing an id already present in the
    /// target buffer has no duplicate-execution effect.
    pub(crate) fn enqueue(&mut self, id: CallbackId, run_now: bool) {
        let queue = if self.is_running && run_now {
            &mut self.this_frame
        } else {
            &mut self.next_frame
        };
        if !queue.contains(&id) {
            queue.push(id);
        }
    }

    /// Removes a callback id from the pending buffer.
    ///
    /// The in-progress buffer is left untouched; an active drain is never
    /// retroactively edited.
    pub(crate) fn cancel(&mut self, id: CallbackId) {
        self.next_frame.retain(|queued| *queued != id);
    }

    /// Empties both buffers.
    pub(crate) fn clear(&mut self) {
        self.this_frame.clear();
        self.next_frame.clear();
    }

    /// True while a drain of this phase is in progress.
    pub(crate) fn is_running(&self) -> bool {
        self.is_running
    }

    /// True if work is queued for the next drain.
    pub(crate) fn has_pending(&self) -> bool {
        !self.next_frame.is_empty()
    }

    /// Begins a drain. Returns false if one is already running, in which case
    /// a flush re-run is recorded instead: the re-entrant caller returns and
    /// the outer drain runs the phase again once its pass completes.
    pub(crate) fn try_begin(&mut self) -> bool {
        if self.is_running {
            self.flush_next = true;
            false
        } else {
            self.is_running = true;
            true
        }
    }

    /// Swaps the pending buffer in as the current drain target.
    pub(crate) fn swap(&mut self) {
        mem::swap(&mut self.this_frame, &mut self.next_frame);
    }

    /// The id at `index` of the in-progress buffer, which may grow while the
    /// drain walks it (`run_now` re-entrant scheduling).
    pub(crate) fn current(&self, index: usize) -> Option<CallbackId> {
        self.this_frame.get(index).copied()
    }

    /// Ends one drain pass: clears the drained buffer and reports whether a
    /// re-entrant trigger requested another pass. When no flush is owed the
    /// drain is finished and the running flag drops.
    pub(crate) fn finish_pass(&mut self) -> bool {
        self.this_frame.clear();
        if self.flush_next {
            self.flush_next = false;
            true
        } else {
            self.is_running = false;
            false
        }
    }
}

/// The fixed, ordered set of phase queues (read → update → render).
#[derive(Debug, Default)]
pub(crate) struct PhaseRegistry {
    queues: [PhaseQueue; Phase::COUNT],
}

impl PhaseRegistry {
    pub(crate) fn queue(&self, phase: Phase) -> &PhaseQueue {
        &self.queues[phase.index()]
    }

    pub(crate) fn queue_mut(&mut self, phase: Phase) -> &mut PhaseQueue {
        &mut self.queues[phase.index()]
    }

    /// Removes a callback id from every phase's pending buffer.
    pub(crate) fn cancel_everywhere(&mut self, id: CallbackId) {
        for queue in &mut self.queues {
            queue.cancel(id);
        }
    }

    /// Empties every phase's buffers.
    pub(crate) fn clear_all(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
    }

    /// True if any phase has work queued for a future drain.
    pub(crate) fn has_pending(&self) -> bool {
        self.queues.iter().any(PhaseQueue::has_pending)
    }
}
