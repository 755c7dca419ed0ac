//! Internal building blocks of the engine: per-phase callback queues and the
//! recurring-callback registry.

pub(crate) mod loops;
pub(crate) mod phase;
