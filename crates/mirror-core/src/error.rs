//! Invariant violations.
//!
//! Per spec §7, these conditions are programmer bugs, not simulated
//! outcomes: a correct implementation never triggers them. They're given a
//! proper type with a readable `Display` (grounded on
//! `mesh-rt/src/actor/registry.rs`'s `NameAlreadyRegistered`) purely so the
//! panic message at the one call site that can trigger each variant is
//! self-documenting; nothing catches or recovers from an `Invariant`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invariant {
    /// `Resource::release` was called for a process that neither holds a
    /// lock on the resource nor sits in its wait queue.
    ReleaseOfUnheldLock { resource: u32 },
    /// A process already in `Complete` was handed another tick by the
    /// scheduler.
    TickedCompletedProcess,
    /// An updater's `complete()` path ran more than once for the same
    /// process.
    DoubleCompleteUpdater,
    /// A process was enqueued on a resource it already appears in a queue
    /// for, or already holds a lock on.
    AlreadyQueuedOrHolding { resource: u32 },
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invariant::ReleaseOfUnheldLock { resource } => {
                write!(f, "release() called for a lock not held on resource {resource}")
            }
            Invariant::TickedCompletedProcess => {
                write!(f, "scheduler advanced a process already in Complete")
            }
            Invariant::DoubleCompleteUpdater => {
                write!(f, "updater completed more than once")
            }
            Invariant::AlreadyQueuedOrHolding { resource } => {
                write!(
                    f,
                    "process already queued or holding a lock on resource {resource}"
                )
            }
        }
    }
}

impl std::error::Error for Invariant {}

impl Invariant {
    /// Fail loudly and abort the run, per spec §7.
    pub fn fail(self) -> ! {
        panic!("{self}")
    }
}
