//! The process state machine (spec §4.2).
//!
//! A [`ProcessRecord`] is pure data; every transition that needs to touch a
//! resource's locks or a transaction's bookkeeping lives on [`Simulator`]
//! instead (see `scheduler.rs`), since those operations need mutable access
//! to entities a single `&mut Process` receiver can't see.
//!
//! [`Simulator`]: crate::scheduler::Simulator

use crate::arena::Handle;
use crate::transaction::TransactionRecord;
use crate::ResourceId;

pub type ProcessId = Handle<ProcessRecord>;

/// The three roles a process can play against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    /// Read-only cohort. Completes as soon as it has held its lock for
    /// `length` ticks.
    Worker,
    /// Primary update site. Spawns `replicas - 1` updaters once its own
    /// expand phase finishes, and completes only once every updater has
    /// reached `Contract`.
    Writer,
    /// A remote replica writer spawned by a `Writer`. Acquires its own lock,
    /// works for `write_time` ticks, then waits to be released by its
    /// parent's `complete()`.
    Updater,
}

/// A process's position in its own lifecycle.
///
/// Ordered exactly as spec §3 numbers them (`Begin(0) < Expand(1) <
/// Contract(2) < Complete(3)`) since the scheduler's tie-break on "lowest
/// state" depends on that ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessState {
    Begin,
    Expand,
    Contract,
    Complete,
}

/// The specific lock slot a process currently holds, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRef {
    pub resource: ResourceId,
    pub slot: u32,
}

/// A unit of work inside a transaction, targeting one resource.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub owner: Handle<TransactionRecord>,
    pub target: ResourceId,
    pub kind: ProcessKind,
    pub state: ProcessState,
    pub length: u64,
    pub progress: u64,
    pub lock: Option<LockRef>,
    /// Present only on a `Writer`; the updaters it has spawned so far.
    pub updaters: Vec<ProcessId>,
    /// The tick this process's owning transaction arrived. Cached here (it
    /// never changes) so the scheduler's tie-break doesn't need to chase the
    /// `owner` handle for every comparison.
    pub arrival: u64,
    /// The tick this process's owning transaction's deadline falls on.
    /// Process "priority" per spec §3 ("Priority = owning transaction's
    /// deadline").
    pub deadline: u64,
}

impl ProcessRecord {
    pub fn new(
        owner: Handle<TransactionRecord>,
        target: ResourceId,
        kind: ProcessKind,
        length: u64,
        arrival: u64,
        deadline: u64,
    ) -> Self {
        ProcessRecord {
            owner,
            target,
            kind,
            state: ProcessState::Begin,
            length,
            progress: 0,
            lock: None,
            updaters: Vec::new(),
            arrival,
            deadline,
        }
    }

    pub fn is_worker(&self) -> bool {
        self.kind == ProcessKind::Worker
    }

    pub fn is_writer(&self) -> bool {
        self.kind == ProcessKind::Writer
    }

    pub fn is_updater(&self) -> bool {
        self.kind == ProcessKind::Updater
    }

    /// The sort key the scheduler and resource wait queues select on:
    /// earlier deadline first, then earlier arrival, then lower state.
    pub fn priority_key(&self) -> (u64, u64, ProcessState) {
        (self.deadline, self.arrival, self.state)
    }
}
