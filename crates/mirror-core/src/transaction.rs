//! The transaction record (spec §4.3).
//!
//! Like [`ProcessRecord`](crate::process::ProcessRecord), this is pure data;
//! `begin`/`abort`/`restart`/`commit` are `Simulator` methods in
//! `scheduler.rs`, since each needs to create or tear down processes and
//! touch resource lock state the transaction itself doesn't own.

use crate::arena::Handle;
use crate::process::{ProcessId, ProcessKind};
use crate::ResourceId;

pub type TransactionId = Handle<TransactionRecord>;

/// The recipe used to (re-)create one child process, captured at `begin()`
/// so `restart()` can replay it exactly rather than re-sampling
/// `buffered_chance`/`write_chance` (spec §9 decision: "dependencies do not
/// change").
#[derive(Debug, Clone, Copy)]
pub struct ProcessSpec {
    pub target: ResourceId,
    pub kind: ProcessKind,
    pub length: u64,
}

/// The terminal outcome of a transaction, once it leaves the live set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Missed,
}

#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub arrival: u64,
    pub deadline: u64,
    pub specs: Vec<ProcessSpec>,
    pub processes: Vec<ProcessId>,
    pub outcome: Option<Outcome>,
}

impl TransactionRecord {
    pub fn new(arrival: u64, deadline: u64, specs: Vec<ProcessSpec>) -> Self {
        TransactionRecord {
            arrival,
            deadline,
            specs,
            processes: Vec::new(),
            outcome: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.outcome.is_none()
    }
}
