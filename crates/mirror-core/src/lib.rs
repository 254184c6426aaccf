//! Discrete-event simulation kernel for MIRROR, a replicated firm-deadline
//! database.
//!
//! Models transactions competing for locked resources under the PA_PB
//! concurrency-control policy (priority abort, with state-conscious
//! priority blocking) and reports how many transactions finish within
//! their deadline versus miss it.
//!
//! ## Modules
//!
//! - [`options`]: run configuration (`MirrorOptions`) and its TOML loader.
//! - [`arena`]: the generational-handle table `Process`/`Transaction`
//!   records live in, sidestepping the reference cycles between them.
//! - [`process`]: the per-cohort state machine (Worker/Writer/Updater).
//! - [`resource`]: the lock table and deadline-ordered wait queue.
//! - [`transaction`]: the record a process's owner groups its cohorts under.
//! - [`policy`]: the PA_PB preemption oracle.
//! - [`scheduler`]: `Simulator`, the kernel that ties everything together.
//! - [`stats`]: run counters returned by [`run`].
//! - [`error`]: invariant-violation types; these indicate a kernel bug, not
//!   a simulated outcome.

pub mod arena;
pub mod error;
pub mod options;
pub mod policy;
pub mod process;
pub mod resource;
pub mod scheduler;
pub mod stats;
pub mod transaction;

pub use error::Invariant;
pub use options::{ArrivalModel, MirrorOptions};
pub use process::{LockRef, ProcessId, ProcessKind, ProcessRecord, ProcessState};
pub use resource::{Lock, Resource};
pub use scheduler::Simulator;
pub use stats::Stats;
pub use transaction::{Outcome, ProcessSpec, TransactionId, TransactionRecord};

/// A resource's index in `[0, db_size)`. Plain `u32`, not a generational
/// handle: resources are allocated once up front for the run's lifetime and
/// never freed individually, so there is no slot-reuse hazard to guard
/// against.
pub type ResourceId = u32;

/// Run one complete simulation and return its final statistics (spec §6).
pub fn run(options: MirrorOptions) -> Stats {
    Simulator::new(options).run()
}
