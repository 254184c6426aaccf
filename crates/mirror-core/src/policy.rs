//! The PA_PB preemption oracle (spec §4.1).
//!
//! Called when a requestor `r` finds a lock already held by `h`. Returns
//! `true` if `h` should be aborted to make room for `r` (Priority Abort),
//! `false` if `r` should instead be enqueued (Priority Block).
//!
//! Note on priority direction: spec §3 defines "priority = deadline, earlier
//! deadline = higher priority". Preemption is meant to favor the *more
//! urgent* requestor, i.e. `r` should preempt `h` when `r.deadline <
//! h.deadline`. Equal deadlines never preempt (spec: "Ties ... do not
//! preempt").

use crate::process::{ProcessKind, ProcessState};

/// The minimal view of a process `pa_pb` needs: its kind, lifecycle state,
/// whether it currently holds a lock, and its priority (owning
/// transaction's deadline).
#[derive(Debug, Clone, Copy)]
pub struct PolicyView {
    pub kind: ProcessKind,
    pub state: ProcessState,
    pub holds_lock: bool,
    pub deadline: u64,
}

/// `true` means abort `holder` to seat `requestor`.
pub fn pa_pb(holder: PolicyView, requestor: PolicyView) -> bool {
    if holder.kind == ProcessKind::Updater {
        if !holder.holds_lock {
            // The "holder" is itself only queued, not actively writing:
            // apply ordinary PA against it.
            return more_urgent(requestor, holder);
        }
        // Actively writing: protected, block instead.
        return false;
    }
    if holder.state >= ProcessState::Contract {
        // Already in its commit phase: protected, block instead.
        return false;
    }
    more_urgent(requestor, holder)
}

/// `true` if `a` has strictly earlier deadline than `b` (and is thus more
/// urgent). Equal deadlines are not "more urgent" either way.
fn more_urgent(a: PolicyView, b: PolicyView) -> bool {
    a.deadline < b.deadline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(kind: ProcessKind, state: ProcessState, holds_lock: bool, deadline: u64) -> PolicyView {
        PolicyView {
            kind,
            state,
            holds_lock,
            deadline,
        }
    }

    #[test]
    fn pa_preempts_a_less_urgent_worker_holder() {
        let h = view(ProcessKind::Worker, ProcessState::Expand, true, 100);
        let r = view(ProcessKind::Worker, ProcessState::Expand, false, 50);
        assert!(pa_pb(h, r));
    }

    #[test]
    fn equal_deadlines_do_not_preempt() {
        let h = view(ProcessKind::Worker, ProcessState::Expand, true, 50);
        let r = view(ProcessKind::Worker, ProcessState::Expand, false, 50);
        assert!(!pa_pb(h, r));
    }

    #[test]
    fn less_urgent_requestor_does_not_preempt() {
        let h = view(ProcessKind::Worker, ProcessState::Expand, true, 50);
        let r = view(ProcessKind::Worker, ProcessState::Expand, false, 100);
        assert!(!pa_pb(h, r));
    }

    #[test]
    fn holder_in_contract_is_protected() {
        let h = view(ProcessKind::Writer, ProcessState::Contract, true, 100);
        let r = view(ProcessKind::Worker, ProcessState::Expand, false, 1);
        assert!(!pa_pb(h, r));
    }

    #[test]
    fn actively_writing_updater_is_protected() {
        let h = view(ProcessKind::Updater, ProcessState::Expand, true, 100);
        let r = view(ProcessKind::Worker, ProcessState::Expand, false, 1);
        assert!(!pa_pb(h, r));
    }

    #[test]
    fn waiting_updater_is_subject_to_pa() {
        let h = view(ProcessKind::Updater, ProcessState::Begin, false, 100);
        let r = view(ProcessKind::Worker, ProcessState::Expand, false, 1);
        assert!(pa_pb(h, r));
    }
}
