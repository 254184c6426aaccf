//! Run counters and the final report handed back to callers (spec §6).

use serde::Serialize;

/// The outcome of one complete `run`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Stats {
    /// Final clock value.
    pub cycles: u64,
    pub num_finished: u64,
    pub num_missed: u64,
    /// `num_missed / sim_size`. `0.0` if `sim_size` is zero.
    pub miss_pct: f64,
    /// Ticks in which zero processes were selected to run.
    pub idle_cycles: u64,
    /// Total PA preemptions (restarts), not counting restarts that were
    /// no-ops because the deadline had already passed.
    pub cc_aborts: u64,
}

impl Stats {
    pub(crate) fn finalize(mut self, sim_size: u64) -> Stats {
        self.miss_pct = if sim_size == 0 {
            0.0
        } else {
            self.num_missed as f64 / sim_size as f64
        };
        self
    }
}
