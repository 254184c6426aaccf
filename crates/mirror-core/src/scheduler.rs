//! The simulation kernel (spec §4.4).
//!
//! `Simulator` is the single mutable hub every cross-entity operation flows
//! through -- acquiring a lock can need to read the holder's process record
//! and restart the holder's whole transaction, which a method on `Resource`
//! or `Process` alone can't see (§9 "Global state"). The `impl Simulator`
//! block below covers clock/arrival/selection; resource and transaction
//! logic continue it from `resource.rs` and `transaction.rs` would be the
//! conventional split, but since both need the same entity tables this file
//! keeps them together rather than fighting the borrow checker across
//! files for no benefit.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arena::Arena;
use crate::error::Invariant;
use crate::options::{ArrivalModel, MirrorOptions};
use crate::policy::{self, PolicyView};
use crate::process::{LockRef, ProcessId, ProcessKind, ProcessRecord, ProcessState};
use crate::resource::Resource;
use crate::stats::Stats;
use crate::transaction::{Outcome, ProcessSpec, TransactionId, TransactionRecord};
use crate::ResourceId;

/// Owns every entity table for one run and drives the tick loop.
pub struct Simulator {
    options: MirrorOptions,
    rng: StdRng,
    clock: u64,
    resources: Vec<Resource>,
    processes: Arena<ProcessRecord>,
    transactions: Arena<TransactionRecord>,
    live_transactions: HashSet<TransactionId>,
    /// Processes not yet `Complete`; the schedulable candidate set.
    active_processes: HashSet<ProcessId>,
    stats: Stats,
}

impl Simulator {
    pub fn new(options: MirrorOptions) -> Simulator {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let resources = (0..options.db_size)
            .map(|i| Resource::new(i, options.replicas as usize))
            .collect();
        Simulator {
            options,
            rng,
            clock: 0,
            resources,
            processes: Arena::new(),
            transactions: Arena::new(),
            live_transactions: HashSet::new(),
            active_processes: HashSet::new(),
            stats: Stats::default(),
        }
    }

    /// Run until `num_finished + num_missed >= sim_size`.
    pub fn run(mut self) -> Stats {
        while self.stats.num_finished + self.stats.num_missed < self.options.sim_size {
            self.tick();
        }
        self.stats.cycles = self.clock;
        self.stats.finalize(self.options.sim_size)
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn process(&self, id: ProcessId) -> Option<&ProcessRecord> {
        self.processes.get(id)
    }

    pub fn transaction(&self, id: TransactionId) -> Option<&TransactionRecord> {
        self.transactions.get(id)
    }

    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id as usize]
    }

    /// Seed a transaction directly, bypassing arrival sampling. Used by
    /// tests that need to pin exact resources/lengths rather than draw them
    /// from the RNG.
    pub fn inject(&mut self, arrival: u64, deadline: u64, specs: Vec<ProcessSpec>) -> TransactionId {
        let txn = TransactionRecord::new(arrival, deadline, specs.clone());
        let owner = self.transactions.insert(txn);
        self.live_transactions.insert(owner);
        self.spawn_processes_for(owner, &specs, arrival, deadline);
        owner
    }

    fn resource_mut(&mut self, id: ResourceId) -> &mut Resource {
        &mut self.resources[id as usize]
    }

    pub fn tick(&mut self) {
        self.clock += 1;

        let expired: Vec<TransactionId> = self
            .live_transactions
            .iter()
            .copied()
            .filter(|&t| self.transactions.expect(t).deadline < self.clock)
            .collect();
        for t in expired {
            self.expire_transaction(t);
        }

        let arrival_chance = self.arrival_probability();
        if self.rng.random_bool(arrival_chance.clamp(0.0, 1.0)) {
            self.begin_transaction();
        }

        // Rescan-and-sort rather than an incremental heap: a process's
        // tie-break key (`state`) can change on every tick it runs, so a
        // cached position would go stale the moment it advances.
        // `active_processes` is a HashSet, so its iteration order is not
        // itself reproducible run-to-run; the handle's arena index is
        // appended as a last tie-break so the sort -- and thus which
        // process wins an exact tie on (deadline, arrival, state) -- is
        // fully determined by the run's history, preserving the "same
        // seed, bit-identical stats" law.
        let mut candidates: Vec<ProcessId> = self.active_processes.iter().copied().collect();
        candidates.sort_by_key(|&p| {
            let rec = self.processes.expect(p);
            (rec.deadline, rec.arrival, rec.state, p.index())
        });

        // Blocking is re-checked live as we walk, not pre-filtered: a
        // process ticked earlier in this same pass (e.g. an updater
        // reaching Contract) can unblock one later in priority order (e.g.
        // its parent writer), and both should still advance within one
        // tick if the cpu budget allows.
        let mut advanced = 0u32;
        for p in candidates {
            if advanced >= self.options.cpu_count {
                break;
            }
            if self.processes.get(p).is_none() {
                continue;
            }
            if self.is_blocking(p) {
                continue;
            }
            self.tick_process(p);
            advanced += 1;
        }
        if advanced == 0 {
            self.stats.idle_cycles += 1;
        }
    }

    fn arrival_probability(&self) -> f64 {
        let lambda = self.options.arrival_rate / 1000.0;
        match self.options.arrival_model {
            ArrivalModel::PmfAtOne => lambda * (-lambda).exp(),
            ArrivalModel::BernoulliThinning => 1.0 - (-lambda).exp(),
        }
    }

    fn is_blocking(&self, p: ProcessId) -> bool {
        let rec = self.processes.expect(p);
        match rec.state {
            ProcessState::Complete => true,
            ProcessState::Begin => false,
            ProcessState::Expand => rec.lock.is_none(),
            ProcessState::Contract => {
                if rec.is_writer() {
                    let needed = (self.options.replicas as usize).saturating_sub(1);
                    if rec.updaters.len() < needed {
                        false
                    } else {
                        !rec.updaters.iter().all(|&u| {
                            self.processes
                                .get(u)
                                .map(|r| r.state >= ProcessState::Contract)
                                .unwrap_or(false)
                        })
                    }
                } else {
                    // An Updater that has reached Contract waits for its
                    // parent writer to complete it.
                    true
                }
            }
        }
    }

    fn tick_process(&mut self, p: ProcessId) {
        let state = self.processes.expect(p).state;
        match state {
            ProcessState::Begin => {
                let resource = self.processes.expect(p).target;
                let acquired = self.acquire(resource, p);
                self.processes.expect_mut(p).state = ProcessState::Expand;
                if acquired {
                    // The lock hand-off (or a free slot) arrived in the
                    // same tick as the acquire attempt, so this tick also
                    // counts as the process's first tick of progress.
                    let (progress, length) = {
                        let rec = self.processes.expect_mut(p);
                        rec.progress += 1;
                        (rec.progress, rec.length)
                    };
                    if progress >= length {
                        self.ready(p);
                    }
                }
            }
            ProcessState::Expand => {
                let (progress, length) = {
                    let rec = self.processes.expect_mut(p);
                    rec.progress += 1;
                    (rec.progress, rec.length)
                };
                if progress >= length {
                    self.ready(p);
                }
            }
            ProcessState::Contract => self.tick_writer_contract(p),
            ProcessState::Complete => Invariant::TickedCompletedProcess.fail(),
        }
    }

    fn ready(&mut self, p: ProcessId) {
        match self.processes.expect(p).kind {
            ProcessKind::Worker => self.complete_process(p),
            ProcessKind::Writer => self.writer_ready(p),
            ProcessKind::Updater => {
                self.processes.expect_mut(p).state = ProcessState::Contract;
            }
        }
    }

    fn writer_ready(&mut self, p: ProcessId) {
        let replicas = self.options.replicas;
        if replicas <= 1 {
            self.complete_process(p);
            return;
        }
        self.processes.expect_mut(p).state = ProcessState::Contract;
        let spawn_time = self.options.spawn_time;
        if spawn_time < 1 {
            let needed = (replicas - 1) as usize;
            for _ in 0..needed {
                self.spawn_updater(p);
            }
        } else {
            self.processes.expect_mut(p).length += spawn_time;
        }
    }

    fn tick_writer_contract(&mut self, p: ProcessId) {
        let needed = (self.options.replicas as usize).saturating_sub(1);
        let updaters_len = self.processes.expect(p).updaters.len();
        if updaters_len < needed {
            let (progress, length) = {
                let rec = self.processes.expect_mut(p);
                rec.progress += 1;
                (rec.progress, rec.length)
            };
            if progress >= length {
                self.spawn_updater(p);
                let still_needed = self.processes.expect(p).updaters.len() < needed;
                if still_needed {
                    let spawn_time = self.options.spawn_time;
                    self.processes.expect_mut(p).length += spawn_time;
                }
            }
        } else {
            let all_ready = self.processes.expect(p).updaters.iter().all(|&u| {
                self.processes
                    .get(u)
                    .map(|r| r.state >= ProcessState::Contract)
                    .unwrap_or(false)
            });
            if all_ready {
                self.complete_process(p);
            }
        }
    }

    fn spawn_updater(&mut self, writer: ProcessId) {
        let (resource, owner, arrival, deadline) = {
            let rec = self.processes.expect(writer);
            (rec.target, rec.owner, rec.arrival, rec.deadline)
        };
        let write_time = self.options.write_time;
        let updater = ProcessRecord::new(owner, resource, ProcessKind::Updater, write_time, arrival, deadline);
        let uid = self.processes.insert(updater);
        self.processes.expect_mut(writer).updaters.push(uid);
        self.transactions.expect_mut(owner).processes.push(uid);
        self.active_processes.insert(uid);
    }

    /// Release `p`'s own lock (asserting it actually holds one) and, if a
    /// waiter is queued, hand the freed slot straight to it.
    fn hard_release(&mut self, p: ProcessId) {
        let lock = self.processes.expect(p).lock;
        let Some(LockRef { resource, slot }) = lock else {
            let target = self.processes.expect(p).target;
            Invariant::ReleaseOfUnheldLock { resource: target }.fail();
        };
        self.resource_mut(resource).locks[slot as usize].holder = None;
        self.processes.expect_mut(p).lock = None;
        if let Some(w) = self.resource_mut(resource).queue.pop() {
            self.bind(resource, slot as usize, w);
        }
    }

    fn complete_process(&mut self, p: ProcessId) {
        self.hard_release(p);
        self.processes.expect_mut(p).state = ProcessState::Complete;
        self.active_processes.remove(&p);

        let updaters = self.processes.expect(p).updaters.clone();
        for u in &updaters {
            if self.processes.expect(*u).state == ProcessState::Complete {
                Invariant::DoubleCompleteUpdater.fail();
            }
            self.hard_release(*u);
            self.processes.expect_mut(*u).state = ProcessState::Complete;
            self.active_processes.remove(u);
        }

        let owner = self.processes.expect(p).owner;
        self.finish_if_complete(owner);
    }

    fn finish_if_complete(&mut self, owner: TransactionId) {
        if !self.transactions.expect(owner).is_live() {
            return;
        }
        let all_complete = {
            let t = self.transactions.expect(owner);
            !t.processes.is_empty()
                && t.processes.iter().all(|&p| {
                    self.processes
                        .get(p)
                        .map(|r| r.state == ProcessState::Complete)
                        .unwrap_or(false)
                })
        };
        if !all_complete {
            return;
        }
        let deadline = self.transactions.expect(owner).deadline;
        if self.clock > deadline {
            self.transactions.expect_mut(owner).outcome = Some(Outcome::Missed);
            self.stats.num_missed += 1;
        } else {
            self.transactions.expect_mut(owner).outcome = Some(Outcome::Finished);
            self.stats.num_finished += 1;
        }
        self.live_transactions.remove(&owner);
        let processes = self.transactions.expect(owner).processes.clone();
        for p in processes {
            self.processes.remove(p);
            self.active_processes.remove(&p);
        }
        self.transactions.remove(owner);
    }

    /// `acquire(p)` against `resource`: bind a free slot, preempt a holder
    /// under PA_PB, or enqueue (spec §4.1). Returns `true` if `p` now holds
    /// a lock.
    fn acquire(&mut self, resource: ResourceId, p: ProcessId) -> bool {
        if let Some(slot) = self.resource(resource).free_slot() {
            self.bind(resource, slot, p);
            return true;
        }

        let num_slots = self.resource(resource).locks.len();
        for slot in 0..num_slots {
            let holder = self.resource(resource).locks[slot].holder;
            let Some(h) = holder else { continue };
            if h == p {
                continue;
            }
            if self.pa_pb_holds(h, p) {
                let owner = self.processes.expect(h).owner;
                self.stats.cc_aborts += 1;
                self.restart_transaction(owner);
                if let Some(free) = self.resource(resource).free_slot() {
                    self.bind(resource, free, p);
                    return true;
                }
                // The freed slot was handed straight to an older waiter
                // already in the queue; keep scanning other holders.
            }
        }

        if self.resource(resource).queue.contains(p)
            || self.resource(resource).locks.iter().any(|l| l.holder == Some(p))
        {
            Invariant::AlreadyQueuedOrHolding { resource }.fail();
        }
        let (deadline, arrival) = self.priority_of(p);
        self.resource_mut(resource)
            .queue
            .push(p, deadline, arrival, ProcessState::Expand);
        false
    }

    fn bind(&mut self, resource: ResourceId, slot: usize, p: ProcessId) {
        self.resource_mut(resource).locks[slot].holder = Some(p);
        self.processes.expect_mut(p).lock = Some(LockRef {
            resource,
            slot: slot as u32,
        });
    }

    fn priority_of(&self, p: ProcessId) -> (u64, u64) {
        let rec = self.processes.expect(p);
        (rec.deadline, rec.arrival)
    }

    fn pa_pb_holds(&self, h: ProcessId, r: ProcessId) -> bool {
        let hp = self.processes.expect(h);
        let rp = self.processes.expect(r);
        let holder = PolicyView {
            kind: hp.kind,
            state: hp.state,
            holds_lock: hp.lock.is_some(),
            deadline: hp.deadline,
        };
        let requestor = PolicyView {
            kind: rp.kind,
            state: rp.state,
            holds_lock: rp.lock.is_some(),
            deadline: rp.deadline,
        };
        policy::pa_pb(holder, requestor)
    }

    /// Release every process of `owner` (freeing or dequeuing each) without
    /// recording an outcome. Shared by `restart_transaction` and
    /// `expire_transaction`.
    fn abort_processes(&mut self, owner: TransactionId) {
        let processes = std::mem::take(&mut self.transactions.expect_mut(owner).processes);
        for p in processes {
            self.remove_job(p);
        }
    }

    /// Tear down one process: release its lock (handing off to a waiter)
    /// or drop it from whatever queue it sits in, or do nothing if it
    /// hasn't been ticked yet (still `Begin`, holds nothing).
    fn remove_job(&mut self, p: ProcessId) {
        let lock = self.processes.expect(p).lock;
        match lock {
            Some(LockRef { resource, slot }) => {
                self.resource_mut(resource).locks[slot as usize].holder = None;
                self.processes.expect_mut(p).lock = None;
                if let Some(w) = self.resource_mut(resource).queue.pop() {
                    self.bind(resource, slot as usize, w);
                }
            }
            None => {
                let target = self.processes.expect(p).target;
                self.resource_mut(target).queue.remove(p);
            }
        }
        self.active_processes.remove(&p);
        self.processes.remove(p);
    }

    fn restart_transaction(&mut self, owner: TransactionId) {
        self.abort_processes(owner);
        let (specs, arrival, deadline) = {
            let t = self.transactions.expect(owner);
            (t.specs.clone(), t.arrival, t.deadline)
        };
        if self.clock <= deadline {
            self.spawn_processes_for(owner, &specs, arrival, deadline);
        }
        // Otherwise the transaction stays live with zero processes and is
        // reaped as missed on the next expiry sweep.
    }

    fn expire_transaction(&mut self, owner: TransactionId) {
        self.abort_processes(owner);
        self.transactions.expect_mut(owner).outcome = Some(Outcome::Missed);
        self.live_transactions.remove(&owner);
        self.stats.num_missed += 1;
        self.transactions.remove(owner);
    }

    fn spawn_processes_for(&mut self, owner: TransactionId, specs: &[ProcessSpec], arrival: u64, deadline: u64) {
        for spec in specs {
            let rec = ProcessRecord::new(owner, spec.target, spec.kind, spec.length, arrival, deadline);
            let pid = self.processes.insert(rec);
            self.transactions.expect_mut(owner).processes.push(pid);
            self.active_processes.insert(pid);
        }
    }

    fn begin_transaction(&mut self) {
        let arrival = self.clock;
        let (lo, hi) = self.options.transaction_size;
        let size = if lo > hi { lo } else { self.rng.random_range(lo..=hi) } as usize;
        let resources = self.sample_resources(size);

        let mut specs = Vec::with_capacity(resources.len());
        let mut expected_total = 0u64;
        for r in resources {
            let buffered = self.rng.random_bool(self.options.buffered_chance.clamp(0.0, 1.0));
            let mut length = if buffered {
                self.options.buffered_time
            } else {
                self.options.access_time
            };
            let is_writer = self.rng.random_bool(self.options.write_chance.clamp(0.0, 1.0));
            let kind = if is_writer {
                length += self.options.write_time;
                ProcessKind::Writer
            } else {
                ProcessKind::Worker
            };
            expected_total += self.options.access_time + if is_writer { self.options.write_time } else { 0 };
            specs.push(ProcessSpec {
                target: r,
                kind,
                length,
            });
        }

        let deadline = arrival + (self.options.deadline_slack * expected_total as f64).round() as u64;
        self.inject(arrival, deadline, specs);
    }

    fn sample_resources(&mut self, count: usize) -> Vec<ResourceId> {
        let db_size = self.options.db_size as usize;
        if count == 0 || db_size == 0 {
            return Vec::new();
        }
        rand::seq::index::sample(&mut self.rng, db_size, count.min(db_size))
            .into_iter()
            .map(|i| i as u32)
            .collect()
    }
}
