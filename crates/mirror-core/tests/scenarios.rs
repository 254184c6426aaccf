//! End-to-end walk-throughs of the kernel's headline behaviors, each pinned
//! to a handful of `tick()` calls with exact expected state rather than a
//! full `run()`. These exercise the same paths as `scheduler`'s unit tests
//! but at the `Simulator` public API, the way a caller embedding the crate
//! would.

use mirror_core::{MirrorOptions, ProcessKind, ProcessSpec, ProcessState, Simulator};

fn options(db_size: u32, replicas: u32, cpu_count: u32) -> MirrorOptions {
    MirrorOptions {
        db_size,
        replicas,
        cpu_count,
        sim_size: 1,
        seed: Some(7),
        arrival_rate: 0.0,
        ..MirrorOptions::default()
    }
}

/// Single writer, two replicas: the lock is acquired on tick 1, the writer
/// spends `spawn_time < 1` so it spawns its one updater atomically on the
/// tick it enters Contract, and both processes complete together once the
/// updater catches up.
#[test]
fn single_writer_two_replicas_spawns_and_completes() {
    let mut opts = options(1, 2, 1);
    opts.spawn_time = 0;
    opts.write_time = 2;
    let mut sim = Simulator::new(opts);

    let owner = sim.inject(
        0,
        1000,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Writer,
            length: 10,
        }],
    );
    let writer = sim.transaction(owner).unwrap().processes[0];

    sim.tick();
    let rec = sim.process(writer).unwrap();
    assert_eq!(rec.state, ProcessState::Expand);
    assert_eq!(rec.progress, 1);
    assert!(rec.lock.is_some());

    for _ in 0..9 {
        sim.tick();
    }
    let rec = sim.process(writer).unwrap();
    assert_eq!(rec.progress, 10);
    assert_eq!(rec.state, ProcessState::Contract);
    assert_eq!(rec.updaters.len(), 1);
    let updater = rec.updaters[0];
    assert!(sim.process(updater).unwrap().lock.is_none());

    sim.tick(); // updater acquires the second replica slot.
    let urec = sim.process(updater).unwrap();
    assert_eq!(urec.state, ProcessState::Expand);
    assert!(urec.lock.is_some());

    sim.tick(); // updater reaches Contract; with cpu_count = 1 this consumes
    // the tick's only slot, so the writer can't notice until the next one.
    let urec = sim.process(updater).unwrap();
    assert_eq!(urec.state, ProcessState::Contract);
    assert!(sim.process(writer).is_some());

    sim.tick(); // writer is now unblocked and completes, releasing the updater too.
    assert!(sim.process(writer).is_none());
    assert!(sim.process(updater).is_none());
    assert_eq!(sim.stats().num_finished, 1);
    assert!(sim.resource(0).locks.iter().all(|l| l.holder.is_none()));
}

/// A less urgent holder is preempted by a more urgent requestor; on restart
/// the holder's transaction respawns and re-enters the queue rather than
/// vanishing.
#[test]
fn pa_preemption_respawns_holder_into_the_queue() {
    let mut sim = Simulator::new(options(1, 1, 2));

    let holder = sim.inject(
        0,
        100,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 50,
        }],
    );
    sim.tick();
    let holder_pid = sim.transaction(holder).unwrap().processes[0];
    assert!(sim.process(holder_pid).unwrap().lock.is_some());

    let requestor = sim.inject(
        0,
        5,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 20,
        }],
    );
    sim.tick();
    let requestor_pid = sim.transaction(requestor).unwrap().processes[0];
    assert!(sim.process(requestor_pid).unwrap().lock.is_some());
    assert_eq!(sim.stats().cc_aborts, 1);

    let respawned = sim.transaction(holder).unwrap().processes[0];
    assert_ne!(respawned, holder_pid);
    assert!(sim.process(respawned).unwrap().lock.is_none());

    sim.tick(); // the respawned holder attempts to re-acquire and is blocked.
    assert!(sim.resource(0).queue.contains(respawned));
}

/// An updater that is actively writing (holds its lock) is protected from
/// preemption even by a more urgent requestor; the requestor simply queues.
#[test]
fn writing_updater_blocks_rather_than_aborts() {
    let mut sim = Simulator::new(options(1, 1, 1));

    let holder = sim.inject(
        0,
        1000,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Updater,
            length: 50,
        }],
    );
    sim.tick();
    let holder_pid = sim.transaction(holder).unwrap().processes[0];
    assert!(sim.process(holder_pid).unwrap().lock.is_some());

    let requestor = sim.inject(
        0,
        10,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 5,
        }],
    );
    sim.tick();
    let requestor_pid = sim.transaction(requestor).unwrap().processes[0];
    assert!(sim.process(requestor_pid).unwrap().lock.is_none());
    assert!(sim.resource(0).queue.contains(requestor_pid));
    assert_eq!(sim.stats().cc_aborts, 0);
}

/// Three processes with distinct deadlines compete for one replica under a
/// holder urgent enough that none of them can ever preempt it (pure PB).
/// The wait queue hands the freed lock off in deadline order, not arrival
/// order.
#[test]
fn wait_queue_hands_off_in_deadline_order_not_arrival_order() {
    let mut sim = Simulator::new(options(1, 1, 4));

    let holder = sim.inject(
        0,
        5,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 2,
        }],
    );
    let t30 = sim.inject(
        0,
        30,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 2,
        }],
    );
    let t20 = sim.inject(
        1,
        20,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 2,
        }],
    );
    let t40 = sim.inject(
        2,
        40,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 2,
        }],
    );
    let holder_pid = sim.transaction(holder).unwrap().processes[0];
    let p30 = sim.transaction(t30).unwrap().processes[0];
    let p20 = sim.transaction(t20).unwrap().processes[0];
    let p40 = sim.transaction(t40).unwrap().processes[0];

    sim.tick(); // holder acquires; the other three attempt and queue, same tick.
    assert!(sim.process(holder_pid).unwrap().lock.is_some());
    assert!(sim.resource(0).queue.contains(p30));
    assert!(sim.resource(0).queue.contains(p20));
    assert!(sim.resource(0).queue.contains(p40));
    assert_eq!(sim.stats().cc_aborts, 0);

    sim.tick(); // holder finishes its second tick of progress and completes.
    assert_eq!(
        sim.resource(0).locks[0].holder,
        Some(p20),
        "the earliest deadline among the waiters should get the freed slot"
    );

    sim.tick(); // p20's first tick of progress.
    sim.tick(); // p20 completes, hands off to p30.
    assert_eq!(sim.resource(0).locks[0].holder, Some(p30));

    sim.tick();
    sim.tick(); // p30 completes, hands off to p40.
    assert_eq!(sim.resource(0).locks[0].holder, Some(p40));
}

/// A transaction blocked behind a long-running holder it can never preempt
/// is reaped as missed by the expiry sweep, and its queued slot is released.
#[test]
fn expired_transaction_is_dequeued_and_counted_missed() {
    let mut sim = Simulator::new(options(1, 1, 1));

    // Inject and tick the holder alone first, so it claims the only slot
    // with no same-tick priority race against the victim.
    let holder = sim.inject(
        0,
        1000,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 1000,
        }],
    );
    sim.tick();
    let holder_pid = sim.transaction(holder).unwrap().processes[0];
    assert!(sim.process(holder_pid).unwrap().lock.is_some());

    let victim = sim.inject(
        sim.clock(),
        sim.clock() + 50,
        vec![ProcessSpec {
            target: 0,
            kind: ProcessKind::Worker,
            length: 10,
        }],
    );
    sim.tick(); // victim attempts, is blocked behind the holder, and queues.
    let victim_pid = sim.transaction(victim).unwrap().processes[0];
    assert!(sim.process(victim_pid).unwrap().lock.is_none());
    assert!(sim.resource(0).queue.contains(victim_pid));

    let deadline = sim.transaction(victim).unwrap().deadline;
    while sim.clock() <= deadline {
        sim.tick();
    }
    assert!(sim.transaction(victim).is_none());
    assert_eq!(sim.stats().num_missed, 1);
    assert!(sim.resource(0).queue.is_empty());
    assert!(sim.process(holder_pid).unwrap().lock.is_some());
}
