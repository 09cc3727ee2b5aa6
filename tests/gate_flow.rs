//! End-to-end entry/exit protocol tests
//!
//! Drives the simulated sensor lines through the monitor and the gate
//! controller against a shared store, with paused tokio time so barrier
//! dwells cost nothing.

use carpark::domain::GateStatus;
use carpark::infra::{Config, StateStore};
use carpark::io::hardware::BarrierPosition;
use carpark::io::sim::{SimBarrier, SimClimate, SimInput};
use carpark::services::{EnvironmentMonitor, GateController, SensorMonitor};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

struct Flow {
    monitor: SensorMonitor,
    gate: GateController,
    store: Arc<StateStore>,
    entry: SimInput,
    exit: SimInput,
    barrier: SimBarrier,
}

fn config_with_slots(total_slots: u32) -> Config {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "[parking]\ntotal_slots = {total_slots}").unwrap();
    temp_file.flush().unwrap();
    Config::from_file(temp_file.path()).unwrap()
}

fn flow(total_slots: u32) -> Flow {
    let config = config_with_slots(total_slots);
    let store = Arc::new(StateStore::new(config.total_slots()));

    let entry = SimInput::new("entry");
    let exit = SimInput::new("exit");
    let barrier = SimBarrier::new(config.barrier_open_angle(), config.barrier_closed_angle());

    let (entry_tx, entry_rx) = mpsc::channel(config.event_queue_depth());
    let (exit_tx, exit_rx) = mpsc::channel(config.event_queue_depth());

    let monitor = SensorMonitor::new(
        &config,
        Box::new(entry.clone()),
        Box::new(exit.clone()),
        entry_tx,
        exit_tx,
    );
    let gate = GateController::new(
        &config,
        store.clone(),
        Arc::new(barrier.clone()),
        entry_rx,
        exit_rx,
    );

    Flow { monitor, gate, store, entry, exit, barrier }
}

impl Flow {
    /// One vehicle pass over the entry sensor, then one controller pass.
    async fn drive_entry(&mut self) {
        self.entry.set_active(true);
        self.monitor.poll_once();
        self.entry.set_active(false);
        self.monitor.poll_once();
        self.gate.pass().await;
    }

    async fn drive_exit(&mut self) {
        self.exit.set_active(true);
        self.monitor.poll_once();
        self.exit.set_active(false);
        self.monitor.poll_once();
        self.gate.pass().await;
    }

    fn assert_invariant(&self) {
        let cap = self.store.capacity();
        assert!(cap.available <= cap.total, "capacity invariant violated: {cap:?}");
    }
}

/// Every actuation is a strict Open, Closed pair; overlapping sequences
/// would break the alternation.
fn assert_strict_alternation(transitions: &[BarrierPosition]) {
    assert!(transitions.len() % 2 == 0, "unterminated actuation: {transitions:?}");
    for pair in transitions.chunks(2) {
        assert_eq!(pair, [BarrierPosition::Open, BarrierPosition::Closed]);
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_a_single_entry_from_full_availability() {
    let mut flow = flow(4);

    flow.drive_entry().await;

    assert_eq!(flow.store.capacity().available, 3);
    assert_eq!(flow.store.gate(), GateStatus::Closed);
    assert_eq!(
        flow.barrier.transitions(),
        vec![BarrierPosition::Open, BarrierPosition::Closed]
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_b_exhaustion_denies_further_entries() {
    let mut flow = flow(4);

    // Scenario A first
    flow.drive_entry().await;
    assert_eq!(flow.store.capacity().available, 3);

    // Four more consecutive entries drain the lot; the fourth is denied
    for _ in 0..4 {
        flow.drive_entry().await;
        flow.assert_invariant();
    }
    assert_eq!(flow.store.capacity().available, 0);

    // A fifth entry is denied and changes nothing
    let actuations_before = flow.barrier.transitions().len();
    flow.drive_entry().await;
    assert_eq!(flow.store.capacity().available, 0);
    assert_eq!(flow.barrier.transitions().len(), actuations_before);
    assert_eq!(flow.store.gate(), GateStatus::Closed);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_exit_from_empty_availability() {
    let mut flow = flow(4);

    for _ in 0..4 {
        flow.drive_entry().await;
    }
    assert_eq!(flow.store.capacity().available, 0);

    flow.drive_exit().await;
    assert_eq!(flow.store.capacity().available, 1);
    assert_eq!(flow.store.gate(), GateStatus::Closed);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_invalid_sample_never_observable() {
    let config = config_with_slots(4);
    let store = Arc::new(StateStore::new(4));
    let climate = SimClimate::new(f32::NAN, f32::NAN);
    let mut monitor = EnvironmentMonitor::new(&config, store.clone(), Arc::new(climate.clone()));

    monitor.sample_once();
    climate.set_sample(22.5, 51.0);
    monitor.sample_once();

    let env = store.environment();
    assert_eq!(env.temperature, 22.5);
    assert_eq!(env.humidity, 51.0);
}

#[tokio::test(start_paused = true)]
async fn duplicate_exit_still_cycles_but_clamps_capacity() {
    let mut flow = flow(2);

    flow.drive_entry().await;
    flow.drive_exit().await;
    assert_eq!(flow.store.capacity().available, 2);

    // Spurious second exit: barrier cycles, capacity stays clamped
    flow.drive_exit().await;
    assert_eq!(flow.store.capacity().available, 2);
    assert_eq!(flow.barrier.transitions().len(), 6);
    flow.assert_invariant();
}

#[tokio::test(start_paused = true)]
async fn lingering_vehicle_produces_exactly_one_actuation() {
    let mut flow = flow(4);

    // Vehicle sits on the entry sensor for many poll ticks
    flow.entry.set_active(true);
    for _ in 0..50 {
        flow.monitor.poll_once();
    }
    flow.entry.set_active(false);
    flow.monitor.poll_once();

    // Drain everything the monitor produced
    for _ in 0..5 {
        flow.gate.pass().await;
    }

    assert_eq!(flow.store.capacity().available, 3);
    assert_eq!(flow.barrier.transitions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn mixed_traffic_holds_invariant_and_alternation() {
    let mut flow = flow(3);

    flow.drive_entry().await;
    flow.drive_entry().await;
    flow.drive_exit().await;
    flow.drive_entry().await;
    flow.drive_entry().await;
    flow.drive_exit().await;
    flow.drive_exit().await;
    flow.drive_exit().await; // clamped at total

    flow.assert_invariant();
    assert_eq!(flow.store.capacity().available, 3);
    assert_strict_alternation(&flow.barrier.transitions());
}

#[tokio::test(start_paused = true)]
async fn entry_and_exit_pending_in_one_pass_both_drain() {
    let mut flow = flow(4);

    // Queue both before letting the controller run
    flow.entry.set_active(true);
    flow.exit.set_active(true);
    flow.monitor.poll_once();
    flow.entry.set_active(false);
    flow.exit.set_active(false);
    flow.monitor.poll_once();

    flow.gate.pass().await;

    // Two full cycles, entry first, no interleaving
    assert_strict_alternation(&flow.barrier.transitions());
    assert_eq!(flow.barrier.transitions().len(), 4);
    assert_eq!(flow.store.capacity().available, 4);
}
