//! Barrier gate control
//!
//! Single consumer of the entry and exit event channels. Mutual exclusion
//! of barrier actuation is structural: one worker, one actuator, so two
//! open/hold/close sequences can never overlap. The entry channel is
//! polled before the exit channel each pass, which gives entry implicit
//! priority when both fire in the same tick, while exit still drains in
//! the same pass.
//!
//! Lock discipline: the capacity lock is never held across the physical
//! actuation. The admission check copies the capacity out and releases;
//! the bookkeeping update re-acquires after the barrier has closed.

use crate::domain::{GateStatus, SensorEvent};
use crate::infra::config::Config;
use crate::infra::state::StateStore;
use crate::io::hardware::{Barrier, BarrierPosition};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tracing::{info, trace, warn};

pub struct GateController {
    store: Arc<StateStore>,
    barrier: Arc<dyn Barrier>,
    entry_rx: mpsc::Receiver<SensorEvent>,
    exit_rx: mpsc::Receiver<SensorEvent>,
    poll_timeout: Duration,
    dwell: Duration,
}

impl GateController {
    pub fn new(
        config: &Config,
        store: Arc<StateStore>,
        barrier: Arc<dyn Barrier>,
        entry_rx: mpsc::Receiver<SensorEvent>,
        exit_rx: mpsc::Receiver<SensorEvent>,
    ) -> Self {
        Self {
            store,
            barrier,
            entry_rx,
            exit_rx,
            poll_timeout: Duration::from_millis(config.gate_poll_ms()),
            dwell: Duration::from_millis(config.dwell_ms()),
        }
    }

    /// One scheduling pass: drain at most one entry event, then at most
    /// one exit event. Public so tests can step the controller.
    pub async fn pass(&mut self) {
        match timeout(self.poll_timeout, self.entry_rx.recv()).await {
            Ok(Some(_)) => self.handle_entry().await,
            Ok(None) => trace!(channel = "entry", "event_channel_closed"),
            Err(_) => {}
        }

        match timeout(self.poll_timeout, self.exit_rx.recv()).await {
            Ok(Some(_)) => self.handle_exit().await,
            Ok(None) => trace!(channel = "exit", "event_channel_closed"),
            Err(_) => {}
        }
    }

    async fn handle_entry(&mut self) {
        // Admission check copies capacity out; the lock is gone before
        // any actuation starts.
        let capacity = self.store.capacity();
        if capacity.is_full() {
            info!(total = capacity.total, "entry_denied_lot_full");
            return;
        }

        info!(
            available = capacity.available,
            total = capacity.total,
            "entry_admitted"
        );

        self.cycle_barrier().await;

        let capacity = self.store.record_entry();
        info!(
            available = capacity.available,
            total = capacity.total,
            "entry_complete"
        );
        if capacity.is_full() {
            info!("lot_now_full");
        }
    }

    async fn handle_exit(&mut self) {
        // Exits are never denied; the lot cannot refuse to let a car out.
        info!("exit_started");

        self.cycle_barrier().await;

        let (capacity, applied) = self.store.record_exit();
        if applied {
            info!(
                available = capacity.available,
                total = capacity.total,
                "exit_complete"
            );
        } else {
            // Spurious duplicate exit signal; clamped at total
            warn!(total = capacity.total, "exit_increment_suppressed");
        }
    }

    /// One full open/hold/close actuation. The dwell is the only long
    /// suspension in the real-time lane and runs with no lock held.
    async fn cycle_barrier(&self) {
        self.store.set_gate(GateStatus::Open);
        self.barrier.move_to(BarrierPosition::Open);

        sleep(self.dwell).await;

        self.barrier.move_to(BarrierPosition::Closed);
        self.store.set_gate(GateStatus::Closed);
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            dwell_ms = %self.dwell.as_millis(),
            poll_timeout_ms = %self.poll_timeout.as_millis(),
            "gate_controller_started"
        );

        let mut pass_timer = interval(self.poll_timeout);
        pass_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("gate_controller_shutdown");
                        return;
                    }
                }
                _ = pass_timer.tick() => {}
            }

            self.pass().await;
        }
    }
}
