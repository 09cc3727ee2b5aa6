//! Shared state registry - five independently locked aggregates
//!
//! Each aggregate gets its own named lock with an acquisition policy fixed
//! at construction, never a single global lock: the sensor/gate hot path
//! must not queue behind a slow presentation read. Two policies exist:
//!
//! - `Aggregate`: unconditional acquisition, hot-path data (capacity, gate
//!   status, environment reading). Critical sections are a copy or a field
//!   update; nothing blocking ever runs under the lock.
//! - `TimedAggregate`: bounded-timeout acquisition, cosmetic data (wall
//!   clock, display override). A timeout skips the update for this cycle;
//!   the next cycle retries.
//!
//! All accessors hand out copies. No caller ever sees a live reference
//! into an aggregate.

use crate::domain::{
    Capacity, EnvironmentReading, GateStatus, OverrideMessage, StatusSnapshot, WallClock,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Bounded wait for cosmetic-path locks. Generous next to the critical
/// sections involved (copying a couple of small strings).
const COSMETIC_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// Named lock with unconditional acquisition.
struct Aggregate<T> {
    name: &'static str,
    value: Mutex<T>,
}

impl<T: Clone> Aggregate<T> {
    fn new(name: &'static str, value: T) -> Self {
        Self { name, value: Mutex::new(value) }
    }

    fn get(&self) -> T {
        self.value.lock().clone()
    }

    fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.value.lock();
        f(&mut guard)
    }
}

/// Named lock with bounded-timeout acquisition. Timeout means the caller
/// skips this cycle rather than stalling or failing.
struct TimedAggregate<T> {
    name: &'static str,
    timeout: Duration,
    value: Mutex<T>,
}

impl<T: Clone> TimedAggregate<T> {
    fn new(name: &'static str, value: T) -> Self {
        Self { name, timeout: COSMETIC_LOCK_TIMEOUT, value: Mutex::new(value) }
    }

    fn try_get(&self) -> Option<T> {
        match self.value.try_lock_for(self.timeout) {
            Some(guard) => Some(guard.clone()),
            None => {
                debug!(aggregate = self.name, "lock_timeout_read_skipped");
                None
            }
        }
    }

    fn try_update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        match self.value.try_lock_for(self.timeout) {
            Some(mut guard) => Some(f(&mut guard)),
            None => {
                debug!(aggregate = self.name, "lock_timeout_update_skipped");
                None
            }
        }
    }
}

/// The five shared aggregates plus connectivity flags and process uptime.
///
/// Write ownership is one worker per aggregate: capacity and gate status
/// belong to the gate controller, the environment reading to the climate
/// monitor, the wall clock to the timekeeper, the display override to the
/// best-effort presentation lane. Everything else reads copies.
pub struct StateStore {
    capacity: Aggregate<Capacity>,
    gate: Aggregate<GateStatus>,
    environment: Aggregate<EnvironmentReading>,
    clock: TimedAggregate<WallClock>,
    display: TimedAggregate<Option<OverrideMessage>>,
    // Statistical flags only, never used for coordination
    wifi: AtomicBool,
    internet: AtomicBool,
    started_at: Instant,
}

impl StateStore {
    pub fn new(total_slots: u32) -> Self {
        Self {
            capacity: Aggregate::new("capacity", Capacity::full_lot(total_slots)),
            gate: Aggregate::new("gate_status", GateStatus::Closed),
            environment: Aggregate::new("environment", EnvironmentReading::default()),
            clock: TimedAggregate::new("wall_clock", WallClock::default()),
            display: TimedAggregate::new("display_override", None),
            wifi: AtomicBool::new(false),
            internet: AtomicBool::new(false),
            started_at: Instant::now(),
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity.get()
    }

    /// Book one completed entry. Called by the gate controller only, after
    /// the barrier has fully closed.
    pub fn record_entry(&self) -> Capacity {
        self.capacity.update(|c| {
            c.available = c.available.saturating_sub(1);
            *c
        })
    }

    /// Book one completed exit. The increment is suppressed at `total`
    /// so a duplicate exit signal cannot break the capacity invariant.
    /// Returns the new capacity and whether the increment was applied.
    pub fn record_exit(&self) -> (Capacity, bool) {
        self.capacity.update(|c| {
            if c.available < c.total {
                c.available += 1;
                (*c, true)
            } else {
                (*c, false)
            }
        })
    }

    pub fn gate(&self) -> GateStatus {
        self.gate.get()
    }

    pub fn set_gate(&self, status: GateStatus) {
        self.gate.update(|g| *g = status);
    }

    pub fn environment(&self) -> EnvironmentReading {
        self.environment.get()
    }

    /// Overwrite the last-known-good reading. The caller has already
    /// validated the sample; NaN must never reach this point.
    pub fn set_environment(&self, reading: EnvironmentReading) {
        self.environment.update(|e| *e = reading);
    }

    pub fn clock(&self) -> Option<WallClock> {
        self.clock.try_get()
    }

    /// Returns false when the bounded lock acquisition timed out and the
    /// clock keeps its previous value for this cycle.
    pub fn set_clock(&self, clock: WallClock) -> bool {
        self.clock.try_update(|c| *c = clock).is_some()
    }

    /// Post a display override. Most recent write wins.
    pub fn post_override(&self, message: OverrideMessage) -> bool {
        self.display.try_update(|d| *d = Some(message)).is_some()
    }

    /// Consume a pending override, if any. Each posted message is observed
    /// at most once.
    pub fn take_override(&self) -> Option<OverrideMessage> {
        self.display.try_update(|d| d.take()).flatten()
    }

    pub fn set_wifi(&self, up: bool) {
        self.wifi.store(up, Ordering::Relaxed);
    }

    pub fn set_internet(&self, up: bool) {
        self.internet.store(up, Ordering::Relaxed);
    }

    pub fn wifi(&self) -> bool {
        self.wifi.load(Ordering::Relaxed)
    }

    pub fn internet(&self) -> bool {
        self.internet.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// One coherent-enough view for the presentation channels. Aggregates
    /// are sampled one at a time; the channels tolerate a tick of skew.
    pub fn snapshot(&self) -> StatusSnapshot {
        let capacity = self.capacity();
        let gate = self.gate();
        let environment = self.environment();
        let clock = self.clock().unwrap_or_default();

        StatusSnapshot {
            available: capacity.available,
            occupied: capacity.occupied(),
            gate,
            temperature: environment.temperature,
            humidity: environment.humidity,
            time: clock.time,
            date: clock.date,
            wifi: self.wifi(),
            internet: self.internet(),
            uptime: self.uptime_secs(),
        }
    }
}
