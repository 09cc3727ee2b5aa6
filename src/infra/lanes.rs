//! Worker scheduling lanes
//!
//! Workers are partitioned by latency sensitivity instead of being pinned
//! to hardware cores: a real-time lane (sensor polling, gate actuation,
//! indicators, climate) and a best-effort lane (dashboard, bot, display,
//! timekeeper). The real-time lane owns a dedicated runtime so that
//! unbounded-latency I/O on the best-effort lane can never steal its
//! threads. The affinity policy lives entirely in the spawn declaration.
//!
//! All workers are created once at startup and live until process exit;
//! nothing is spawned or torn down afterwards.

use anyhow::Context;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{error, info};

/// Scheduling affinity for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Hardware-facing loops with bounded pass times
    RealTime,
    /// Network and presentation I/O with unbounded latency
    BestEffort,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::RealTime => "real-time",
            Lane::BestEffort => "best-effort",
        }
    }
}

/// Relative importance within a lane.
///
/// `High` buys a dedicated OS thread: the worker never waits for another
/// worker's poll to finish. Reserved for loops where a missed tick is
/// unrecoverable (the sensor debounce window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

/// Executor for the fixed worker set.
///
/// Owns the real-time lane runtime; best-effort workers run on the ambient
/// runtime `WorkerSet::new` was called from.
pub struct WorkerSet {
    realtime: Runtime,
    best_effort: Handle,
}

impl WorkerSet {
    /// Must be called from within a tokio runtime (it becomes the
    /// best-effort lane).
    pub fn new(realtime_threads: usize) -> anyhow::Result<Self> {
        let realtime = Builder::new_multi_thread()
            .worker_threads(realtime_threads)
            .thread_name("lane-rt")
            .enable_all()
            .build()
            .context("failed to build real-time lane runtime")?;

        Ok(Self { realtime, best_effort: Handle::current() })
    }

    /// Spawn a worker on its declared lane.
    pub fn spawn<F>(
        &self,
        lane: Lane,
        priority: Priority,
        name: &'static str,
        future: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            worker = name,
            lane = lane.as_str(),
            priority = priority.as_str(),
            "worker_spawned"
        );

        match (lane, priority) {
            (Lane::RealTime, Priority::High) => {
                let _detached = std::thread::Builder::new()
                    .name(format!("{name}-hi"))
                    .spawn(move || match Builder::new_current_thread().enable_all().build() {
                        Ok(rt) => rt.block_on(future),
                        Err(e) => {
                            error!(worker = name, error = %e, "worker_runtime_build_failed");
                        }
                    })
                    .with_context(|| format!("failed to spawn thread for worker {name}"))?;
            }
            (Lane::RealTime, _) => {
                self.realtime.spawn(future);
            }
            (Lane::BestEffort, _) => {
                self.best_effort.spawn(future);
            }
        }

        Ok(())
    }

    /// Release the real-time lane without blocking the caller. Only used
    /// on the way out of `main`.
    pub fn shutdown(self) {
        self.realtime.shutdown_background();
    }
}
