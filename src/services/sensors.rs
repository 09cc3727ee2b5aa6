//! Presence sensor monitoring
//!
//! Polls the two active-low IR lines and converts them into at most one
//! event per physical pass. A vehicle lingering over a sensor holds the
//! line low for many ticks; the per-line latch makes sure only the first
//! tick emits. Event delivery is best-effort: a full channel drops the
//! event, and the sensor simply re-fires on the next pass if the vehicle
//! is still there.
//!
//! This worker runs at the highest priority in the real-time lane. A
//! missed transition here is unrecoverable until the next physical pass;
//! a delay anywhere else only costs responsiveness.

use crate::domain::SensorEvent;
use crate::infra::config::Config;
use crate::io::hardware::{InputLine, LineLevel};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{info, warn};

/// One-shot latch over a continuously sampled line: fires on the first
/// active sample, re-arms when the line goes inactive.
#[derive(Debug, Default)]
pub(crate) struct DebounceLatch {
    signaled: bool,
}

impl DebounceLatch {
    /// Returns true exactly once per continuous active-low period.
    pub(crate) fn poll(&mut self, level: LineLevel) -> bool {
        match level {
            LineLevel::Low if !self.signaled => {
                self.signaled = true;
                true
            }
            LineLevel::Low => false,
            LineLevel::High => {
                self.signaled = false;
                false
            }
        }
    }
}

pub struct SensorMonitor {
    entry_line: Box<dyn InputLine>,
    exit_line: Box<dyn InputLine>,
    entry_latch: DebounceLatch,
    exit_latch: DebounceLatch,
    entry_tx: mpsc::Sender<SensorEvent>,
    exit_tx: mpsc::Sender<SensorEvent>,
    poll_interval: Duration,
}

impl SensorMonitor {
    pub fn new(
        config: &Config,
        entry_line: Box<dyn InputLine>,
        exit_line: Box<dyn InputLine>,
        entry_tx: mpsc::Sender<SensorEvent>,
        exit_tx: mpsc::Sender<SensorEvent>,
    ) -> Self {
        Self {
            entry_line,
            exit_line,
            entry_latch: DebounceLatch::default(),
            exit_latch: DebounceLatch::default(),
            entry_tx,
            exit_tx,
            poll_interval: Duration::from_millis(config.sensor_poll_interval_ms()),
        }
    }

    /// One poll tick over both lines. Split out from `run` so tests can
    /// step the monitor without a clock.
    pub fn poll_once(&mut self) {
        if self.entry_latch.poll(self.entry_line.read()) {
            info!(sensor = "entry", "vehicle_detected");
            Self::dispatch(&self.entry_tx, SensorEvent::Entry);
        }
        if self.exit_latch.poll(self.exit_line.read()) {
            info!(sensor = "exit", "vehicle_detected");
            Self::dispatch(&self.exit_tx, SensorEvent::Exit);
        }
    }

    /// Non-blocking send; a full channel drops the event. At-most-once,
    /// no retry.
    fn dispatch(tx: &mpsc::Sender<SensorEvent>, event: SensorEvent) {
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(event = event.as_str(), "sensor_event_dropped_queue_full");
            }
            Err(TrySendError::Closed(_)) => {
                warn!(event = event.as_str(), "sensor_event_channel_closed");
            }
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_ms = %self.poll_interval.as_millis(),
            "sensor_monitor_started"
        );

        let mut poll_timer = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("sensor_monitor_shutdown");
                        return;
                    }
                }
                _ = poll_timer.tick() => {}
            }

            self.poll_once();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sim::SimInput;

    fn monitor_with_rig(
        depth: usize,
    ) -> (SensorMonitor, SimInput, SimInput, mpsc::Receiver<SensorEvent>, mpsc::Receiver<SensorEvent>)
    {
        let entry = SimInput::new("entry");
        let exit = SimInput::new("exit");
        let (entry_tx, entry_rx) = mpsc::channel(depth);
        let (exit_tx, exit_rx) = mpsc::channel(depth);
        let monitor = SensorMonitor::new(
            &Config::default(),
            Box::new(entry.clone()),
            Box::new(exit.clone()),
            entry_tx,
            exit_tx,
        );
        (monitor, entry, exit, entry_rx, exit_rx)
    }

    #[test]
    fn test_latch_fires_once_per_active_period() {
        let mut latch = DebounceLatch::default();
        assert!(latch.poll(LineLevel::Low));
        assert!(!latch.poll(LineLevel::Low));
        assert!(!latch.poll(LineLevel::Low));
        assert!(!latch.poll(LineLevel::High));
        assert!(latch.poll(LineLevel::Low));
    }

    #[test]
    fn test_continuous_presence_emits_single_event() {
        let (mut monitor, entry, _exit, mut entry_rx, _exit_rx) = monitor_with_rig(5);

        entry.set_active(true);
        for _ in 0..20 {
            monitor.poll_once();
        }
        entry.set_active(false);
        monitor.poll_once();

        assert_eq!(entry_rx.try_recv().ok(), Some(SensorEvent::Entry));
        assert!(entry_rx.try_recv().is_err());
    }

    #[test]
    fn test_reassertion_emits_one_more_event() {
        let (mut monitor, entry, _exit, mut entry_rx, _exit_rx) = monitor_with_rig(5);

        for _ in 0..3 {
            entry.set_active(true);
            monitor.poll_once();
            entry.set_active(false);
            monitor.poll_once();
        }

        let mut events = 0;
        while entry_rx.try_recv().is_ok() {
            events += 1;
        }
        assert_eq!(events, 3);
    }

    #[test]
    fn test_full_channel_drops_newest_event() {
        let (mut monitor, entry, _exit, mut entry_rx, _exit_rx) = monitor_with_rig(1);

        // Two passes against a depth-1 queue no one is draining
        for _ in 0..2 {
            entry.set_active(true);
            monitor.poll_once();
            entry.set_active(false);
            monitor.poll_once();
        }

        assert_eq!(entry_rx.try_recv().ok(), Some(SensorEvent::Entry));
        assert!(entry_rx.try_recv().is_err());
    }

    #[test]
    fn test_lines_are_independent() {
        let (mut monitor, entry, exit, mut entry_rx, mut exit_rx) = monitor_with_rig(5);

        entry.set_active(true);
        exit.set_active(true);
        monitor.poll_once();

        assert_eq!(entry_rx.try_recv().ok(), Some(SensorEvent::Entry));
        assert_eq!(exit_rx.try_recv().ok(), Some(SensorEvent::Exit));
    }
}
