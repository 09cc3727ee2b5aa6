//! Capacity indicator lines
//!
//! Stateless poller: the two indicator outputs are a pure function of the
//! latest sampled capacity, re-evaluated every cycle. No debouncing, no
//! edge detection.

use crate::infra::config::Config;
use crate::infra::state::StateStore;
use crate::io::hardware::OutputLine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::info;

pub struct IndicatorController {
    store: Arc<StateStore>,
    available_line: Arc<dyn OutputLine>,
    full_line: Arc<dyn OutputLine>,
    poll_interval: Duration,
}

impl IndicatorController {
    pub fn new(
        config: &Config,
        store: Arc<StateStore>,
        available_line: Arc<dyn OutputLine>,
        full_line: Arc<dyn OutputLine>,
    ) -> Self {
        Self {
            store,
            available_line,
            full_line,
            poll_interval: Duration::from_millis(config.indicator_poll_interval_ms()),
        }
    }

    /// Re-assert both lines from the current capacity.
    pub fn refresh(&self) {
        let has_space = self.store.capacity().available > 0;
        self.available_line.set(has_space);
        self.full_line.set(!has_space);
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_ms = %self.poll_interval.as_millis(),
            "indicator_controller_started"
        );

        let mut poll_timer = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("indicator_controller_shutdown");
                        return;
                    }
                }
                _ = poll_timer.tick() => {}
            }

            self.refresh();
        }
    }
}
