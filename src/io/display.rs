//! Local 2-line display
//!
//! A pending override message is consumed once and held on screen for a
//! fixed window; otherwise the default view cycles time, capacity, and
//! gate status. Reads go through the snapshot; the only state this worker
//! mutates is the override it consumes. Lines are clipped to the
//! configured width.

use crate::domain::StatusSnapshot;
use crate::infra::config::Config;
use crate::infra::state::StateStore;
use crate::io::hardware::TextDisplay;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Instant};
use tracing::info;

/// Pages of the default view, in rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Time,
    Capacity,
    Gate,
}

impl Page {
    fn next(self) -> Self {
        match self {
            Page::Time => Page::Capacity,
            Page::Capacity => Page::Gate,
            Page::Gate => Page::Time,
        }
    }
}

fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn render(page: Page, snapshot: &StatusSnapshot, width: usize) -> [String; 2] {
    let (line1, line2) = match page {
        Page::Time => (snapshot.time.clone(), snapshot.date.clone()),
        Page::Capacity => {
            let line2 = if snapshot.available == 0 { "FULL".to_string() } else { "Spaces free".to_string() };
            (
                format!("Slots {}/{}", snapshot.available, snapshot.available + snapshot.occupied),
                line2,
            )
        }
        Page::Gate => (format!("Gate: {}", snapshot.gate), String::new()),
    };
    [clip(&line1, width), clip(&line2, width)]
}

pub struct DisplayWorker {
    store: Arc<StateStore>,
    display: Arc<dyn TextDisplay>,
    width: usize,
    update_interval: Duration,
    cycle: Duration,
    override_hold: Duration,
    page: Page,
    page_since: Instant,
    override_until: Option<Instant>,
}

impl DisplayWorker {
    pub fn new(config: &Config, store: Arc<StateStore>, display: Arc<dyn TextDisplay>) -> Self {
        Self {
            store,
            display,
            width: config.display_width(),
            update_interval: Duration::from_millis(config.display_update_ms()),
            cycle: Duration::from_millis(config.display_cycle_ms()),
            override_hold: Duration::from_millis(config.display_override_hold_ms()),
            page: Page::Time,
            page_since: Instant::now(),
            override_until: None,
        }
    }

    /// One display update. Split out for tests.
    pub fn tick(&mut self) {
        let now = Instant::now();

        // A fresh override preempts whatever is showing
        if let Some(message) = self.store.take_override() {
            self.display.show(&clip(&message.line1, self.width), &clip(&message.line2, self.width));
            self.override_until = Some(now + self.override_hold);
            return;
        }

        // An override already on screen holds until its window lapses
        if let Some(until) = self.override_until {
            if now < until {
                return;
            }
            self.override_until = None;
            self.page_since = now;
        }

        if now.duration_since(self.page_since) >= self.cycle {
            self.page = self.page.next();
            self.page_since = now;
        }

        let lines = render(self.page, &self.store.snapshot(), self.width);
        self.display.show(&lines[0], &lines[1]);
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            width = self.width,
            update_ms = %self.update_interval.as_millis(),
            "display_worker_started"
        );

        let mut update_timer = interval(self.update_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("display_worker_shutdown");
                        return;
                    }
                }
                _ = update_timer.tick() => {}
            }

            self.tick();
        }
    }
}
