//! Wall clock and connectivity monitoring
//!
//! Refreshes the stored wall-clock strings from the system clock, falling
//! back to an HTTP time API when the system clock is implausible (the
//! unsynced-RTC case on an embedded board). If both sources fail, the
//! stored value is simply retained. Separately probes an HTTP 204
//! endpoint to maintain the wifi/internet flags.
//!
//! Clock writes go through the bounded-timeout lock policy; a timed-out
//! write skips the cycle.

use crate::domain::WallClock;
use crate::infra::config::Config;
use crate::infra::state::StateStore;
use chrono::{Datelike, Local};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, warn};

/// Years before this are treated as an unsynchronized clock.
const PLAUSIBLE_YEAR: i32 = 2020;

/// Wire format of the fallback time API
#[derive(Debug, Deserialize)]
struct TimeApiResponse {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    seconds: u32,
}

fn clock_from_api(response: &TimeApiResponse) -> WallClock {
    WallClock {
        time: format!("{:02}:{:02}:{:02}", response.hour, response.minute, response.seconds),
        date: format!("{:04}/{:02}/{:02}", response.year, response.month, response.day),
    }
}

pub struct Timekeeper {
    store: Arc<StateStore>,
    client: reqwest::Client,
    probe_url: String,
    time_api_url: String,
    timezone: String,
    clock_interval: Duration,
    connectivity_interval: Duration,
}

impl Timekeeper {
    pub fn new(config: &Config, store: Arc<StateStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_default();
        Self {
            store,
            client,
            probe_url: config.probe_url().to_string(),
            time_api_url: config.time_api_url().to_string(),
            timezone: config.timezone().to_string(),
            clock_interval: Duration::from_secs(config.clock_update_interval_secs()),
            connectivity_interval: Duration::from_secs(config.connectivity_interval_secs()),
        }
    }

    fn local_clock(&self) -> Option<WallClock> {
        let now = Local::now();
        if now.year() < PLAUSIBLE_YEAR {
            return None;
        }
        Some(WallClock {
            time: now.format("%H:%M:%S").to_string(),
            date: now.format("%Y/%m/%d").to_string(),
        })
    }

    async fn api_clock(&self) -> anyhow::Result<WallClock> {
        let url = format!("{}?timeZone={}", self.time_api_url, self.timezone);
        let response: TimeApiResponse = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(clock_from_api(&response))
    }

    async fn refresh_clock(&self) {
        let clock = match self.local_clock() {
            Some(clock) => clock,
            None => match self.api_clock().await {
                Ok(clock) => clock,
                Err(e) => {
                    // Both sources down; the stored value stays as-is
                    warn!(error = %e, "time_sources_unavailable");
                    return;
                }
            },
        };

        self.store.set_clock(clock);
    }

    async fn refresh_connectivity(&self) {
        let (wifi, internet) = match self.client.get(&self.probe_url).send().await {
            Ok(response) => (true, response.status() == reqwest::StatusCode::NO_CONTENT),
            Err(_) => (false, false),
        };

        if wifi != self.store.wifi() || internet != self.store.internet() {
            info!(wifi, internet, "connectivity_changed");
        }
        self.store.set_wifi(wifi);
        self.store.set_internet(internet);
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            clock_interval_secs = %self.clock_interval.as_secs(),
            connectivity_interval_secs = %self.connectivity_interval.as_secs(),
            "timekeeper_started"
        );

        let mut clock_timer = interval(self.clock_interval);
        let mut connectivity_timer = interval(self.connectivity_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("timekeeper_shutdown");
                        return;
                    }
                }
                _ = clock_timer.tick() => {
                    self.refresh_clock().await;
                }
                _ = connectivity_timer.tick() => {
                    self.refresh_connectivity().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_from_api_zero_pads() {
        let response =
            TimeApiResponse { year: 2025, month: 6, day: 1, hour: 9, minute: 5, seconds: 7 };
        let clock = clock_from_api(&response);
        assert_eq!(clock.time, "09:05:07");
        assert_eq!(clock.date, "2025/06/01");
    }

    #[test]
    fn test_time_api_wire_parse() {
        let json = r#"{"year":2025,"month":12,"day":31,"hour":23,"minute":59,"seconds":58,
                       "milliSeconds":123,"dateTime":"ignored","timeZone":"ignored"}"#;
        let response: TimeApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.hour, 23);
        assert_eq!(clock_from_api(&response).date, "2025/12/31");
    }

    #[test]
    fn test_local_clock_is_plausible_on_a_host() {
        let store = Arc::new(StateStore::new(4));
        let keeper = Timekeeper::new(&Config::default(), store);
        let clock = keeper.local_clock().unwrap();
        assert_eq!(clock.time.len(), 8);
        assert_eq!(&clock.time[2..3], ":");
        assert_eq!(clock.date.len(), 10);
        assert_eq!(&clock.date[4..5], "/");
    }
}
