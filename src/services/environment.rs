//! Climate monitoring
//!
//! Periodic read of the temperature/humidity sensor. A sample with NaN in
//! either component is discarded and the stored last-known-good reading
//! stays untouched; the value is never blanked. Significant changes are
//! logged at info, routine samples at trace.

use crate::domain::EnvironmentReading;
use crate::infra::config::Config;
use crate::infra::state::StateStore;
use crate::io::hardware::ClimateSensor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, trace, warn};

// Log thresholds; below these a sample is routine
const TEMP_DELTA_C: f32 = 0.5;
const HUMIDITY_DELTA_PCT: f32 = 2.0;

pub struct EnvironmentMonitor {
    store: Arc<StateStore>,
    sensor: Arc<dyn ClimateSensor>,
    sample_interval: Duration,
    last_logged: Option<EnvironmentReading>,
}

impl EnvironmentMonitor {
    pub fn new(config: &Config, store: Arc<StateStore>, sensor: Arc<dyn ClimateSensor>) -> Self {
        Self {
            store,
            sensor,
            sample_interval: Duration::from_millis(config.climate_sample_interval_ms()),
            last_logged: None,
        }
    }

    /// Take one sample and store it if valid. Split out for tests.
    pub fn sample_once(&mut self) {
        let sample = self.sensor.sample();

        if !sample.is_valid() {
            warn!("climate_sample_invalid");
            return;
        }

        let reading =
            EnvironmentReading { temperature: sample.temperature, humidity: sample.humidity };
        self.store.set_environment(reading);

        let significant = match self.last_logged {
            None => true,
            Some(last) => {
                (reading.temperature - last.temperature).abs() > TEMP_DELTA_C
                    || (reading.humidity - last.humidity).abs() > HUMIDITY_DELTA_PCT
            }
        };

        if significant {
            info!(
                temperature_c = reading.temperature,
                humidity_pct = reading.humidity,
                "climate_reading"
            );
            self.last_logged = Some(reading);
        } else {
            trace!(
                temperature_c = reading.temperature,
                humidity_pct = reading.humidity,
                "climate_sample"
            );
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            sample_interval_ms = %self.sample_interval.as_millis(),
            "environment_monitor_started"
        );

        let mut sample_timer = interval(self.sample_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("environment_monitor_shutdown");
                        return;
                    }
                }
                _ = sample_timer.tick() => {}
            }

            self.sample_once();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sim::SimClimate;

    fn rig() -> (EnvironmentMonitor, Arc<StateStore>, SimClimate) {
        let store = Arc::new(StateStore::new(4));
        let climate = SimClimate::new(21.0, 45.0);
        let monitor =
            EnvironmentMonitor::new(&Config::default(), store.clone(), Arc::new(climate.clone()));
        (monitor, store, climate)
    }

    #[test]
    fn test_valid_sample_is_stored() {
        let (mut monitor, store, climate) = rig();
        climate.set_sample(22.5, 51.0);
        monitor.sample_once();

        let env = store.environment();
        assert_eq!(env.temperature, 22.5);
        assert_eq!(env.humidity, 51.0);
    }

    #[test]
    fn test_invalid_sample_retains_previous_value() {
        let (mut monitor, store, climate) = rig();
        climate.set_sample(22.5, 51.0);
        monitor.sample_once();

        climate.set_sample(f32::NAN, 60.0);
        monitor.sample_once();

        // Last-known-good survives the bad sample
        let env = store.environment();
        assert_eq!(env.temperature, 22.5);
        assert_eq!(env.humidity, 51.0);
    }

    #[test]
    fn test_invalid_then_valid_lands_on_the_valid_one() {
        let (mut monitor, store, climate) = rig();

        climate.set_sample(f32::NAN, f32::NAN);
        monitor.sample_once();
        assert_eq!(store.environment(), EnvironmentReading::default());

        climate.set_sample(22.5, 51.0);
        monitor.sample_once();
        let env = store.environment();
        assert_eq!(env.temperature, 22.5);
        assert_eq!(env.humidity, 51.0);
    }
}
