//! Simulated bench rig
//!
//! In-memory implementations of the hardware traits, used on development
//! hosts and in tests. Every component is cheaply cloneable (shared
//! interior), so a test can keep a handle to drive a sensor line or
//! inspect the barrier while the worker owns the same instance.

use crate::io::hardware::{
    Barrier, BarrierPosition, ClimateSample, ClimateSensor, InputLine, LineLevel, OutputLine,
    TextDisplay,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Simulated active-low presence sensor.
#[derive(Clone)]
pub struct SimInput {
    name: &'static str,
    active: Arc<AtomicBool>,
}

impl SimInput {
    pub fn new(name: &'static str) -> Self {
        Self { name, active: Arc::new(AtomicBool::new(false)) }
    }

    /// Drive the line: `true` puts a vehicle over the sensor.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
        debug!(line = self.name, active, "sim_input_driven");
    }
}

impl InputLine for SimInput {
    fn read(&self) -> LineLevel {
        if self.active.load(Ordering::Relaxed) {
            LineLevel::Low
        } else {
            LineLevel::High
        }
    }
}

/// Simulated indicator line.
#[derive(Clone)]
pub struct SimOutput {
    name: &'static str,
    on: Arc<AtomicBool>,
}

impl SimOutput {
    pub fn new(name: &'static str) -> Self {
        Self { name, on: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }
}

impl OutputLine for SimOutput {
    fn set(&self, on: bool) {
        let was = self.on.swap(on, Ordering::Relaxed);
        if was != on {
            debug!(line = self.name, on, "sim_output_changed");
        }
    }
}

/// Simulated barrier servo. Records every commanded transition so tests
/// can assert actuation sequences never interleave.
#[derive(Clone)]
pub struct SimBarrier {
    open_angle: u8,
    closed_angle: u8,
    position: Arc<Mutex<BarrierPosition>>,
    transitions: Arc<Mutex<Vec<BarrierPosition>>>,
}

impl SimBarrier {
    pub fn new(open_angle: u8, closed_angle: u8) -> Self {
        Self {
            open_angle,
            closed_angle,
            position: Arc::new(Mutex::new(BarrierPosition::Closed)),
            transitions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn position(&self) -> BarrierPosition {
        *self.position.lock()
    }

    pub fn transitions(&self) -> Vec<BarrierPosition> {
        self.transitions.lock().clone()
    }
}

impl Barrier for SimBarrier {
    fn move_to(&self, position: BarrierPosition) {
        let angle = match position {
            BarrierPosition::Open => self.open_angle,
            BarrierPosition::Closed => self.closed_angle,
        };
        *self.position.lock() = position;
        self.transitions.lock().push(position);
        info!(position = position.as_str(), angle, "sim_barrier_moved");
    }
}

/// Simulated 2-line character display.
#[derive(Clone, Default)]
pub struct SimDisplay {
    lines: Arc<Mutex<[String; 2]>>,
}

impl SimDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> [String; 2] {
        self.lines.lock().clone()
    }
}

impl TextDisplay for SimDisplay {
    fn show(&self, line1: &str, line2: &str) {
        let mut lines = self.lines.lock();
        lines[0] = line1.to_string();
        lines[1] = line2.to_string();
        debug!(line1, line2, "sim_display_shown");
    }
}

/// Simulated climate sensor. Sample values are stored as f32 bit patterns
/// in atomics so tests can inject readings, including NaN.
#[derive(Clone)]
pub struct SimClimate {
    temperature: Arc<AtomicU32>,
    humidity: Arc<AtomicU32>,
}

impl SimClimate {
    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature: Arc::new(AtomicU32::new(temperature.to_bits())),
            humidity: Arc::new(AtomicU32::new(humidity.to_bits())),
        }
    }

    pub fn set_sample(&self, temperature: f32, humidity: f32) {
        self.temperature.store(temperature.to_bits(), Ordering::Relaxed);
        self.humidity.store(humidity.to_bits(), Ordering::Relaxed);
    }
}

impl ClimateSensor for SimClimate {
    fn sample(&self) -> ClimateSample {
        ClimateSample {
            temperature: f32::from_bits(self.temperature.load(Ordering::Relaxed)),
            humidity: f32::from_bits(self.humidity.load(Ordering::Relaxed)),
        }
    }
}

/// The whole bench in one place, wired from config.
pub struct SimRig {
    pub entry_sensor: SimInput,
    pub exit_sensor: SimInput,
    pub barrier: SimBarrier,
    pub available_led: SimOutput,
    pub full_led: SimOutput,
    pub display: SimDisplay,
    pub climate: SimClimate,
}

impl SimRig {
    pub fn new(open_angle: u8, closed_angle: u8) -> Self {
        Self {
            entry_sensor: SimInput::new("ir-entry"),
            exit_sensor: SimInput::new("ir-exit"),
            barrier: SimBarrier::new(open_angle, closed_angle),
            available_led: SimOutput::new("led-available"),
            full_led: SimOutput::new("led-full"),
            display: SimDisplay::new(),
            climate: SimClimate::new(21.0, 45.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_input_is_active_low() {
        let line = SimInput::new("test");
        assert_eq!(line.read(), LineLevel::High);
        line.set_active(true);
        assert_eq!(line.read(), LineLevel::Low);
        line.set_active(false);
        assert_eq!(line.read(), LineLevel::High);
    }

    #[test]
    fn test_sim_barrier_records_transitions() {
        let barrier = SimBarrier::new(0, 90);
        assert_eq!(barrier.position(), BarrierPosition::Closed);
        barrier.move_to(BarrierPosition::Open);
        barrier.move_to(BarrierPosition::Closed);
        assert_eq!(barrier.position(), BarrierPosition::Closed);
        assert_eq!(
            barrier.transitions(),
            vec![BarrierPosition::Open, BarrierPosition::Closed]
        );
    }

    #[test]
    fn test_sim_climate_carries_nan_through() {
        let climate = SimClimate::new(21.0, 45.0);
        climate.set_sample(f32::NAN, 50.0);
        let sample = climate.sample();
        assert!(sample.temperature.is_nan());
        assert_eq!(sample.humidity, 50.0);
    }

    #[test]
    fn test_sim_display_holds_last_shown() {
        let display = SimDisplay::new();
        display.show("Gate: Open", "Entering...");
        assert_eq!(display.lines(), ["Gate: Open".to_string(), "Entering...".to_string()]);
    }
}
