//! Services - the real-time lane workers
//!
//! This module contains the hardware-facing control loops:
//! - `sensors` - presence sensor polling and debouncing
//! - `gate` - barrier actuation and capacity bookkeeping
//! - `indicators` - available/full indicator lines
//! - `environment` - temperature/humidity sampling

pub mod environment;
pub mod gate;
pub mod indicators;
pub mod sensors;

pub use environment::EnvironmentMonitor;
pub use gate::GateController;
pub use indicators::IndicatorController;
pub use sensors::SensorMonitor;
