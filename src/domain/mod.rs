//! Domain models - core types shared across the controller
//!
//! This module contains the canonical data types used throughout the system:
//! - `Capacity` - free/total slot bookkeeping
//! - `GateStatus` - observable barrier state
//! - `SensorEvent` - debounced entry/exit presence events
//! - `EnvironmentReading` - last-known-good climate sample
//! - `StatusSnapshot` - the read-only view served to all presentation channels

pub mod types;

pub use types::{
    Capacity, EnvironmentReading, GateStatus, OverrideMessage, SensorEvent, StatusSnapshot,
    WallClock,
};
