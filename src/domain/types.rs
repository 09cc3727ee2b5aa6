//! Shared types for the parking controller

use serde::{Deserialize, Serialize};

/// Barrier gate state as observed by the presentation channels.
///
/// Only the gate controller writes this. The Opening/HoldOpen/Closing
/// phases of an actuation are implicit in the controller's sequence and
/// never observable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateStatus {
    Closed,
    Open,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Closed => "Closed",
            GateStatus::Open => "Open",
        }
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A debounced presence event. Carries no payload; one event is one
/// physical vehicle pass over a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorEvent {
    Entry,
    Exit,
}

impl SensorEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorEvent::Entry => "entry",
            SensorEvent::Exit => "exit",
        }
    }
}

/// Slot bookkeeping. Invariant: `available <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub available: u32,
    pub total: u32,
}

impl Capacity {
    /// A lot starts empty: every slot available.
    pub fn full_lot(total: u32) -> Self {
        Self { available: total, total }
    }

    pub fn occupied(&self) -> u32 {
        self.total - self.available
    }

    pub fn is_full(&self) -> bool {
        self.available == 0
    }
}

/// Last-known-good climate reading. Never holds NaN; invalid samples are
/// rejected before they reach the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    pub temperature: f32,
    pub humidity: f32,
}

impl Default for EnvironmentReading {
    fn default() -> Self {
        Self { temperature: 0.0, humidity: 0.0 }
    }
}

/// Formatted wall-clock strings as shown on the display and dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallClock {
    /// "HH:MM:SS"
    pub time: String,
    /// "YYYY/MM/DD"
    pub date: String,
}

impl Default for WallClock {
    fn default() -> Self {
        Self { time: "00:00:00".to_string(), date: "2024/01/01".to_string() }
    }
}

/// A transient two-line message for the local display.
/// Most recent write wins; consumed exactly once by the display worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverrideMessage {
    pub line1: String,
    #[serde(default)]
    pub line2: String,
}

/// Read-only snapshot served by `/data` and formatted into bot replies.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub available: u32,
    pub occupied: u32,
    pub gate: GateStatus,
    pub temperature: f32,
    pub humidity: f32,
    pub time: String,
    pub date: String,
    pub wifi: bool,
    pub internet: bool,
    /// Seconds since process start
    pub uptime: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_status_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&GateStatus::Open).unwrap(), "\"Open\"");
        assert_eq!(serde_json::to_string(&GateStatus::Closed).unwrap(), "\"Closed\"");
    }

    #[test]
    fn test_capacity_full_lot() {
        let cap = Capacity::full_lot(4);
        assert_eq!(cap.available, 4);
        assert_eq!(cap.total, 4);
        assert_eq!(cap.occupied(), 0);
        assert!(!cap.is_full());
    }

    #[test]
    fn test_capacity_occupied() {
        let cap = Capacity { available: 1, total: 4 };
        assert_eq!(cap.occupied(), 3);
        let full = Capacity { available: 0, total: 4 };
        assert!(full.is_full());
        assert_eq!(full.occupied(), 4);
    }

    #[test]
    fn test_override_message_deserialize_defaults_line2() {
        let msg: OverrideMessage = serde_json::from_str(r#"{"line1":"Hello"}"#).unwrap();
        assert_eq!(msg.line1, "Hello");
        assert_eq!(msg.line2, "");
    }
}
