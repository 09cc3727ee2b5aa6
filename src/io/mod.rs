//! IO modules - hardware seam and presentation channels
//!
//! This module contains everything that touches the outside world:
//! - `hardware` - traits over the physical peripherals
//! - `sim` - simulated bench rig (dev hosts and tests)
//! - `http` - dashboard HTTP server
//! - `bot` - chat-bot command poller
//! - `display` - local 2-line display worker
//! - `timesync` - wall clock and connectivity monitoring

pub mod bot;
pub mod display;
pub mod hardware;
pub mod http;
pub mod sim;
pub mod timesync;

pub use bot::{BotPoller, ChatApi, TelegramApi};
pub use display::DisplayWorker;
pub use hardware::{
    Barrier, BarrierPosition, ClimateSample, ClimateSensor, InputLine, LineLevel, OutputLine,
    TextDisplay,
};
pub use http::start_dashboard_server;
pub use sim::SimRig;
pub use timesync::Timekeeper;
