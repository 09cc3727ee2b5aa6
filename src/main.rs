//! carpark - real-time parking lot controller
//!
//! Tracks free capacity, automates the entry/exit barrier from two
//! presence sensors, and exposes lot state to a web dashboard, a chat
//! bot, and a local 2-line display.
//!
//! Module structure:
//! - `domain/` - Core types (Capacity, GateStatus, SensorEvent, snapshots)
//! - `io/` - External interfaces (hardware seam, HTTP, bot, display, clock)
//! - `services/` - Real-time control loops (sensors, gate, indicators, climate)
//! - `infra/` - Infrastructure (Config, StateStore, scheduling lanes)

use carpark::infra::{Config, Lane, Priority, StateStore, WorkerSet};
use carpark::io::{
    start_dashboard_server, BotPoller, DisplayWorker, SimRig, TelegramApi, Timekeeper,
};
use carpark::services::{EnvironmentMonitor, GateController, IndicatorController, SensorMonitor};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// carpark - automated parking lot controller
#[derive(Parser, Debug)]
#[command(name = "carpark", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = env!("GIT_HASH"), "carpark starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        site = %config.site_name(),
        total_slots = %config.total_slots(),
        dwell_ms = %config.dwell_ms(),
        sensor_poll_ms = %config.sensor_poll_interval_ms(),
        http_port = %config.http_port(),
        bot_enabled = %config.bot_enabled(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Shared state and the hardware rig. The sim rig stands in for GPIO;
    // a hardware deployment provides its own implementations of the
    // traits in io::hardware.
    let store = Arc::new(StateStore::new(config.total_slots()));
    let rig = SimRig::new(config.barrier_open_angle(), config.barrier_closed_angle());
    info!(hardware = "sim", "hardware_rig_ready");

    // Entry/exit event channels (bounded; senders drop on overflow)
    let (entry_tx, entry_rx) = mpsc::channel(config.event_queue_depth());
    let (exit_tx, exit_rx) = mpsc::channel(config.event_queue_depth());

    let workers = WorkerSet::new(2)?;

    // Real-time lane
    let sensors = SensorMonitor::new(
        &config,
        Box::new(rig.entry_sensor.clone()),
        Box::new(rig.exit_sensor.clone()),
        entry_tx,
        exit_tx,
    );
    workers.spawn(Lane::RealTime, Priority::High, "sensor-monitor", {
        let shutdown = shutdown_rx.clone();
        async move { sensors.run(shutdown).await }
    })?;

    let gate = GateController::new(
        &config,
        store.clone(),
        Arc::new(rig.barrier.clone()),
        entry_rx,
        exit_rx,
    );
    workers.spawn(Lane::RealTime, Priority::Normal, "gate-controller", {
        let shutdown = shutdown_rx.clone();
        async move { gate.run(shutdown).await }
    })?;

    let indicators = IndicatorController::new(
        &config,
        store.clone(),
        Arc::new(rig.available_led.clone()),
        Arc::new(rig.full_led.clone()),
    );
    workers.spawn(Lane::RealTime, Priority::Low, "indicator-controller", {
        let shutdown = shutdown_rx.clone();
        async move { indicators.run(shutdown).await }
    })?;

    let environment = EnvironmentMonitor::new(&config, store.clone(), Arc::new(rig.climate.clone()));
    workers.spawn(Lane::RealTime, Priority::Low, "environment-monitor", {
        let shutdown = shutdown_rx.clone();
        async move { environment.run(shutdown).await }
    })?;

    // Best-effort lane
    let display = DisplayWorker::new(&config, store.clone(), Arc::new(rig.display.clone()));
    workers.spawn(Lane::BestEffort, Priority::Low, "display-worker", {
        let shutdown = shutdown_rx.clone();
        async move { display.run(shutdown).await }
    })?;

    workers.spawn(Lane::BestEffort, Priority::Low, "dashboard-server", {
        let bind_address = config.http_bind_address().to_string();
        let port = config.http_port();
        let store = store.clone();
        let shutdown = shutdown_rx.clone();
        async move {
            if let Err(e) = start_dashboard_server(&bind_address, port, store, shutdown).await {
                tracing::error!(error = %e, "dashboard_server_error");
            }
        }
    })?;

    if config.bot_enabled() {
        let bot = BotPoller::new(&config, Arc::new(TelegramApi::new(&config)), store.clone());
        workers.spawn(Lane::BestEffort, Priority::Low, "bot-poller", {
            let shutdown = shutdown_rx.clone();
            async move { bot.run(shutdown).await }
        })?;
    }

    let timekeeper = Timekeeper::new(&config, store.clone());
    workers.spawn(Lane::BestEffort, Priority::Low, "timekeeper", {
        let shutdown = shutdown_rx.clone();
        async move { timekeeper.run(shutdown).await }
    })?;

    info!("all_workers_started");

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Park until the shutdown signal fires
    let mut shutdown = shutdown_rx;
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }

    // Give workers a moment to observe the signal, then drop the
    // real-time lane without blocking the async context
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    workers.shutdown();

    info!("carpark shutdown complete");
    Ok(())
}
