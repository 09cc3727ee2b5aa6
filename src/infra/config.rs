//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. Default: config/default.toml (falls back to built-in defaults)

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Human-readable lot name, shown on the dashboard and bot replies
    #[serde(default = "default_site_name")]
    pub name: String,
}

fn default_site_name() -> String {
    "carpark".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self { name: default_site_name() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParkingConfig {
    #[serde(default = "default_total_slots")]
    pub total_slots: u32,
    /// Time the barrier stays fully open for vehicle passage (ms)
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
    /// Per-channel recv timeout in the gate controller pass (ms)
    #[serde(default = "default_gate_poll_ms")]
    pub gate_poll_ms: u64,
    /// Entry/exit event queue depth
    #[serde(default = "default_event_queue_depth")]
    pub event_queue_depth: usize,
}

fn default_total_slots() -> u32 {
    4
}

fn default_dwell_ms() -> u64 {
    2000
}

fn default_gate_poll_ms() -> u64 {
    10
}

fn default_event_queue_depth() -> usize {
    5
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            total_slots: default_total_slots(),
            dwell_ms: default_dwell_ms(),
            gate_poll_ms: default_gate_poll_ms(),
            event_queue_depth: default_event_queue_depth(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorsConfig {
    #[serde(default = "default_sensor_poll_ms")]
    pub poll_interval_ms: u64,
}

fn default_sensor_poll_ms() -> u64 {
    50
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self { poll_interval_ms: default_sensor_poll_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BarrierConfig {
    /// Servo angle for the fully open position (degrees)
    #[serde(default = "default_open_angle")]
    pub open_angle: u8,
    /// Servo angle for the fully closed position (degrees)
    #[serde(default = "default_closed_angle")]
    pub closed_angle: u8,
}

fn default_open_angle() -> u8 {
    0
}

fn default_closed_angle() -> u8 {
    90
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self { open_angle: default_open_angle(), closed_angle: default_closed_angle() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorsConfig {
    #[serde(default = "default_indicator_poll_ms")]
    pub poll_interval_ms: u64,
}

fn default_indicator_poll_ms() -> u64 {
    100
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self { poll_interval_ms: default_indicator_poll_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClimateConfig {
    /// Sample interval (ms); the physical sensor cannot be read faster
    /// than every 2 seconds
    #[serde(default = "default_climate_sample_ms")]
    pub sample_interval_ms: u64,
}

fn default_climate_sample_ms() -> u64 {
    2000
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self { sample_interval_ms: default_climate_sample_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Character columns per line
    #[serde(default = "default_display_width")]
    pub width: usize,
    /// Worker tick (ms)
    #[serde(default = "default_display_update_ms")]
    pub update_ms: u64,
    /// Dwell per default view page (ms)
    #[serde(default = "default_display_cycle_ms")]
    pub cycle_ms: u64,
    /// How long an override message stays up before the default view resumes (ms)
    #[serde(default = "default_override_hold_ms")]
    pub override_hold_ms: u64,
}

fn default_display_width() -> usize {
    16
}

fn default_display_update_ms() -> u64 {
    500
}

fn default_display_cycle_ms() -> u64 {
    2000
}

fn default_override_hold_ms() -> u64 {
    3000
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_display_width(),
            update_ms: default_display_update_ms(),
            cycle_ms: default_display_cycle_ms(),
            override_hold_ms: default_override_hold_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_http_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind_address: default_http_bind_address(), port: default_http_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot API token; the poller is disabled when empty
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_bot_api_base")]
    pub api_base: String,
    #[serde(default = "default_bot_poll_ms")]
    pub poll_interval_ms: u64,
}

fn default_bot_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_bot_poll_ms() -> u64 {
    1000
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_bot_api_base(),
            poll_interval_ms: default_bot_poll_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    /// HTTP 204 endpoint used as the connectivity probe
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    /// Fallback time API, used when the system clock is implausible
    #[serde(default = "default_time_api_url")]
    pub time_api_url: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_clock_update_secs")]
    pub update_interval_secs: u64,
    #[serde(default = "default_connectivity_secs")]
    pub connectivity_interval_secs: u64,
}

fn default_probe_url() -> String {
    "http://clients3.google.com/generate_204".to_string()
}

fn default_time_api_url() -> String {
    "https://timeapi.io/api/Time/current/zone".to_string()
}

fn default_timezone() -> String {
    "Africa/Cairo".to_string()
}

fn default_clock_update_secs() -> u64 {
    5
}

fn default_connectivity_secs() -> u64 {
    10
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            probe_url: default_probe_url(),
            time_api_url: default_time_api_url(),
            timezone: default_timezone(),
            update_interval_secs: default_clock_update_secs(),
            connectivity_interval_secs: default_connectivity_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub parking: ParkingConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
    #[serde(default)]
    pub barrier: BarrierConfig,
    #[serde(default)]
    pub indicators: IndicatorsConfig,
    #[serde(default)]
    pub climate: ClimateConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub clock: ClockConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_name: String,
    total_slots: u32,
    dwell_ms: u64,
    gate_poll_ms: u64,
    event_queue_depth: usize,
    sensor_poll_interval_ms: u64,
    barrier_open_angle: u8,
    barrier_closed_angle: u8,
    indicator_poll_interval_ms: u64,
    climate_sample_interval_ms: u64,
    display_width: usize,
    display_update_ms: u64,
    display_cycle_ms: u64,
    display_override_hold_ms: u64,
    http_bind_address: String,
    http_port: u16,
    bot_token: String,
    bot_api_base: String,
    bot_poll_interval_ms: u64,
    probe_url: String,
    time_api_url: String,
    timezone: String,
    clock_update_interval_secs: u64,
    connectivity_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, source: &str) -> Self {
        Self {
            site_name: toml_config.site.name,
            total_slots: toml_config.parking.total_slots,
            dwell_ms: toml_config.parking.dwell_ms,
            gate_poll_ms: toml_config.parking.gate_poll_ms,
            event_queue_depth: toml_config.parking.event_queue_depth,
            sensor_poll_interval_ms: toml_config.sensors.poll_interval_ms,
            barrier_open_angle: toml_config.barrier.open_angle,
            barrier_closed_angle: toml_config.barrier.closed_angle,
            indicator_poll_interval_ms: toml_config.indicators.poll_interval_ms,
            climate_sample_interval_ms: toml_config.climate.sample_interval_ms,
            display_width: toml_config.display.width,
            display_update_ms: toml_config.display.update_ms,
            display_cycle_ms: toml_config.display.cycle_ms,
            display_override_hold_ms: toml_config.display.override_hold_ms,
            http_bind_address: toml_config.http.bind_address,
            http_port: toml_config.http.port,
            bot_token: toml_config.bot.token,
            bot_api_base: toml_config.bot.api_base,
            bot_poll_interval_ms: toml_config.bot.poll_interval_ms,
            probe_url: toml_config.clock.probe_url,
            time_api_url: toml_config.clock.time_api_url,
            timezone: toml_config.clock.timezone,
            clock_update_interval_secs: toml_config.clock.update_interval_secs,
            connectivity_interval_secs: toml_config.clock.connectivity_interval_secs,
            config_file: source.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    pub fn total_slots(&self) -> u32 {
        self.total_slots
    }

    pub fn dwell_ms(&self) -> u64 {
        self.dwell_ms
    }

    pub fn gate_poll_ms(&self) -> u64 {
        self.gate_poll_ms
    }

    pub fn event_queue_depth(&self) -> usize {
        self.event_queue_depth
    }

    pub fn sensor_poll_interval_ms(&self) -> u64 {
        self.sensor_poll_interval_ms
    }

    pub fn barrier_open_angle(&self) -> u8 {
        self.barrier_open_angle
    }

    pub fn barrier_closed_angle(&self) -> u8 {
        self.barrier_closed_angle
    }

    pub fn indicator_poll_interval_ms(&self) -> u64 {
        self.indicator_poll_interval_ms
    }

    pub fn climate_sample_interval_ms(&self) -> u64 {
        self.climate_sample_interval_ms
    }

    pub fn display_width(&self) -> usize {
        self.display_width
    }

    pub fn display_update_ms(&self) -> u64 {
        self.display_update_ms
    }

    pub fn display_cycle_ms(&self) -> u64 {
        self.display_cycle_ms
    }

    pub fn display_override_hold_ms(&self) -> u64 {
        self.display_override_hold_ms
    }

    pub fn http_bind_address(&self) -> &str {
        &self.http_bind_address
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn bot_enabled(&self) -> bool {
        !self.bot_token.is_empty()
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn bot_api_base(&self) -> &str {
        &self.bot_api_base
    }

    pub fn bot_poll_interval_ms(&self) -> u64 {
        self.bot_poll_interval_ms
    }

    pub fn probe_url(&self) -> &str {
        &self.probe_url
    }

    pub fn time_api_url(&self) -> &str {
        &self.time_api_url
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn clock_update_interval_secs(&self) -> u64 {
        self.clock_update_interval_secs
    }

    pub fn connectivity_interval_secs(&self) -> u64 {
        self.connectivity_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the slot count
    #[cfg(test)]
    pub fn with_total_slots(mut self, total: u32) -> Self {
        self.total_slots = total;
        self
    }

    /// Builder method for tests to shrink the dwell
    #[cfg(test)]
    pub fn with_dwell_ms(mut self, ms: u64) -> Self {
        self.dwell_ms = ms;
        self
    }
}
