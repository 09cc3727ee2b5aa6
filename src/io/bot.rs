//! Chat-bot command interface
//!
//! Polls a Telegram-style bot API for commands and answers each one with
//! a reply formatted from the same shared-state snapshot the dashboard
//! serves. Strictly read-only. The transport sits behind `ChatApi` so the
//! poller and the command formatting are testable without a network.

use crate::domain::StatusSnapshot;
use crate::infra::config::Config;
use crate::infra::state::StateStore;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, warn};

/// One incoming chat message, already unwrapped from the wire format.
#[derive(Debug, Clone)]
pub struct ChatUpdate {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: String,
}

/// Bot API transport.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch updates with id >= offset.
    async fn fetch_updates(&self, offset: i64) -> anyhow::Result<Vec<ChatUpdate>>;
    async fn send_reply(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}

// Telegram wire format, the parts we read
#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<WireUpdate>,
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    update_id: i64,
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    chat: WireChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: i64,
}

/// Telegram Bot API client.
pub struct TelegramApi {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramApi {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: format!("{}/bot{}", config.bot_api_base(), config.bot_token()),
        }
    }
}

#[async_trait]
impl ChatApi for TelegramApi {
    async fn fetch_updates(&self, offset: i64) -> anyhow::Result<Vec<ChatUpdate>> {
        let url = format!("{}/getUpdates?offset={}", self.base_url, offset);
        let response: UpdatesResponse =
            self.client.get(&url).send().await?.error_for_status()?.json().await?;

        if !response.ok {
            anyhow::bail!("bot API returned ok=false");
        }

        Ok(response
            .result
            .into_iter()
            .filter_map(|u| {
                let message = u.message?;
                Some(ChatUpdate {
                    update_id: u.update_id,
                    chat_id: message.chat.id,
                    text: message.text?,
                })
            })
            .collect())
    }

    async fn send_reply(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        self.client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

fn format_start() -> String {
    "*Parking System*\n\n\
     Available Commands:\n\
     /status - Parking status\n\
     /time - Date & Time\n\
     /temp - Temperature\n\
     /all - Complete info"
        .to_string()
}

fn format_status(snapshot: &StatusSnapshot) -> String {
    let marker = if snapshot.available == 0 { "FULL" } else { "spaces free" };
    format!(
        "*Parking Status*\n\nAvailable: {}/{} ({})",
        snapshot.available,
        snapshot.available + snapshot.occupied,
        marker
    )
}

fn format_time(snapshot: &StatusSnapshot) -> String {
    format!("*Date & Time*\n\n{}\n{}", snapshot.date, snapshot.time)
}

fn format_temp(snapshot: &StatusSnapshot) -> String {
    format!(
        "*Environment*\n\nTemperature: {:.1} C\nHumidity: {:.1} %",
        snapshot.temperature, snapshot.humidity
    )
}

fn format_all(snapshot: &StatusSnapshot) -> String {
    format!(
        "*Complete Status*\n\n{} {}\n\nParking: {}/{}\nTemp: {:.1} C\nHumidity: {:.1} %",
        snapshot.date,
        snapshot.time,
        snapshot.available,
        snapshot.available + snapshot.occupied,
        snapshot.temperature,
        snapshot.humidity
    )
}

/// Map a command to its reply text, or None for anything unrecognized.
pub(crate) fn reply_for(command: &str, snapshot: &StatusSnapshot) -> Option<String> {
    match command.trim() {
        "/start" => Some(format_start()),
        "/status" => Some(format_status(snapshot)),
        "/time" => Some(format_time(snapshot)),
        "/temp" => Some(format_temp(snapshot)),
        "/all" => Some(format_all(snapshot)),
        _ => None,
    }
}

pub struct BotPoller {
    api: Arc<dyn ChatApi>,
    store: Arc<StateStore>,
    poll_interval: Duration,
    last_update_id: i64,
}

impl BotPoller {
    pub fn new(config: &Config, api: Arc<dyn ChatApi>, store: Arc<StateStore>) -> Self {
        Self {
            api,
            store,
            poll_interval: Duration::from_millis(config.bot_poll_interval_ms()),
            last_update_id: 0,
        }
    }

    /// Fetch pending commands and answer each one. Transport failures are
    /// logged and retried on the next poll.
    pub async fn poll_once(&mut self) {
        let updates = match self.api.fetch_updates(self.last_update_id + 1).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "bot_fetch_updates_failed");
                return;
            }
        };

        for update in updates {
            self.last_update_id = self.last_update_id.max(update.update_id);

            let Some(reply) = reply_for(&update.text, &self.store.snapshot()) else {
                continue;
            };

            info!(chat_id = update.chat_id, command = %update.text.trim(), "bot_command");

            if let Err(e) = self.api.send_reply(update.chat_id, &reply).await {
                warn!(chat_id = update.chat_id, error = %e, "bot_reply_failed");
            }
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_ms = %self.poll_interval.as_millis(),
            "bot_poller_started"
        );

        let mut poll_timer = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("bot_poller_shutdown");
                        return;
                    }
                }
                _ = poll_timer.tick() => {}
            }

            self.poll_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GateStatus;
    use parking_lot::Mutex;

    fn snapshot(available: u32, total: u32) -> StatusSnapshot {
        StatusSnapshot {
            available,
            occupied: total - available,
            gate: GateStatus::Closed,
            temperature: 22.5,
            humidity: 51.0,
            time: "12:30:00".to_string(),
            date: "2025/06/01".to_string(),
            wifi: true,
            internet: true,
            uptime: 90,
        }
    }

    #[test]
    fn test_status_reply_shows_availability_and_marker() {
        let text = reply_for("/status", &snapshot(3, 4)).unwrap();
        assert!(text.contains("Available: 3/4"));
        assert!(text.contains("spaces free"));

        let text = reply_for("/status", &snapshot(0, 4)).unwrap();
        assert!(text.contains("Available: 0/4"));
        assert!(text.contains("FULL"));
    }

    #[test]
    fn test_temp_reply_formats_one_decimal() {
        let text = reply_for("/temp", &snapshot(3, 4)).unwrap();
        assert!(text.contains("Temperature: 22.5 C"));
        assert!(text.contains("Humidity: 51.0 %"));
    }

    #[test]
    fn test_all_reply_concatenates_sections() {
        let text = reply_for("/all", &snapshot(3, 4)).unwrap();
        assert!(text.contains("2025/06/01 12:30:00"));
        assert!(text.contains("Parking: 3/4"));
        assert!(text.contains("Temp: 22.5 C"));
    }

    #[test]
    fn test_unknown_command_gets_no_reply() {
        assert!(reply_for("/help", &snapshot(3, 4)).is_none());
        assert!(reply_for("hello", &snapshot(3, 4)).is_none());
    }

    struct MockApi {
        updates: Mutex<Vec<ChatUpdate>>,
        replies: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ChatApi for MockApi {
        async fn fetch_updates(&self, offset: i64) -> anyhow::Result<Vec<ChatUpdate>> {
            Ok(self
                .updates
                .lock()
                .iter()
                .filter(|u| u.update_id >= offset)
                .cloned()
                .collect())
        }

        async fn send_reply(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
            self.replies.lock().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_poller_replies_once_per_command() {
        let api = Arc::new(MockApi {
            updates: Mutex::new(vec![
                ChatUpdate { update_id: 10, chat_id: 7, text: "/status".to_string() },
                ChatUpdate { update_id: 11, chat_id: 7, text: "not a command".to_string() },
            ]),
            replies: Mutex::new(Vec::new()),
        });
        let store = Arc::new(StateStore::new(4));
        let mut poller = BotPoller::new(&Config::default(), api.clone(), store);

        poller.poll_once().await;
        // Offset advanced past both updates; second poll sees nothing new
        poller.poll_once().await;

        let replies = api.replies.lock();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].0, 7);
        assert!(replies[0].1.contains("Available: 4/4"));
    }
}
