//! StaffCast configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StaffcastError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffcastConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub dialog: DialogConfig,
    #[serde(default)]
    pub mailing: MailingConfig,
}

impl Default for StaffcastConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            scheduler: SchedulerConfig::default(),
            cache: CacheConfig::default(),
            dialog: DialogConfig::default(),
            mailing: MailingConfig::default(),
        }
    }
}

impl StaffcastConfig {
    /// Load config from the default path (~/.staffcast/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StaffcastError::Config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| StaffcastError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".staffcast")
            .join("config.toml")
    }
}

/// Messaging platform configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Long-poll timeout in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: u64,
    /// The operations chat where errors and reports land, split by topics.
    #[serde(default)]
    pub ops_chat_id: i64,
    /// Topic (thread) id for escalated delivery failures.
    #[serde(default)]
    pub error_topic_id: i64,
    /// Greeting text sent on /start.
    #[serde(default = "default_start_message")]
    pub start_message: String,
    /// Instruction text pinned after /start.
    #[serde(default = "default_pin_message")]
    pub pin_message: String,
    /// Sticker file id sent with the greeting; empty disables it.
    #[serde(default)]
    pub start_sticker_id: String,
    /// Attempts for repeated sends of operator-facing messages.
    #[serde(default = "default_send_retries")]
    pub send_retries: u32,
}

fn default_poll_timeout() -> u64 {
    30
}
fn default_start_message() -> String {
    "Hi! This is the staff workflow bot. Send /help for commands.".into()
}
fn default_pin_message() -> String {
    "Use /menu to open the admin menu.".into()
}
fn default_send_retries() -> u32 {
    3
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_timeout: default_poll_timeout(),
            ops_chat_id: 0,
            error_topic_id: 0,
            start_message: default_start_message(),
            pin_message: default_pin_message(),
            start_sticker_id: String::new(),
            send_retries: default_send_retries(),
        }
    }
}

/// Per-collaborator request scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Lane buffer size for the message scheduler.
    #[serde(default = "default_msg_buffer")]
    pub msg_buffer_size: usize,
    /// Lane buffer size for the callback-answer scheduler.
    #[serde(default = "default_callback_buffer")]
    pub callback_buffer_size: usize,
    /// Pause between executed message requests, in milliseconds.
    #[serde(default = "default_msg_pause_ms")]
    pub msg_pause_ms: u64,
    /// Pause between executed callback answers, in milliseconds.
    #[serde(default = "default_callback_pause_ms")]
    pub callback_pause_ms: u64,
    /// Upper bound on a synchronous wait for request execution, in seconds.
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,
}

fn default_msg_buffer() -> usize {
    100
}
fn default_callback_buffer() -> usize {
    100
}
fn default_msg_pause_ms() -> u64 {
    1000
}
fn default_callback_pause_ms() -> u64 {
    500
}
fn default_sync_timeout_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            msg_buffer_size: default_msg_buffer(),
            callback_buffer_size: default_callback_buffer(),
            msg_pause_ms: default_msg_pause_ms(),
            callback_pause_ms: default_callback_pause_ms(),
            sync_timeout_secs: default_sync_timeout_secs(),
        }
    }
}

/// Conversation cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for actor state and session records, in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Interval between expired-entry sweeps, in minutes.
    #[serde(default = "default_sweep_minutes")]
    pub sweep_minutes: u64,
}

fn default_ttl_hours() -> u64 {
    24
}
fn default_sweep_minutes() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            sweep_minutes: default_sweep_minutes(),
        }
    }
}

/// Dialog engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogConfig {
    /// Number of event workers; events for one actor always land on the
    /// same worker.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-worker queue depth.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Admin user ids seeded at startup (the roster refresh can replace them).
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

fn default_workers() -> usize {
    8
}
fn default_queue_depth() -> usize {
    64
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            admin_ids: Vec::new(),
        }
    }
}

/// Mailing dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailingConfig {
    /// Idle pause between polls for pending mailings, in seconds.
    #[serde(default = "default_dispatch_idle_secs")]
    pub dispatch_idle_secs: u64,
    /// Mailing lifetime before the non-reacted report, in hours.
    #[serde(default = "default_lifetime_hours")]
    pub lifetime_hours: u64,
    /// Interval between expiry sweeps, in minutes.
    #[serde(default = "default_expiry_sweep_minutes")]
    pub expiry_sweep_minutes: u64,
}

fn default_dispatch_idle_secs() -> u64 {
    60
}
fn default_lifetime_hours() -> u64 {
    24
}
fn default_expiry_sweep_minutes() -> u64 {
    30
}

impl Default for MailingConfig {
    fn default() -> Self {
        Self {
            dispatch_idle_secs: default_dispatch_idle_secs(),
            lifetime_hours: default_lifetime_hours(),
            expiry_sweep_minutes: default_expiry_sweep_minutes(),
        }
    }
}
