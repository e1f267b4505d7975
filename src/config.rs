//! # Configuration Module
//!
//! This module defines configuration structures for the bot, loaded from
//! environment variables (optionally through a `.env` file).

use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

// Constants for bot configuration
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_KNOWLEDGE_BASE_DIR: &str = "knowledge_base/data";
pub const DEFAULT_WEBHOOK_LISTEN_ADDR: &str = "0.0.0.0:8443";

/// Recovery configuration for transport setup (webhook registration, webhook removal)
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 1000, // 1 second
            max_retry_delay_ms: 10000, // 10 seconds
        }
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Webhook transport settings. Absent means long polling.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Public URL Telegram should deliver updates to
    pub url: reqwest::Url,
    /// Local address the webhook server binds to
    pub listen_addr: SocketAddr,
}

/// Configuration structure for the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token
    pub bot_token: String,
    /// Root directory for per-user JSON files
    pub data_dir: PathBuf,
    /// Root directory of the knowledge base tree
    pub knowledge_base_dir: PathBuf,
    /// Telegram user ids allowed to edit the knowledge base
    pub admin_ids: Vec<u64>,
    /// Webhook settings, `None` for polling
    pub webhook: Option<WebhookConfig>,
    /// Log output format
    pub log_format: LogFormat,
    /// Retry configuration for transport setup
    pub recovery: RecoveryConfig,
}

impl BotConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").context("BOT_TOKEN environment variable is not set")?;

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let knowledge_base_dir = env::var("KNOWLEDGE_BASE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_KNOWLEDGE_BASE_DIR));

        let admin_ids = parse_admin_ids(&env::var("ADMIN_IDS").unwrap_or_default())?;

        let webhook = match env::var("WEBHOOK_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let url = reqwest::Url::parse(url.trim())
                    .with_context(|| format!("WEBHOOK_URL is not a valid URL: {url}"))?;
                let listen_addr = env::var("WEBHOOK_LISTEN_ADDR")
                    .unwrap_or_else(|_| DEFAULT_WEBHOOK_LISTEN_ADDR.to_string());
                let listen_addr = listen_addr
                    .parse()
                    .with_context(|| format!("WEBHOOK_LISTEN_ADDR is not a socket address: {listen_addr}"))?;
                Some(WebhookConfig { url, listen_addr })
            }
            _ => None,
        };

        let log_format = env::var("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        Ok(Self {
            bot_token,
            data_dir,
            knowledge_base_dir,
            admin_ids,
            webhook,
            log_format,
            recovery: RecoveryConfig::default(),
        })
    }

    /// Whether the given Telegram user may edit the knowledge base
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Parse a comma-separated list of Telegram user ids, ignoring blanks
pub fn parse_admin_ids(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .with_context(|| format!("ADMIN_IDS contains an invalid id: {id}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        assert_eq!(parse_admin_ids("").unwrap(), Vec::<u64>::new());
        assert_eq!(parse_admin_ids("1, 2,,3 ").unwrap(), vec![1, 2, 3]);
        assert!(parse_admin_ids("1,abc").is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_recovery_defaults_reasonable() {
        let recovery = RecoveryConfig::default();
        assert!(recovery.max_retries <= 10);
        assert!(recovery.base_retry_delay_ms >= 100);
        assert!(recovery.base_retry_delay_ms <= recovery.max_retry_delay_ms);
    }
}
