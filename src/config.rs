use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::uploader::retry::RetryPolicy;

pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub relay_url: String,
    pub upload_chunk_path: String,
    pub complete_upload_path: String,
    pub chunk_size_bytes: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub relay_bind_addr: String,
    pub upstream_url: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:8888".to_string(),
            upload_chunk_path: "/.netlify/functions/upload-chunk".to_string(),
            complete_upload_path: "/.netlify/functions/complete-upload".to_string(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
            request_timeout_secs: 120,
            relay_bind_addr: "127.0.0.1:8888".to_string(),
            upstream_url: "http://127.0.0.1:3000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    pub fn upload_chunk_url(&self) -> String {
        join_url(&self.relay_url, &self.upload_chunk_path)
    }

    pub fn complete_upload_url(&self) -> String {
        join_url(&self.relay_url, &self.complete_upload_path)
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("chunked-uploader");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

/// Load the config from the default location, writing defaults on first run.
pub fn load_config() -> AppResult<Config> {
    let config_path = get_config_path()?;
    load_config_from(&config_path)
}

pub fn load_config_from(config_path: &Path) -> AppResult<Config> {
    if config_path.exists() {
        let config_str = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        validate_config(&config)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save_config_to(&default_config, config_path)?;
        Ok(default_config)
    }
}

pub fn save_config_to(config: &Config, config_path: &Path) -> AppResult<()> {
    validate_config(config)?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.chunk_size_bytes == 0 {
        return Err(AppError::validation("chunk_size_bytes", "Must be greater than 0"));
    }

    if config.max_attempts == 0 || config.max_attempts > 10 {
        return Err(AppError::validation("max_attempts", "Must be between 1 and 10"));
    }

    if !(config.backoff_multiplier >= 1.0) {
        return Err(AppError::validation("backoff_multiplier", "Must be at least 1.0"));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(AppError::validation(
            "max_delay_ms",
            "Must not be smaller than base_delay_ms",
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(AppError::validation("request_timeout_secs", "Must be greater than 0"));
    }

    for (field, url) in [("relay_url", &config.relay_url), ("upstream_url", &config.upstream_url)] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::validation(field, "Must be an http(s) URL"));
        }
    }

    let valid_log_levels = ["off", "error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}
