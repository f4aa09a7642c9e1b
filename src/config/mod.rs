//! Configuration management for mpptmon.
//!
//! One TOML file with sections for the serial link, the history fetch
//! bounds, report output, and logging. All values have defaults; `load`
//! validates after parsing so bad bounds fail at startup, not mid-fetch.
//!
//! Precedence follows the usual order: CLI args override the file, the file
//! overrides defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// VE.Direct serial port path, e.g. /dev/ttyUSB0.
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Days of history to pull, day 0 being today. The controller keeps
    /// roughly 30 days.
    #[serde(default = "default_days")]
    pub days: usize,
    /// Pause between empty reads while waiting on a response (ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum wait for one response before the attempt is abandoned (ms).
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    /// Attempts per day before that day is skipped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV destination for `history`; empty disables the file.
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; logs also go to the console when it is a TTY.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_baud_rate() -> u32 {
    crate::vedirect::BAUD_RATE
}
fn default_days() -> usize {
    10
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_max_wait_ms() -> u64 {
    10_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_csv_path() -> String {
    "solar_history.csv".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_ms: default_max_wait_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("invalid config in {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let serialized = toml::to_string_pretty(&Config::default())?;
        fs::write(path, serialized)
            .await
            .with_context(|| format!("failed to write config file {}", path))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(anyhow!("serial.baud_rate must be greater than zero"));
        }
        if self.fetch.days == 0 || self.fetch.days > 30 {
            return Err(anyhow!(
                "fetch.days must be in 1..=30 (the controller keeps ~30 days), got {}",
                self.fetch.days
            ));
        }
        if self.fetch.poll_interval_ms == 0 {
            return Err(anyhow!("fetch.poll_interval_ms must be greater than zero"));
        }
        if self.fetch.max_wait_ms < self.fetch.poll_interval_ms {
            return Err(anyhow!(
                "fetch.max_wait_ms ({}) must be at least fetch.poll_interval_ms ({})",
                self.fetch.max_wait_ms,
                self.fetch.poll_interval_ms
            ));
        }
        if self.fetch.max_attempts == 0 {
            return Err(anyhow!("fetch.max_attempts must be greater than zero"));
        }
        Ok(())
    }

    /// Fetch bounds as the fetcher's options struct.
    pub fn fetch_options(&self) -> crate::vedirect::FetchOptions {
        crate::vedirect::FetchOptions {
            days: self.fetch.days,
            poll_interval: Duration::from_millis(self.fetch.poll_interval_ms),
            max_wait: Duration::from_millis(self.fetch.max_wait_ms),
            max_attempts: self.fetch.max_attempts,
        }
    }
}
