//! Service configuration stored as TOML (default `logtail.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::producer::ProducerSettings;
use crate::io::tailer::TailSettings;

/// Service configuration (TOML).
///
/// Missing fields fall back to the defaults below, which reproduce the classic
/// behaviour: 50 records, 300 ms apart, tailed at the same cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogtailConfig {
    /// Directory holding `<token>.log` files.
    pub data_dir: PathBuf,

    /// Records written per deployment before the sentinel.
    pub record_count: u32,

    /// Pause between records, in milliseconds.
    pub record_interval_ms: u64,

    /// Pause between empty tail polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Empty polls tolerated on a log with no producer in this process.
    pub idle_poll_limit: u32,

    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            shutdown_grace_secs: 5,
        }
    }
}

impl Default for LogtailConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            record_count: 50,
            record_interval_ms: 300,
            poll_interval_ms: 300,
            idle_poll_limit: 200,
            server: ServerConfig::default(),
        }
    }
}

impl LogtailConfig {
    pub fn validate(&self) -> Result<()> {
        if self.record_count == 0 {
            return Err(anyhow!("record_count must be > 0"));
        }
        if self.record_interval_ms == 0 {
            return Err(anyhow!("record_interval_ms must be > 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        if self.idle_poll_limit == 0 {
            return Err(anyhow!("idle_poll_limit must be > 0"));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(anyhow!("data_dir must not be empty"));
        }
        if self.server.bind.trim().is_empty() {
            return Err(anyhow!("server.bind must not be empty"));
        }
        Ok(())
    }

    pub fn producer_settings(&self) -> ProducerSettings {
        ProducerSettings {
            record_count: self.record_count,
            interval: Duration::from_millis(self.record_interval_ms),
        }
    }

    pub fn tail_settings(&self) -> TailSettings {
        TailSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            idle_poll_limit: self.idle_poll_limit,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LogtailConfig::default()`.
pub fn load_config(path: &Path) -> Result<LogtailConfig> {
    if !path.exists() {
        let cfg = LogtailConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LogtailConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &LogtailConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
