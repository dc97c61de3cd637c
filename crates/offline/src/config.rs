//! Runtime configuration for the offline sync service.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::queue::QUEUE_DB_FILE;
use crate::sync_engine::DEFAULT_SUBMIT_TIMEOUT;
use crate::sync_worker::DEFAULT_PROBE_INTERVAL;

pub const API_URL_ENV: &str = "BONTEZ_API_URL";
pub const AUTH_TOKEN_ENV: &str = "BONTEZ_AUTH_TOKEN";
pub const DATA_DIR_ENV: &str = "BONTEZ_DATA_DIR";
pub const SYNC_TIMEOUT_ENV: &str = "BONTEZ_SYNC_TIMEOUT_SECS";
pub const PROBE_INTERVAL_ENV: &str = "BONTEZ_PROBE_INTERVAL_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub data_dir: PathBuf,
    /// Bound on each remote create call during a pass.
    pub submit_timeout: Duration,
    /// `None` when probing is disabled.
    pub probe_interval: Option<Duration>,
}

impl OfflineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let auth_token = get(AUTH_TOKEN_ENV);

        let data_dir = match get(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let submit_timeout = match get(SYNC_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(parse_secs(SYNC_TIMEOUT_ENV, &raw)?),
            None => DEFAULT_SUBMIT_TIMEOUT,
        };
        anyhow::ensure!(!submit_timeout.is_zero(), "{SYNC_TIMEOUT_ENV} must be greater than zero");

        let probe_interval = match get(PROBE_INTERVAL_ENV) {
            Some(raw) => match parse_secs(PROBE_INTERVAL_ENV, &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => Some(DEFAULT_PROBE_INTERVAL),
        };

        Ok(Self {
            api_url,
            auth_token,
            data_dir,
            submit_timeout,
            probe_interval,
        })
    }

    /// Location of the queue database.
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join(QUEUE_DB_FILE)
    }
}

fn parse_secs(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}"))
}

/// `{OS data dir}/bontez`, falling back to `~/.local/share/bontez`.
fn default_data_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;
    Ok(base.join("bontez"))
}
