//! Process settings and data directory management.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Model id sent upstream unless `APICHAT_MODEL` overrides it.
pub const DEFAULT_MODEL: &str = "claude-opus-4.5";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;
/// Upper bound on an incoming request body. Attachments are inlined into the
/// chat message by the page, so this is also the message size limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Paths to the files apichat keeps on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (the working directory unless overridden).
    pub root: PathBuf,
    /// Persisted endpoint and credential (`config.json`).
    pub config_file: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config_file: root.join("config.json"),
            root,
        }
    }
}

/// Top-level process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub data_paths: DataPaths,
    /// Model id used for every upstream request.
    pub model: String,
    /// Bound on connecting to the upstream and on each read from it.
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Settings {
    /// Build settings from the process environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(data_dir: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;
        let model = lookup("APICHAT_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = parse_var(
            &lookup,
            "APICHAT_UPSTREAM_TIMEOUT_SECS",
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;
        let max_body_bytes = parse_var(&lookup, "APICHAT_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?;

        if timeout_secs == 0 {
            return Err(Error::Config(
                "APICHAT_UPSTREAM_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        Ok(Self {
            host,
            port,
            data_paths: DataPaths::new(data_dir),
            model,
            upstream_timeout: Duration::from_secs(timeout_secs),
            max_body_bytes,
        })
    }

    /// Socket address string to bind the HTTP server to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {}: {:?}", key, raw))),
        None => Ok(default),
    }
}
