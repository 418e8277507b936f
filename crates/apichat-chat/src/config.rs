//! Upstream config persistence and validated updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::types::{ApiConfig, ConfigUpdate, ConfigView, UpdateOutcome};

/// Load the config file, falling back to [`ApiConfig::default`] when the file
/// is missing, unreadable or malformed. Never fails.
pub fn load_or_default(config_path: &Path) -> ApiConfig {
    let raw = match std::fs::read_to_string(config_path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No config at {}, using defaults", config_path.display());
            return ApiConfig::default();
        }
        Err(e) => {
            warn!("Cannot read {}: {}, using defaults", config_path.display(), e);
            return ApiConfig::default();
        }
    };

    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(serde_json::Value::Object(fields)) => ApiConfig::from_fields(&fields),
        Ok(_) => {
            warn!("Config in {} is not an object, using defaults", config_path.display());
            ApiConfig::default()
        }
        Err(e) => {
            warn!("Malformed config in {}: {}, using defaults", config_path.display(), e);
            ApiConfig::default()
        }
    }
}

/// Write the full config to disk as pretty JSON, replacing prior contents.
pub fn save(config: &ApiConfig, config_path: &Path) -> apichat_core::Result<()> {
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(config_path, json)?;
    info!("Saved config to {}", config_path.display());
    Ok(())
}

impl ApiConfig {
    /// Overlay stored fields on the defaults. `null` entries are skipped and
    /// non-string scalars are kept in their JSON text form.
    pub fn from_fields(fields: &serde_json::Map<String, serde_json::Value>) -> ApiConfig {
        let mut config = ApiConfig::default();
        for (name, slot) in [
            ("api_key", &mut config.api_key),
            ("base_url", &mut config.base_url),
        ] {
            match fields.get(name) {
                None | Some(serde_json::Value::Null) => {}
                Some(serde_json::Value::String(s)) => *slot = s.clone(),
                Some(other) => *slot = other.to_string(),
            }
        }
        config
    }

    /// Merge an update into a copy of this config and validate the result.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<ApiConfig, ConfigError> {
        let base_url = update
            .base_url
            .as_deref()
            .unwrap_or("")
            .trim()
            .trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }

        let mut next = self.clone();
        next.base_url = base_url.to_string();

        if let Some(key) = update.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                next.api_key = key.to_string();
            }
        }

        if next.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(next)
    }
}

/// Single source of truth for the upstream endpoint and credential.
///
/// Readers get an immutable snapshot. Updates are serialized and only become
/// visible after they have been written to disk.
pub struct ConfigStore {
    config_path: PathBuf,
    current: RwLock<Arc<ApiConfig>>,
    writer: Mutex<()>,
}

impl ConfigStore {
    /// Open the store, loading `config_path` or falling back to defaults.
    pub fn open(config_path: &Path) -> Self {
        let config = load_or_default(config_path);
        info!(
            "Config loaded: endpoint {}, api key {}",
            config.base_url,
            if config.has_api_key() { "set" } else { "unset" }
        );
        Self::with_config(config_path, config)
    }

    /// Build a store around an already loaded config.
    pub fn with_config(config_path: &Path, config: ApiConfig) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            current: RwLock::new(Arc::new(config)),
            writer: Mutex::new(()),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Current config snapshot.
    pub fn read(&self) -> Arc<ApiConfig> {
        self.current.read().clone()
    }

    /// Display projection; never exposes the key.
    pub fn describe(&self) -> ConfigView {
        self.read().to_view()
    }

    /// Merge, validate, persist, then commit. All or nothing.
    pub fn update(&self, update: &ConfigUpdate) -> Result<UpdateOutcome, ConfigError> {
        let _writer = self.writer.lock();

        let next = self.read().merged(update)?;
        save(&next, &self.config_path)?;

        let outcome = UpdateOutcome {
            has_api_key: next.has_api_key(),
        };
        *self.current.write() = Arc::new(next);
        info!("Config updated");
        Ok(outcome)
    }
}
