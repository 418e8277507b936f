//! Shared application state.

use std::sync::Arc;

use apichat_chat::{ChatRelay, ConfigStore};
use apichat_core::Settings;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub config_store: Arc<ConfigStore>,
    pub relay: ChatRelay,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, reqwest::Error> {
        let config_store = Arc::new(ConfigStore::open(&settings.data_paths.config_file));
        let relay = ChatRelay::new(
            config_store.clone(),
            settings.model.clone(),
            settings.upstream_timeout,
        )?;

        Ok(Self {
            settings,
            config_store,
            relay,
        })
    }
}
