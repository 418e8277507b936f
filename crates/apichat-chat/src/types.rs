//! Chat and config types matching the page's API surface.

use serde::{Deserialize, Serialize};

use crate::error::{MissingSetting, RelayError};

/// Upstream used until the user configures another one.
pub const DEFAULT_BASE_URL: &str = "https://api.algion.dev/v1";

/// Stored upstream configuration (persisted to config.json).
///
/// Both fields are always written. An unset key is stored as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl ApiConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Check that a relay call can be made with this config.
    ///
    /// The key is checked before the endpoint.
    pub fn require_ready(&self) -> Result<(), MissingSetting> {
        if self.api_key.is_empty() {
            return Err(MissingSetting::ApiKey);
        }
        if self.base_url.is_empty() {
            return Err(MissingSetting::Endpoint);
        }
        Ok(())
    }

    /// Full URL of the upstream chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Public projection of the config (no API key exposed).
    pub fn to_view(&self) -> ConfigView {
        ConfigView {
            base_url: self.base_url.clone(),
            has_api_key: self.has_api_key(),
        }
    }
}

/// Config response for `GET /config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigView {
    pub base_url: String,
    pub has_api_key: bool,
}

/// Config update request for `POST /config`.
///
/// An omitted `api_key` and a blank one both leave the stored key unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Result of a committed config update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub has_api_key: bool,
}

/// Incoming chat request. The page may send an empty message when only a
/// file was attached; the relay forwards it either way.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// One item of a relay stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A raw upstream line, without its terminator.
    Line(String),
    /// A synthesized failure. Always the last event of a stream.
    Error(RelayError),
}

impl StreamEvent {
    /// Wire form forwarded to the browser.
    ///
    /// Upstream lines pass through with a single `\n` appended. Errors become
    /// a complete `data: {"error": ...}` event.
    pub fn to_wire(&self) -> String {
        match self {
            StreamEvent::Line(line) => format!("{}\n", line),
            StreamEvent::Error(err) => {
                let payload = serde_json::json!({ "error": err.to_string() });
                format!("data: {}\n\n", payload)
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamEvent::Error(_))
    }
}
