//! Config and relay error taxonomy.

use thiserror::Error;

/// A setting the relay needs but the stored config lacks.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSetting {
    #[error("Endpoint")]
    Endpoint,
    #[error("API key")]
    ApiKey,
}

/// Rejected config update. Nothing is committed when one of these is returned.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Endpoint must not be empty")]
    EmptyEndpoint,

    #[error("API key is required")]
    MissingApiKey,

    #[error("Failed to save config: {0}")]
    Storage(#[from] apichat_core::Error),
}

impl ConfigError {
    /// Whether the user can fix this by changing the submitted values.
    pub fn is_user_error(&self) -> bool {
        matches!(self, ConfigError::EmptyEndpoint | ConfigError::MissingApiKey)
    }
}

/// Failure surfaced as the final event of a relay stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("{0} not configured")]
    NotConfigured(MissingSetting),

    #[error("{status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("{0}")]
    Transport(String),

    #[error("upstream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

impl RelayError {
    /// Build a transport error from an error and its source chain.
    pub fn transport(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !detail.contains(&cause_text) {
                detail.push_str(": ");
                detail.push_str(&cause_text);
            }
            source = cause.source();
        }
        RelayError::Transport(detail)
    }
}
