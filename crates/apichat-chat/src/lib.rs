//! Chat relay with a persisted upstream config.
//!
//! Relays one user message at a time to an OpenAI-compatible chat completions
//! endpoint and passes the streamed reply through line by line.

pub mod config;
pub mod error;
pub mod relay;
pub mod types;

pub use config::ConfigStore;
pub use error::{ConfigError, MissingSetting, RelayError};
pub use relay::{ChatRelay, RelayStream};
pub use types::*;
