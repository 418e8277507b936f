//! apichat core: process settings, data paths and the shared error type.

pub mod config;
pub mod error;

pub use config::{DataPaths, Settings};
pub use error::{Error, Result};
