//! Shared utilities, configuration, and error handling for Dashvault
//!
//! This crate provides common functionality used across the Dashvault workspace:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - JSON file helpers shared by the locator and the registry

pub mod config;
pub mod error;
pub mod fs;

pub use config::Config;
pub use error::{Error, Result};
pub use fs::{is_empty_json, load_json, save_json};
