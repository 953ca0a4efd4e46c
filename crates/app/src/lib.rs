//! Dashvault application composition root
//!
//! Wires the artifact store, the local tree and the alias registry of one
//! root folder into an [`Archivist`].

pub mod archivist;

pub use archivist::{Archivist, ImportOutcome, PopulateSummary, Target};

use dashvault_common::Config;
use dashvault_kibana::{StoreConfig, StoreFactory};
use tracing_subscriber::EnvFilter;

/// Build an archivist from configuration
pub fn create_archivist(config: &Config) -> Result<Archivist, anyhow::Error> {
    let store = StoreFactory::create(StoreConfig::from_config(config))?;
    let archivist = Archivist::new(store, &config.root_path)?;
    Ok(archivist)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set, otherwise the configured filter applies.
/// Calling this twice is harmless.
pub fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
