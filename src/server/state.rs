//! Server state and configuration.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::generate::GeneratorConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:5000")
    pub listen_addr: String,
    /// Template and directories used for every request
    pub generator: GeneratorConfig,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    /// Unix timestamp of server boot for cache busting.
    pub boot_time: u64,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let boot_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self { config, boot_time }
    }
}
