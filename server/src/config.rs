//! Runtime knobs of the authoritative server

use shared::{DRAIN_BUDGET_MS, SERVER_TICK_MS, WAVE_INTERVAL_TICKS};

/// Server configuration, filled from the command line by the binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Fixed tick interval in milliseconds
    pub tick_ms: u64,
    /// Ticks between enemy waves; 0 disables waves
    pub wave_interval_ticks: u64,
    /// Time allowed for draining the inbound queue in one tick
    pub drain_budget_ms: u64,
    /// Seed for spawn positions; random when absent
    pub seed: Option<u64>,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            tick_ms: SERVER_TICK_MS,
            wave_interval_ticks: WAVE_INTERVAL_TICKS,
            drain_budget_ms: DRAIN_BUDGET_MS,
            seed: None,
        }
    }
}
