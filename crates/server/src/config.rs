//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::rate_limit::RateLimitPolicy;

/// Relays assessment conversations to the model on behalf of students,
/// holding the API key and enforcing per-student quotas.
#[derive(Clone, Parser)]
#[command(name = "viva-server", version, about)]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "VIVA_BIND", default_value = "0.0.0.0:5001")]
    pub bind: SocketAddr,

    /// Requests each student may make per window.
    #[arg(long, env = "VIVA_MAX_REQUESTS", default_value_t = 100)]
    pub max_requests: u32,

    /// Length of the rate limit window in seconds.
    #[arg(long, env = "VIVA_WINDOW_SECS", default_value_t = 3600)]
    pub window_secs: u64,

    /// Largest accepted submission in bytes.
    #[arg(long, env = "VIVA_MAX_CODE_BYTES", default_value_t = 64 * 1024)]
    pub max_code_bytes: usize,

    /// Model to relay to.
    #[arg(long, env = "ANTHROPIC_MODEL")]
    pub model: Option<String>,

    /// Override for the model API base URL.
    #[arg(long, env = "ANTHROPIC_BASE_URL")]
    pub base_url: Option<String>,

    /// Per-request timeout towards the model, in seconds.
    #[arg(long, env = "VIVA_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// API key for the model.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl ServerConfig {
    /// The quota policy described by this configuration.
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_requests: self.max_requests,
            window: Duration::from_secs(self.window_secs),
        }
    }

    /// The per-request timeout towards the model.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind", &self.bind)
            .field("max_requests", &self.max_requests)
            .field("window_secs", &self.window_secs)
            .field("max_code_bytes", &self.max_code_bytes)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .finish()
    }
}
