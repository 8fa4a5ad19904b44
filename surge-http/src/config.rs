//! HTTP configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use surge_config::domains::http::HttpConfig as ConfigHttpConfig;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Maximum number of redirects to follow
    pub max_redirects: u32,

    /// User agent string
    pub user_agent: String,

    /// Whether to verify SSL certificates
    pub verify_ssl: bool,

    /// Maximum idle connections kept per host
    pub pool_max_idle_per_host: usize,

    /// How long an idle pooled connection is kept
    pub pool_idle_timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        ConfigHttpConfig::default().into()
    }
}

impl From<ConfigHttpConfig> for HttpConfig {
    fn from(config: ConfigHttpConfig) -> Self {
        Self {
            pool_max_idle_per_host: config.pool_size_for(0),
            connect_timeout: config.effective_connect_timeout(),
            timeout: config.timeout,
            max_redirects: config.max_redirects,
            user_agent: config.user_agent,
            verify_ssl: config.verify_ssl,
            pool_idle_timeout: config.pool_idle_timeout,
        }
    }
}

impl HttpConfig {
    /// Client settings with the pool sized for `peak_concurrency` virtual users
    pub fn for_load(config: ConfigHttpConfig, peak_concurrency: usize) -> Self {
        let pool = config.pool_size_for(peak_concurrency);
        Self {
            pool_max_idle_per_host: pool,
            ..Self::from(config)
        }
    }
}
