//! HTTP client settings for load generation
//!
//! One client is shared by every virtual user, so its pool and timeouts shape
//! the load a phase can actually put on the target.

use crate::domains::spike::SpikeConfig;
use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Idle connections kept per host when the pool is not sized explicitly
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 32;

/// HTTP client used to drive the target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout; also the default phase grace period
    #[serde(with = "crate::domains::utils::serde_duration")]
    pub timeout: Duration,

    /// TCP connect timeout, capped at `timeout`
    #[serde(with = "crate::domains::utils::serde_duration")]
    pub connect_timeout: Duration,

    /// Redirects followed per request; 0 records the 3xx as is
    pub max_redirects: u32,

    pub user_agent: String,

    pub verify_ssl: bool,

    /// Idle connections kept per host. Unset sizes the pool to the largest
    /// phase so spike users do not queue for sockets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_max_idle_per_host: Option<usize>,

    #[serde(with = "crate::domains::utils::serde_duration")]
    pub pool_idle_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 0,
            user_agent: format!("Surge/{}", env!("CARGO_PKG_VERSION")),
            verify_ssl: true,
            pool_max_idle_per_host: None,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl HttpConfig {
    pub fn effective_connect_timeout(&self) -> Duration {
        self.connect_timeout.min(self.timeout)
    }

    /// Pool size for a run whose busiest phase has `peak_concurrency` users
    pub fn pool_size_for(&self, peak_concurrency: usize) -> usize {
        self.pool_max_idle_per_host
            .unwrap_or_else(|| peak_concurrency.max(DEFAULT_POOL_MAX_IDLE_PER_HOST))
    }

    /// Settings that are valid on their own but will distort `spike`
    pub fn load_warnings(&self, spike: &SpikeConfig) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(grace) = spike.grace_period {
            if grace < self.timeout {
                warnings.push(format!(
                    "spike.grace_period ({}s) is shorter than http.timeout ({}s); requests still in flight at a phase deadline may be abandoned and go unrecorded",
                    grace.as_secs(),
                    self.timeout.as_secs()
                ));
            }
        }

        let peak = spike.peak_concurrency();
        if let Some(pool) = self.pool_max_idle_per_host {
            if pool < peak {
                warnings.push(format!(
                    "http.pool_max_idle_per_host ({}) is below the peak concurrency ({}); spike users will open fresh connections",
                    pool, peak
                ));
            }
        }

        warnings
    }
}

impl Validatable for HttpConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.timeout.as_secs(), "timeout", self.domain_name())?;
        validate_positive(self.connect_timeout.as_secs(), "connect_timeout", self.domain_name())?;

        validate_required_string(&self.user_agent, "user_agent", self.domain_name())?;

        if let Some(pool) = self.pool_max_idle_per_host {
            validate_positive(pool, "pool_max_idle_per_host", self.domain_name())?;
        }
        validate_positive(self.pool_idle_timeout.as_secs(), "pool_idle_timeout", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_do_not_follow_redirects() {
        let config = HttpConfig::default();
        assert_eq!(config.max_redirects, 0);
        assert_eq!(config.pool_max_idle_per_host, None);
        assert!(config.user_agent.starts_with("Surge/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connect_timeout_capped_at_timeout() {
        let config = HttpConfig {
            timeout: Duration::from_secs(5),
            ..HttpConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_connect_timeout(), Duration::from_secs(5));
        assert_eq!(
            HttpConfig::default().effective_connect_timeout(),
            Duration::from_secs(10)
        );

        let zero_connect = HttpConfig {
            connect_timeout: Duration::ZERO,
            ..HttpConfig::default()
        };
        assert!(zero_connect.validate().is_err());

        let zero_pool = HttpConfig {
            pool_max_idle_per_host: Some(0),
            ..HttpConfig::default()
        };
        assert!(zero_pool.validate().is_err());
    }

    #[test]
    fn test_pool_sized_to_peak_concurrency() {
        let config = HttpConfig::default();
        assert_eq!(config.pool_size_for(500), 500);
        assert_eq!(config.pool_size_for(4), DEFAULT_POOL_MAX_IDLE_PER_HOST);

        let explicit = HttpConfig {
            pool_max_idle_per_host: Some(64),
            ..HttpConfig::default()
        };
        assert_eq!(explicit.pool_size_for(500), 64);
    }

    #[test]
    fn test_load_warnings() {
        let mut spike = SpikeConfig::default();
        let config = HttpConfig {
            timeout: Duration::from_secs(10),
            ..HttpConfig::default()
        };
        assert!(config.load_warnings(&spike).is_empty());

        spike.grace_period = Some(Duration::from_secs(2));
        let undersized = HttpConfig {
            pool_max_idle_per_host: Some(10),
            ..config
        };
        let warnings = undersized.load_warnings(&spike);

        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("grace_period (2s)"));
        assert!(warnings[1].contains("peak concurrency (100)"));
    }
}
