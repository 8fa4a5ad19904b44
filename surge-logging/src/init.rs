use anyhow::Result;
use surge_config::domains::logging::{LogFormat, LogLevel};
use surge_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Crates whose debug output drowns the engine's own lines
const NOISY_TARGETS: &[&str] = &["hyper=warn", "hyper_util=warn", "h2=warn", "rustls=warn", "reqwest=info"];

/// Resolve the filter directive.
///
/// An explicit CLI level wins, then `RUST_LOG`, then the configured level.
/// Bare levels get the noisy HTTP stack clamped; full directives are used
/// as given.
pub fn filter_directive(level: LogLevel, cli_override: Option<&str>, rust_log: Option<String>) -> String {
    if let Some(cli) = cli_override {
        return with_noise_clamped(cli);
    }

    match rust_log {
        Some(env) if !env.trim().is_empty() => env,
        _ => with_noise_clamped(level.as_str()),
    }
}

fn with_noise_clamped(directive: &str) -> String {
    if directive.contains('=') || directive.contains(',') {
        return directive.to_string();
    }

    let mut parts = vec![directive.to_string()];
    parts.extend(NOISY_TARGETS.iter().map(|s| s.to_string()));
    parts.join(",")
}

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig, cli_override: Option<&str>) -> Result<()> {
    let directive = filter_directive(config.level, cli_override, std::env::var("RUST_LOG").ok());
    let filter = env_filter(&directive);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    // Use try_init to avoid panic if global subscriber already set
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let filter = env_filter(&with_noise_clamped(log_level));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override_wins() {
        let directive = filter_directive(LogLevel::Info, Some("trace"), Some("warn".to_string()));
        assert!(directive.starts_with("trace,"));
        assert!(directive.contains("hyper=warn"));
    }

    #[test]
    fn test_rust_log_beats_config_level() {
        let directive = filter_directive(LogLevel::Info, None, Some("surge_engine=debug".to_string()));
        assert_eq!(directive, "surge_engine=debug");
    }

    #[test]
    fn test_config_level_is_fallback() {
        let directive = filter_directive(LogLevel::Debug, None, None);
        assert!(directive.starts_with("debug,"));

        let blank = filter_directive(LogLevel::Warn, None, Some("  ".to_string()));
        assert!(blank.starts_with("warn,"));
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        let config = LoggingConfig::default();
        temp_env::with_var_unset("RUST_LOG", || {
            assert!(init_logging_from_config(&config, None).is_ok());
            assert!(init_logging_from_config(&config, Some("debug")).is_ok());
            assert!(init_simple_tracing("info").is_ok());
        });
    }
}
