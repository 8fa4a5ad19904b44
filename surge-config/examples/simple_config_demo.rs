//! Simple configuration demo
//!
//! A minimal example showing basic configuration loading

use std::fs;
use surge_config::{ConfigError, ConfigLoader, ConfigResult};
use tempfile::TempDir;

fn main() -> ConfigResult<()> {
    println!("🚀 Simple Surge Configuration Demo");

    let temp_dir = TempDir::new().map_err(ConfigError::FileReadError)?;

    let config_path = temp_dir.path().join("surge.yaml");
    let config_content = r#"
spike:
  base_url: "http://localhost:3000"
  baseline_concurrency: 10
  spike_concurrency: 100
  recovery_concurrency: 10
  duration: 60
  spike_ramp_up: 2
  scenarios:
    - name: list_portfolios
      path: /api/portfolios
      weight: 4
    - name: create_order
      method: POST
      path: /api/orders
      body:
        symbol: "ACME"
        quantity: 1
        client_ref: "{{uuid}}"

http:
  timeout: 10
  user_agent: "Surge/0.1"

logging:
  level: "info"
  format: "json"
"#;

    fs::write(&config_path, config_content).map_err(ConfigError::FileReadError)?;

    let loader = ConfigLoader::new();
    let config = loader.from_file(&config_path)?;

    println!("✅ Configuration loaded successfully!");
    println!("   Target: {}", config.spike.base_url);
    println!(
        "   Load: {} -> {} -> {} virtual users, {}s per phase",
        config.spike.baseline_concurrency,
        config.spike.spike_concurrency,
        config.spike.recovery_concurrency,
        config.spike.duration.as_secs()
    );
    for scenario in &config.spike.scenarios {
        println!("   Scenario {} {} {} (weight {})", scenario.name, scenario.method, scenario.path, scenario.weight);
    }
    println!("   HTTP timeout: {}s", config.http.timeout.as_secs());
    println!("   Logging level: {:?}", config.logging.level);

    Ok(())
}
