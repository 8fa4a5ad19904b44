//! Configuration commands: validate, generate, show

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use surge_config::{ConfigLoader, SurgeConfig};
use tracing::{error, info};

/// Load the configuration file a run is described by.
///
/// Scenarios only come from a file; a missing or absent path is an error.
pub fn load_config(config_path: Option<&PathBuf>) -> Result<SurgeConfig> {
    let Some(path) = config_path else {
        return Err(anyhow::anyhow!(
            "No configuration file given. Use --config <PATH>, or create one with `surge config generate`."
        ));
    };

    if !path.exists() {
        return Err(anyhow::anyhow!("Configuration file not found: {:?}", path));
    }

    info!("Loading configuration from: {:?}", path);
    ConfigLoader::new()
        .from_file(path)
        .context(format!("Failed to load configuration from {:?}", path))
}

/// Handle configuration validation
pub fn handle_config_validate(config_file: Option<&PathBuf>) -> Result<()> {
    let Some(config_file) = config_file else {
        return Err(anyhow::anyhow!("No configuration file given. Use --config <PATH>."));
    };
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!("Configuration file not found: {:?}", config_file));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(config) => {
            println!("✅ Configuration file is valid");
            println!(
                "   target {} | {} -> {} -> {} users | {}s per phase | {} scenario(s)",
                config.spike.base_url,
                config.spike.baseline_concurrency,
                config.spike.spike_concurrency,
                config.spike.recovery_concurrency,
                config.spike.duration.as_secs(),
                config.spike.scenarios.len()
            );
            info!("Configuration validation passed");
            Ok(())
        }
        Err(e) => {
            println!("❌ Configuration validation failed: {}", e);
            error!("Configuration validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handle sample configuration generation
pub fn handle_config_generate(output: &Path, force: bool) -> Result<()> {
    info!("Generating sample configuration at: {:?}", output);

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, SurgeConfig::generate_sample())
        .context(format!("Failed to write configuration to {:?}", output))?;

    println!("✅ Sample configuration written to {:?}", output);
    Ok(())
}

/// Render the effective configuration
pub fn render_config(config: &SurgeConfig, format: &str) -> Result<String> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::to_string(config).context("Failed to serialize to YAML"),
        "json" => serde_json::to_string_pretty(config).context("Failed to serialize to JSON"),
        _ => Err(anyhow::anyhow!(
            "Unknown output format: {}. Valid formats: yaml, json",
            format
        )),
    }
}

/// Handle showing the effective configuration
pub fn handle_config_show(config: &SurgeConfig, format: &str) -> Result<()> {
    info!("Showing configuration (format: {})", format);
    println!("{}", render_config(config, format)?);
    Ok(())
}
