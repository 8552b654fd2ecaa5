use crate::config::{AnalysisConfig, DialectPreset, DialectSpec, LengthPolicy};
use color_eyre::eyre::{Context, Result};
use log::info;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Load and parse analysis configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<AnalysisConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .with_context(|| format!("Failed to open configuration file: {}", config_path.display()))?;

    let config: AnalysisConfig = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse configuration file: {}", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bin_width: Option<f64>,
    pub duration: Option<f64>,
    pub dialect: Option<DialectPreset>,
    pub length_policy: Option<LengthPolicy>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut AnalysisConfig, overrides: &CliOverrides) -> Result<()> {
    if let Some(width) = overrides.bin_width {
        info!("Overriding bin width: {}s", width);
        config.bin_width = Duration::try_from_secs_f64(width)
            .with_context(|| format!("Invalid bin width: {}", width))?;
    }

    if let Some(duration) = overrides.duration {
        info!("Overriding trace duration: {}s", duration);
        config.duration = Some(
            Duration::try_from_secs_f64(duration)
                .with_context(|| format!("Invalid duration: {}", duration))?,
        );
    }

    if let Some(preset) = overrides.dialect {
        info!("Overriding trace dialect: {}", preset);
        config.dialect = DialectSpec::Preset(preset);
    }

    if let Some(policy) = overrides.length_policy {
        config.length_policy = policy;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}
