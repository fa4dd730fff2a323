use colored::*;
use eyre::{Context, Result};
use std::fs;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
        ConfigAction::Set { key, value } => set(&key, &value, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "persona-lab Configuration".bold());
            println!();

            println!("{}:", "paths".cyan());
            println!("  personas: {}", config.paths.personas.display());
            println!();

            println!("{}: {}", "log_level".cyan(), config.log_level.as_filter());
            println!();

            println!("{}:", "layout".cyan());
            println!("  iterations: {}", config.layout.iterations);
            println!("  repulsion: {}", config.layout.repulsion);
            println!("  attraction: {}", config.layout.attraction);
            println!("  radius: {}", config.layout.radius);
            println!("  center: ({}, {})", config.layout.center_x, config.layout.center_y);
            println!("  bounds: [{}, {}]", config.layout.min, config.layout.max);
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    let layout = &config.layout;
    match key {
        "paths.personas" => Some(config.paths.personas.display().to_string()),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        "layout.iterations" => Some(layout.iterations.to_string()),
        "layout.repulsion" => Some(layout.repulsion.to_string()),
        "layout.attraction" => Some(layout.attraction.to_string()),
        "layout.radius" => Some(layout.radius.to_string()),
        "layout.center_x" => Some(layout.center_x.to_string()),
        "layout.center_y" => Some(layout.center_y.to_string()),
        "layout.min" => Some(layout.min.to_string()),
        "layout.max" => Some(layout.max.to_string()),
        _ => None,
    }
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => eyre::bail!("Unknown config key: {}", key),
    }

    Ok(())
}

fn apply(key: &str, value: &str, config: &mut Config) -> Result<()> {
    fn number(value: &str) -> Result<f64> {
        value.parse().context("Invalid number")
    }

    let layout = &mut config.layout;
    match key {
        "paths.personas" => config.paths.personas = value.into(),
        "log_level" | "log-level" => config.log_level = value.parse().map_err(|e: String| eyre::eyre!(e))?,
        "layout.iterations" => layout.iterations = value.parse().context("Invalid iteration count")?,
        "layout.repulsion" => layout.repulsion = number(value)?,
        "layout.attraction" => layout.attraction = number(value)?,
        "layout.radius" => layout.radius = number(value)?,
        "layout.center_x" => layout.center_x = number(value)?,
        "layout.center_y" => layout.center_y = number(value)?,
        "layout.min" => layout.min = number(value)?,
        "layout.max" => layout.max = number(value)?,
        _ => {
            eyre::bail!("Unknown config key: {}", key);
        }
    }

    config.layout.validate()
}

fn set(key: &str, value: &str, config: &Config) -> Result<()> {
    println!("{} Setting {} = {}", "→".blue(), key.cyan(), value.green());

    let mut new_config = config.clone();
    apply(key, value, &mut new_config)?;

    let config_path = Config::app_dir().join("persona-lab.yaml");
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml_str = serde_yaml::to_string(&new_config).context("Failed to serialize config")?;
    fs::write(&config_path, yaml_str).context("Failed to write config file")?;

    println!("  {} Saved to {}", "✓".green(), config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_lookup_known_keys() {
        let config = Config::default();
        assert_eq!(lookup("layout.iterations", &config).as_deref(), Some("50"));
        assert_eq!(lookup("log_level", &config).as_deref(), Some("info"));
        assert!(lookup("layout.gravity", &config).is_none());
    }

    #[test]
    fn test_apply_updates_values() {
        let mut config = Config::default();
        apply("layout.attraction", "0.05", &mut config).unwrap();
        apply("log-level", "warn", &mut config).unwrap();
        apply("paths.personas", "/tmp/personas", &mut config).unwrap();

        assert_eq!(config.layout.attraction, 0.05);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.paths.personas, std::path::PathBuf::from("/tmp/personas"));
    }

    #[test]
    fn test_apply_rejects_invalid() {
        let mut config = Config::default();
        assert!(apply("layout.iterations", "-3", &mut config).is_err());
        assert!(apply("layout.min", "999", &mut config).is_err());
        assert!(apply("nope", "1", &mut config).is_err());
        assert!(apply("log_level", "shout", &mut config).is_err());
    }
}
