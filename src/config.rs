use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::LayoutConfig;

/// Main persona-lab configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub log_level: LogLevel,
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the persona store (<personas>/<slug>/<version>.yaml)
    pub personas: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" => Ok(LogLevel::Off),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            personas: Config::app_dir().join("personas"),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Check PERSONA_LAB_CONFIG env var
        if let Ok(env_path) = std::env::var("PERSONA_LAB_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from PERSONA_LAB_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try PERSONA_LAB_DIR/persona-lab.yaml
        if let Ok(dir) = std::env::var("PERSONA_LAB_DIR") {
            let path = PathBuf::from(dir).join("persona-lab.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from PERSONA_LAB_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/persona-lab/persona-lab.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("persona-lab").join("persona-lab.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./persona-lab.yaml (for development)
        let local_config = PathBuf::from("persona-lab.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.layout.validate().context("Invalid layout settings")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// The persona-lab directory (where personas and config live)
    pub fn app_dir() -> PathBuf {
        std::env::var("PERSONA_LAB_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("persona-lab")
        })
    }

    /// Personas directory with ~ and env vars expanded
    pub fn personas_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.personas)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}
