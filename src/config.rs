use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the webhook URL
pub const WEBHOOK_URL_ENV: &str = "JSON_WEBHOOK_URL";

/// Main json-notifier configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    /// Append logs here instead of stderr
    pub log_file: Option<PathBuf>,
    pub callback_json_notifier: NotifierConfig,
}

/// Options for the webhook notifier
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Send the JSON to the given URL
    pub json_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
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

    pub fn level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
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

        // Check JSON_NOTIFIER_CONFIG env var
        if let Ok(env_path) = std::env::var("JSON_NOTIFIER_CONFIG") {
            let path = Self::expand_path(Path::new(&env_path));
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from JSON_NOTIFIER_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try JSON_NOTIFIER_DIR/json-notifier.yaml
        if let Ok(dir) = std::env::var("JSON_NOTIFIER_DIR") {
            let path = PathBuf::from(dir).join("json-notifier.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from JSON_NOTIFIER_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/json-notifier/json-notifier.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("json-notifier").join("json-notifier.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./json-notifier.yaml (for development)
        let local_config = PathBuf::from("json-notifier.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }

    /// Resolve the webhook URL: `direct` (command line), then the
    /// environment, then this config file
    pub fn webhook_url(&self, direct: Option<&str>) -> Option<String> {
        let env = std::env::var(WEBHOOK_URL_ENV).ok();
        resolve_webhook_url(
            direct,
            env.as_deref(),
            self.callback_json_notifier.json_webhook_url.as_deref(),
        )
    }
}

/// First non-blank candidate wins
pub fn resolve_webhook_url(direct: Option<&str>, env: Option<&str>, file: Option<&str>) -> Option<String> {
    [direct, env, file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(|url| url.to_string())
}
