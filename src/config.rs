use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::HttpApiConfig;
use crate::geo::DEFAULT_SIGNIFICANT_RADIUS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// env_logger filter; `RUST_LOG` is applied on top of it
    pub log_level: Option<String>,
    /// Identifies the user in published reports
    pub user_id: String,
    #[serde(rename = "loop")]
    pub loop_: LoopConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Default wake interval
    pub short_interval_ms: u64,
    /// Grace window of an active warning
    pub warning_interval_ms: u64,
    /// First dwell-confirmation wait
    pub will_leave_interval_ms: u64,
    /// Second dwell-confirmation wait
    pub will_stay_interval_ms: u64,
    /// Degree-space radius for significant movement
    pub significant_radius: f64,
    /// How long a wake waits for the platform fix
    pub fix_timeout_ms: u64,
    /// Route restaurant matches through WillLeave/WillStay before warning.
    /// Provisional: those states run placeholder rules, keep this off.
    pub dwell_confirmation: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            short_interval_ms: 10_000,
            warning_interval_ms: 30_000,
            will_leave_interval_ms: 30_000,
            will_stay_interval_ms: 600_000,
            significant_radius: DEFAULT_SIGNIFICANT_RADIUS,
            fix_timeout_ms: 20_000,
            dwell_confirmation: false,
        }
    }
}

impl LoopConfig {
    pub fn intervals(&self) -> LoopIntervals {
        LoopIntervals {
            short: Duration::from_millis(self.short_interval_ms),
            warning: Duration::from_millis(self.warning_interval_ms),
            will_leave: Duration::from_millis(self.will_leave_interval_ms),
            will_stay: Duration::from_millis(self.will_stay_interval_ms),
        }
    }

    pub fn fix_timeout(&self) -> Duration {
        Duration::from_millis(self.fix_timeout_ms)
    }
}

/// Wake intervals used by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopIntervals {
    pub short: Duration,
    pub warning: Duration,
    pub will_leave: Duration,
    pub will_stay: Duration,
}

impl Default for LoopIntervals {
    fn default() -> Self {
        LoopConfig::default().intervals()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let http = HttpApiConfig::default();
        Self {
            base_url: http.base_url,
            timeout_ms: http.timeout.as_millis() as u64,
        }
    }
}

impl ApiConfig {
    pub fn http(&self) -> HttpApiConfig {
        HttpApiConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            user_id: String::new(),
            loop_: LoopConfig::default(),
            api: ApiConfig::default(),
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

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
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
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Filter directives for the logger, `info` when unset
    pub fn log_filter(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Reject settings that would stall or spin the loop
    pub fn validate(&self) -> Result<()> {
        if self.loop_.short_interval_ms == 0 {
            eyre::bail!("loop.short_interval_ms must be greater than zero");
        }
        if self.loop_.warning_interval_ms == 0 {
            eyre::bail!("loop.warning_interval_ms must be greater than zero");
        }
        if !(self.loop_.significant_radius.is_finite() && self.loop_.significant_radius > 0.0) {
            eyre::bail!("loop.significant_radius must be a positive number");
        }
        Ok(())
    }
}
