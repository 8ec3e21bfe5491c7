use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for CrashCap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Monitoring engine settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Notification delivery settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration (used by the daemon)
    #[serde(default)]
    pub logging: LogConfig,
}

/// Monitoring engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Memory usage threshold in percent (default: 80)
    pub memory_threshold: f64,

    /// Check interval in seconds (default: 5)
    pub check_interval_secs: u64,

    /// Emit a notification when usage drops back below the threshold
    /// (default: true)
    pub notify_on_recovery: bool,

    /// Extra margin below the threshold required before recovering, in
    /// percentage points (default: 0, same threshold both directions)
    pub hysteresis_percent: f64,
}

/// Notification delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Send desktop notifications via notify-send (default: true)
    pub desktop: bool,

    /// Application name shown in notifications (default: "crashcap")
    pub app_name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log directory path (default: ./logs/)
    pub log_dir: PathBuf,

    /// Daemon log file name (default: crashcap.log)
    pub log_file: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            memory_threshold: 80.0,
            check_interval_secs: 5,
            notify_on_recovery: true,
            hysteresis_percent: 0.0,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            app_name: "crashcap".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            log_file: "crashcap.log".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Load from file when present, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Must be called before the monitor loop starts; invalid values are
    /// rejected here rather than clamped.
    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;

        if self.notifications.app_name.is_empty() {
            return Err(Error::Config("app_name must not be empty".to_string()));
        }

        Ok(())
    }
}

impl MonitorConfig {
    /// Bounds checks for the monitoring engine fields.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.memory_threshold) {
            return Err(Error::Config(format!(
                "memory_threshold must be 0-100, got: {}",
                self.memory_threshold
            )));
        }

        if self.check_interval_secs == 0 {
            return Err(Error::Config(
                "check_interval_secs must be > 0".to_string(),
            ));
        }

        if self.hysteresis_percent < 0.0 {
            return Err(Error::Config(format!(
                "hysteresis_percent must be >= 0, got: {}",
                self.hysteresis_percent
            )));
        }

        if self.hysteresis_percent > self.memory_threshold {
            return Err(Error::Config(format!(
                "hysteresis_percent ({}) must not exceed memory_threshold ({})",
                self.hysteresis_percent, self.memory_threshold
            )));
        }

        Ok(())
    }
}
