use crate::config::NotificationConfig;
use crate::error::{Error, Result};
use std::process::Command;
use std::sync::Arc;
use tracing::{info, warn};

/// Delivers short operator notifications.
///
/// Delivery failure is never fatal to monitoring: callers log the error and
/// carry on. State transitions commit before delivery is attempted.
pub trait Notifier: Send + Sync {
    /// Deliver a message with a severity tag ("alert", "recovered").
    fn notify(&self, severity: &str, summary: &str, body: &str) -> Result<()>;
}

/// Desktop notifications via the notify-send command.
pub struct DesktopNotifier {
    app_name: String,
    command: String,
}

impl DesktopNotifier {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            command: "notify-send".to_string(),
        }
    }

    /// Override the binary invoked (used by tests).
    pub fn with_command(mut self, command: &str) -> Self {
        self.command = command.to_string();
        self
    }

    fn urgency(severity: &str) -> &'static str {
        if severity == "alert" {
            "critical"
        } else {
            "normal"
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, severity: &str, summary: &str, body: &str) -> Result<()> {
        let output = Command::new(&self.command)
            .arg("--app-name")
            .arg(&self.app_name)
            .arg("--urgency")
            .arg(Self::urgency(severity))
            .arg(summary)
            .arg(body)
            .output()
            .map_err(|e| {
                Error::Notification(format!("failed to run {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Notification(format!(
                "{} exited with {}: {}",
                self.command, output.status, stderr
            )));
        }

        Ok(())
    }
}

/// Fallback notifier that only writes to the log stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, severity: &str, summary: &str, body: &str) -> Result<()> {
        if severity == "alert" {
            warn!(severity, "{}: {}", summary, body);
        } else {
            info!(severity, "{}: {}", summary, body);
        }
        Ok(())
    }
}

/// Pick a notifier from configuration.
pub fn notifier_from_config(config: &NotificationConfig) -> Arc<dyn Notifier> {
    if config.desktop {
        Arc::new(DesktopNotifier::new(&config.app_name))
    } else {
        Arc::new(LogNotifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_notifier_always_delivers() {
        let notifier = LogNotifier;
        assert!(notifier.notify("alert", "high memory", "91.0%").is_ok());
        assert!(notifier.notify("recovered", "memory ok", "40.0%").is_ok());
    }

    #[test]
    fn test_desktop_notifier_missing_binary_is_delivery_error() {
        let notifier =
            DesktopNotifier::new("crashcap").with_command("crashcap-no-such-binary");
        let result = notifier.notify("alert", "high memory", "91.0%");

        assert!(matches!(result, Err(Error::Notification(_))));
    }

    #[test]
    fn test_urgency_mapping() {
        assert_eq!(DesktopNotifier::urgency("alert"), "critical");
        assert_eq!(DesktopNotifier::urgency("recovered"), "normal");
        assert_eq!(DesktopNotifier::urgency("anything-else"), "normal");
    }

    #[test]
    fn test_notifier_from_config() {
        let mut config = NotificationConfig::default();
        config.desktop = false;
        let notifier = notifier_from_config(&config);
        assert!(notifier.notify("recovered", "ok", "fine").is_ok());
    }
}
