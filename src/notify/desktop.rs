//! OS-level notifications through the platform's command line tools.

use std::io::ErrorKind;
use std::process::Command;

use super::NotificationSink;
use crate::config::app_name;
use crate::error::NotifyError;

pub struct DesktopNotifier {
    app: &'static str,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self { app: app_name() }
    }

    #[cfg(target_os = "windows")]
    fn command(&self, title: &str, message: &str) -> Command {
        let script = format!(
            "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] > $null; \
             $t = [Windows.UI.Notifications.ToastNotificationManager]::GetTemplateContent([Windows.UI.Notifications.ToastTemplateType]::ToastText02); \
             $x = $t.GetElementsByTagName('text'); \
             $x.Item(0).AppendChild($t.CreateTextNode('{}')) > $null; \
             $x.Item(1).AppendChild($t.CreateTextNode('{}')) > $null; \
             [Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier('{}').Show([Windows.UI.Notifications.ToastNotification]::new($t))",
            powershell_quote(title),
            powershell_quote(message),
            powershell_quote(self.app)
        );
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", script.as_str()]);
        cmd
    }

    #[cfg(target_os = "macos")]
    fn command(&self, title: &str, message: &str) -> Command {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            applescript_quote(message),
            applescript_quote(title)
        );
        let mut cmd = Command::new("osascript");
        cmd.args(["-e", script.as_str()]);
        cmd
    }

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    fn command(&self, title: &str, message: &str) -> Command {
        let mut cmd = Command::new("notify-send");
        cmd.args(["--app-name", self.app, "--urgency", "normal", title, message]);
        cmd
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for DesktopNotifier {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn deliver(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let status = self.command(title, message).status().map_err(|e| match e.kind() {
            ErrorKind::NotFound => NotifyError::Unavailable(e.to_string()),
            _ => NotifyError::Delivery(e.to_string()),
        })?;
        if !status.success() {
            return Err(NotifyError::Delivery(format!("notifier exited with {}", status)));
        }
        Ok(())
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn powershell_quote(s: &str) -> String {
    s.replace('\'', "''")
}
