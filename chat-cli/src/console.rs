use enrichment::{Notification, NotificationPermission, Notifier};
use std::io::Write;

/// Prints notifications to stderr. Optionally activates each one right away.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    activate_on_notify: bool,
}

impl ConsoleNotifier {
    pub fn new(activate_on_notify: bool) -> Self {
        Self { activate_on_notify }
    }
}

impl Notifier for ConsoleNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn play_alert(&self) -> anyhow::Result<()> {
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }

    fn display(&self, notification: Notification) -> anyhow::Result<()> {
        eprintln!("[notification] {}", notification.title);
        if self.activate_on_notify && !notification.activation.activate() {
            anyhow::bail!("autopilot listener is gone");
        }
        Ok(())
    }
}
