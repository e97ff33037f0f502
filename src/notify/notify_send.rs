use super::{Notification, Notifier};
use crate::error::Error;
use std::process::Command;

/// Freedesktop notifications through `notify-send`.
#[derive(Debug)]
pub struct NotifySend {
    program: String,
}

impl Default for NotifySend {
    fn default() -> Self {
        Self {
            program: "notify-send".to_string(),
        }
    }
}

impl Notifier for NotifySend {
    fn show(&self, notification: &Notification) -> Result<(), Error> {
        // notify-send has no subtitle; it leads the body instead.
        let body = match &notification.subtitle {
            Some(subtitle) => format!("{}\n{}", subtitle, notification.body),
            None => notification.body.clone(),
        };
        let status = Command::new(&self.program)
            .arg("--urgency=critical")
            .arg(&notification.title)
            .arg(body)
            .status()
            .map_err(|e| Error::Notify(format!("{}: {}", self.program, e)))?;
        if !status.success() {
            return Err(Error::Notify(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}
