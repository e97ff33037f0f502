use super::{Notification, Notifier};
use crate::error::Error;
use std::process::Command;

/// macOS notifications through AppleScript's `display notification`.
#[derive(Debug)]
pub struct Osascript {
    program: String,
}

impl Default for Osascript {
    fn default() -> Self {
        Self {
            program: "/usr/bin/osascript".to_string(),
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

pub(crate) fn build_script(notification: &Notification) -> String {
    let mut script = format!(
        "display notification \"{}\" with title \"{}\"",
        escape(&notification.body),
        escape(&notification.title)
    );
    if let Some(subtitle) = &notification.subtitle {
        script.push_str(&format!(" subtitle \"{}\"", escape(subtitle)));
    }
    script
}

impl Notifier for Osascript {
    fn show(&self, notification: &Notification) -> Result<(), Error> {
        let status = Command::new(&self.program)
            .arg("-e")
            .arg(build_script(notification))
            .status()
            .map_err(|e| Error::Notify(format!("{}: {}", self.program, e)))?;
        if !status.success() {
            return Err(Error::Notify(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}
