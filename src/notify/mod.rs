mod osascript;
mod notify_send;

pub use notify_send::NotifySend;
pub use osascript::Osascript;

use crate::error::Error;
use tracing::info;

/// A user-visible desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            body: body.into(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }
}

pub trait Notifier {
    fn show(&self, notification: &Notification) -> Result<(), Error>;
}

/// Notifier that only writes to the log. Used when no desktop session is available.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, notification: &Notification) -> Result<(), Error> {
        info!(
            title = %notification.title,
            subtitle = notification.subtitle.as_deref().unwrap_or(""),
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Pick the desktop notifier for the running platform.
pub fn platform_default() -> Box<dyn Notifier> {
    if cfg!(target_os = "macos") {
        Box::new(Osascript::default())
    } else if cfg!(target_os = "linux") {
        Box::new(NotifySend::default())
    } else {
        Box::new(LogNotifier)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn show(&self, notification: &Notification) -> Result<(), Error> {
        (**self).show(notification)
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn show(&self, notification: &Notification) -> Result<(), Error> {
        (**self).show(notification)
    }
}
