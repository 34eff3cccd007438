//! User-facing error notification.
//!
//! The pipeline only labels errors; presenting them is delegated to a
//! `Notifier`. Notification is fire-and-forget and never fails the request.

use tokio::sync::mpsc;

use crate::request::ErrorMessageMode;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, mode: ErrorMessageMode);
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, mode: ErrorMessageMode) {
        match mode {
            ErrorMessageMode::None => {}
            ErrorMessageMode::Inline => tracing::warn!(mode = "inline", "{}", message),
            ErrorMessageMode::Modal => tracing::error!(mode = "modal", "{}", message),
        }
    }
}

/// A notification handed to a UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub mode: ErrorMessageMode,
}

/// Forwards notifications over a channel to whatever renders them.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, mode: ErrorMessageMode) {
        if mode == ErrorMessageMode::None {
            return;
        }
        // A closed receiver just means nobody is listening anymore.
        let _ = self.tx.send(Notification {
            message: message.to_string(),
            mode,
        });
    }
}
