//! Session change notifications.

use std::fmt;

/// Something downstream views should refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// The preview target or its content changed
    PreviewChanged,
    /// The form a viewer should show changed
    FormChanged,
}

impl SessionEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::PreviewChanged => "preview_file_content_updated",
            SessionEvent::FormChanged => "form_content_updated",
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives session events.
///
/// Observers are called after the session lock is released, so they may
/// query the session.
pub trait SessionObserver: Send + Sync {
    /// Handle one event.
    fn notify(&self, event: SessionEvent);
}

impl<F> SessionObserver for F
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn notify(&self, event: SessionEvent) {
        self(event)
    }
}

/// Observer that only logs events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn notify(&self, event: SessionEvent) {
        log::debug!("session event: {}", event);
    }
}
