use tokio::sync::broadcast;

/// Session-level notifications consumed by the application shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A refresh replaced the stored access token.
    Refreshed,
    /// A 401 could not be recovered and the session was cleared.
    Unauthenticated { path: String },
}

const EVENT_CAPACITY: usize = 16;

/// Fan-out channel; publishing with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }
}

impl SessionEvents {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}
