use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Single-topic, payload-less change notification channel. Observers
/// subscribe for a receiver and re-read the store when a tick arrives.
#[derive(Clone, Default)]
pub struct ChangeBus {
    subscribers: Arc<Mutex<Vec<Sender<()>>>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<()> {
        let (sender, receiver) = mpsc::channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(sender);
        }
        receiver
    }

    /// Notify every live subscriber; subscribers whose receiver was dropped
    /// are pruned.
    pub fn notify(&self) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|s| s.send(()).is_ok());
        }
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.subscribers.lock().map(|s| s.len()).unwrap_or(0);
        f.debug_struct("ChangeBus").field("subscribers", &count).finish()
    }
}
