//! Error channel for failures that happen off the caller's path.

use crate::Error;
use std::sync::Arc;
use tokio::sync::broadcast;

const LOG_TARGET: &str = "    notify";
const CHANNEL_CAPACITY: usize = 64;

/// Fans background errors out to every subscriber.
///
/// Errors are logged even when nobody listens.
#[derive(Debug, Clone)]
pub struct ErrorNotifier {
    sender: broadcast::Sender<Arc<Error>>,
}

impl ErrorNotifier {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn notify(&self, error: Error) {
        log::warn!(target: LOG_TARGET, "{error}");
        let _ = self.sender.send(Arc::new(error));
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Error>> {
        self.sender.subscribe()
    }
}

impl Default for ErrorNotifier {
    fn default() -> Self {
        Self::new()
    }
}
