//! Event delivery to the host.

use crossbeam_channel::Sender;
use tracing::warn;

use tonecam_types::EngineEvent;

/// Non-blocking event sender; a full or closed channel only logs.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: Sender<EngineEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: Sender<EngineEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, event: EngineEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}
