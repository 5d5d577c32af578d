// Drives a tracker from a channel of host events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::fs::StateFs;
use crate::host::EditorHost;
use crate::lifecycle::{HostEvent, Tracker};

/// Capacity for host event channels created with [`event_channel`].
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

pub fn event_channel() -> (mpsc::Sender<HostEvent>, mpsc::Receiver<HostEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Dispatch events from `events` in order until `Shutdown` arrives or every
/// sender is dropped. Either way the tracker is shut down (final flush)
/// before the task ends.
pub fn spawn_event_loop<H: EditorHost, F: StateFs>(
    tracker: Arc<Tracker<H, F>>,
    mut events: mpsc::Receiver<HostEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if event == HostEvent::Shutdown {
                break;
            }
            tracker.dispatch(event).await;
        }

        debug!("host event loop finished");
        // Failures are logged by the tracker itself.
        if let Ok(outcome) = tracker.shutdown().await {
            info!(?outcome, "final flush complete");
        }
    })
}
