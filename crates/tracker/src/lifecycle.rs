// Application context: owns the position map, the store and the components,
// and routes host lifecycle events to them.
//
// open / layout-ready → restore (one pending restore at a time)
// rename / delete      → reconcile map keys
// timer tick           → flush (dirty-checked)
// shutdown             → stop timer, final flush

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use revisit_common::path::normalize_document_id;
use revisit_common::{DocumentId, ViewportId};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::TrackerConfig;
use crate::fs::{LocalFs, StateFs};
use crate::host::EditorHost;
use crate::observer::{SelectionObserver, SurfaceUpdate};
use crate::recorder::Recorder;
use crate::restore::{RestoreOutcome, RestoreTiming, Restorer};
use crate::store::{FlushOutcome, PositionMap, StateStore, StoreError};

/// Lifecycle notifications from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The host finished building its initial layout.
    LayoutReady,
    /// A document was opened in some viewport.
    Opened,
    Renamed { from: DocumentId, to: DocumentId },
    Deleted(DocumentId),
    ViewportClosed(ViewportId),
    /// Flush now, outside the periodic schedule.
    FlushRequested,
    Shutdown,
}

/// A restore started by an open notification.
#[derive(Debug)]
pub enum ScheduledRestore {
    /// Ended without waiting.
    Skipped(RestoreOutcome),
    /// Waiting out the settle delays in a background task.
    Pending(JoinHandle<RestoreOutcome>),
}

impl ScheduledRestore {
    /// Wait for the final outcome.
    pub async fn outcome(self) -> RestoreOutcome {
        match self {
            Self::Skipped(outcome) => outcome,
            Self::Pending(task) => task.await.unwrap_or(RestoreOutcome::Cancelled),
        }
    }
}

pub struct Tracker<H: EditorHost, F: StateFs = LocalFs> {
    config: TrackerConfig,
    positions: Arc<PositionMap>,
    store: Arc<StateStore<F>>,
    observer: SelectionObserver<H>,
    restorer: Arc<Restorer<H>>,
    pending_restore: Mutex<Option<AbortHandle>>,
    flush_task: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<H: EditorHost, F: StateFs> Tracker<H, F> {
    /// Load the position map from `db_path` and start the periodic flush.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: TrackerConfig, db_path: impl Into<PathBuf>, host: Arc<H>, fs: F) -> Self {
        let store = Arc::new(StateStore::new(fs, db_path));
        let positions = Arc::new(PositionMap::from_map(store.load()));

        let observer =
            SelectionObserver::new(Arc::clone(&host), Recorder::new(Arc::clone(&positions)));
        let restorer = Arc::new(Restorer::new(
            host,
            Arc::clone(&positions),
            RestoreTiming::new(config.open_delay()),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let period = config.save_interval();
        let task = tokio::spawn(flush_loop(
            Arc::clone(&store),
            Arc::clone(&positions),
            period,
            shutdown_rx,
        ));
        info!(
            path = %store.path().display(),
            entries = positions.len(),
            save_interval_ms = period.as_millis() as u64,
            "cursor tracking started"
        );

        Self {
            config,
            positions,
            store,
            observer,
            restorer,
            pending_restore: Mutex::new(None),
            flush_task: Mutex::new(Some(task)),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The working copy.
    pub fn positions(&self) -> &Arc<PositionMap> {
        &self.positions
    }

    pub fn store(&self) -> &StateStore<F> {
        &self.store
    }

    /// Route one host event.
    pub async fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::LayoutReady | HostEvent::Opened => {
                self.on_document_open();
            }
            HostEvent::Renamed { from, to } => {
                self.on_rename(&from, &to);
            }
            HostEvent::Deleted(doc) => {
                self.on_delete(&doc);
            }
            HostEvent::ViewportClosed(viewport) => {
                self.on_viewport_closed(&viewport);
            }
            HostEvent::FlushRequested => {
                let _ = self.flush_now();
            }
            HostEvent::Shutdown => {
                let _ = self.shutdown().await;
            }
        }
    }

    /// Selection/scroll mutation from the editing surface. Synchronous.
    pub fn on_surface_update(&self, update: &SurfaceUpdate<'_>) -> bool {
        self.observer.on_update(update)
    }

    /// Start restoring the newly active document. A still-pending restore
    /// from an earlier open is cancelled once a new one is scheduled.
    pub fn on_document_open(&self) -> ScheduledRestore {
        let pending = match self.restorer.prepare() {
            Ok(pending) => pending,
            Err(outcome) => {
                trace!(?outcome, "restore skipped");
                return ScheduledRestore::Skipped(outcome);
            }
        };

        // Built outside the task so an abort before the first poll still
        // releases the epoch.
        let claim = self.restorer.claim(&pending);
        let restorer = Arc::clone(&self.restorer);
        let task = tokio::spawn(async move {
            let outcome = restorer.complete(pending).await;
            claim.settle();
            outcome
        });
        if let Some(previous) = self.pending_restore().replace(task.abort_handle()) {
            previous.abort();
        }
        ScheduledRestore::Pending(task)
    }

    /// Move the entry for `from` to `to`. Without an entry at `from`
    /// nothing is created at `to`.
    pub fn on_rename(&self, from: &DocumentId, to: &DocumentId) -> bool {
        let (Some(from), Some(to)) = (canonical(from), canonical(to)) else {
            return false;
        };
        self.restorer.rename_document(&from, &to);
        let moved = self.positions.rename(&from, to.clone());
        debug!(from = %from, to = %to, moved, "document renamed");
        moved
    }

    /// Drop the entry for a deleted document, if any.
    pub fn on_delete(&self, doc: &DocumentId) -> bool {
        let Some(doc) = canonical(doc) else {
            return false;
        };
        let removed = self.positions.remove(&doc).is_some();
        debug!(doc = %doc, removed, "document deleted");
        removed
    }

    pub fn on_viewport_closed(&self, viewport: &ViewportId) -> bool {
        self.restorer.forget_viewport(viewport)
    }

    /// Flush the working copy now.
    pub fn flush_now(&self) -> Result<FlushOutcome, StoreError> {
        flush_logged(&self.store, &self.positions, "requested")
    }

    /// Stop the periodic flush, cancel any pending restore and write the
    /// working copy one last time.
    pub async fn shutdown(&self) -> Result<FlushOutcome, StoreError> {
        let _ = self.shutdown_tx.send(true);
        if let Some(previous) = self.pending_restore().take() {
            previous.abort();
        }
        let task = self.flush_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            let _ = task.await;
        }

        let result = flush_logged(&self.store, &self.positions, "shutdown");
        if let Ok(outcome) = &result {
            info!(?outcome, "cursor tracking stopped");
        }
        result
    }

    fn pending_restore(&self) -> MutexGuard<'_, Option<AbortHandle>> {
        self.pending_restore.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: EditorHost, F: StateFs> Drop for Tracker<H, F> {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(previous) = self.pending_restore().take() {
            previous.abort();
        }
    }
}

fn canonical(doc: &DocumentId) -> Option<DocumentId> {
    match normalize_document_id(doc.as_str()) {
        Ok(doc) => Some(doc),
        Err(error) => {
            warn!(doc = %doc, error = %error, "ignoring event for unusable document id");
            None
        }
    }
}

fn flush_logged<F: StateFs>(
    store: &StateStore<F>,
    positions: &PositionMap,
    reason: &'static str,
) -> Result<FlushOutcome, StoreError> {
    let result = store.flush(positions);
    if let Err(error) = &result {
        warn!(reason, error = %error, "failed to persist cursor positions");
    }
    result
}

async fn flush_loop<F: StateFs>(
    store: Arc<StateStore<F>>,
    positions: Arc<PositionMap>,
    period: std::time::Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = flush_logged(&store, &positions, "periodic");
            }
            _ = shutdown_rx.changed() => {
                debug!("flush loop shutting down");
                break;
            }
        }
    }
}
