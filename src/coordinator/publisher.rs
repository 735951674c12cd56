//! Holds the published snapshot and fans updates out to consumers.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::coordinator::state::CycleState;
use crate::model::Snapshot;

/// Callback invoked once per published snapshot.
pub(crate) type UpdateListener = Arc<dyn Fn(Arc<Snapshot>) + Send + Sync>;

/// Shared between the coordinator handle and its poll loop.
///
/// Readers always see a whole snapshot: publishing swaps one `Arc` for
/// another and never mutates a snapshot in place.
pub(crate) struct Publisher {
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    state_tx: watch::Sender<CycleState>,
    listeners: Mutex<Vec<UpdateListener>>,
}

impl Publisher {
    pub(crate) fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(Snapshot::default()));
        let (state_tx, _) = watch::channel(CycleState::Idle);
        Self {
            snapshot_tx,
            state_tx,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub(crate) fn state(&self) -> CycleState {
        *self.state_tx.borrow()
    }

    pub(crate) fn subscribe_state(&self) -> watch::Receiver<CycleState> {
        self.state_tx.subscribe()
    }

    pub(crate) fn set_state(&self, state: CycleState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::trace!(from = %previous, to = %state, "Cycle state changed");
        }
    }

    /// Listeners run on the poll task. One added during a publish is first
    /// called on the next publish.
    pub(crate) fn add_listener(&self, listener: UpdateListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Replaces the current snapshot and notifies every listener once.
    pub(crate) fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        self.set_state(CycleState::Publishing);

        let snapshot = Arc::new(snapshot);
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));

        let listeners: Vec<UpdateListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(Arc::clone(&snapshot));
        }

        self.set_state(CycleState::Idle);
        snapshot
    }
}
