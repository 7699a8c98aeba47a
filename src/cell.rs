//! Subscribe/notify cell holding the observable [`ResultState`].
//!
//! The cell is the only place observable state is written. Every write is
//! either the start of a new epoch or the settlement of the active one; a
//! settlement for any other epoch is rejected under the same lock that guards
//! the write, so a stale computation can never overwrite a newer result.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slab::Slab;

use crate::state::ResultState;
use crate::tracer::EpochId;

/// Revision counter type - bumped on every write to a cell.
pub(crate) type RevisionCounter = u64;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Result of reading a cell, containing the value and its revision.
///
/// Compare `revision` with a previously stored one to detect changes without
/// requiring `PartialEq` on the payloads.
#[derive(Debug, Clone)]
pub struct Polled<T> {
    /// The observed value.
    pub value: T,
    /// The revision at which this value was written.
    pub revision: u64,
}

impl<T> Deref for Polled<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

struct CellInner<T, E> {
    state: ResultState<T, E>,
    revision: RevisionCounter,
    /// Epoch allowed to settle; `None` once retired.
    active: Option<EpochId>,
    listeners: Slab<Listener>,
}

impl<T, E> CellInner<T, E> {
    fn write(&mut self, state: ResultState<T, E>) -> Vec<Listener> {
        self.state = state;
        self.revision += 1;
        self.listeners.iter().map(|(_, l)| l.clone()).collect()
    }
}

/// Shared cell holding the current [`ResultState`] of one consumer.
///
/// This is cheap to clone - all clones refer to the same state.
pub(crate) struct StateCell<T, E> {
    inner: Arc<Mutex<CellInner<T, E>>>,
}

impl<T, E> Clone for StateCell<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> StateCell<T, E> {
    /// Create a cell in the `NotAsked` state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellInner {
                state: ResultState::NotAsked,
                revision: 0,
                active: None,
                listeners: Slab::new(),
            })),
        }
    }

    /// Start a new epoch, retiring every earlier one, and write `initial`.
    pub fn begin_epoch(&self, initial: ResultState<T, E>) -> EpochId {
        let epoch = EpochId::next();
        let listeners = {
            let mut inner = self.inner.lock();
            inner.active = Some(epoch);
            inner.write(initial)
        };
        notify(listeners);
        epoch
    }

    /// Write the settlement of `epoch` if it is still active.
    ///
    /// Returns `false`, leaving the state untouched, when `epoch` has been
    /// superseded or retired.
    pub fn settle(&self, epoch: EpochId, state: ResultState<T, E>) -> bool {
        let listeners = {
            let mut inner = self.inner.lock();
            if inner.active != Some(epoch) {
                return false;
            }
            inner.write(state)
        };
        notify(listeners);
        true
    }

    /// Retire the active epoch without writing.
    ///
    /// Returns the retired epoch, if there was one.
    pub fn retire(&self) -> Option<EpochId> {
        self.inner.lock().active.take()
    }

    /// Retire the active epoch and write `NotAsked`.
    ///
    /// Nothing is written when the cell already reads `NotAsked` with no
    /// active epoch.
    pub fn reset(&self) -> Option<EpochId> {
        let (retired, listeners) = {
            let mut inner = self.inner.lock();
            let retired = inner.active.take();
            if retired.is_none() && inner.state.is_not_asked() {
                return None;
            }
            (retired, inner.write(ResultState::NotAsked))
        };
        notify(listeners);
        retired
    }

    /// Register a callback that runs after every state change.
    ///
    /// The callback runs outside the cell's lock, so it may read the cell.
    /// Dropping the returned [`Subscription`] unregisters it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let key = self.inner.lock().listeners.insert(Arc::new(listener));
        let cell: Weak<Mutex<CellInner<T, E>>> = Arc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(cell) = cell.upgrade() {
                    cell.lock().listeners.try_remove(key);
                }
            })),
        }
    }
}

impl<T: Clone, E: Clone> StateCell<T, E> {
    /// Get a clone of the current state.
    pub fn get(&self) -> ResultState<T, E> {
        self.inner.lock().state.clone()
    }

    /// Get the current state together with its revision.
    pub fn snapshot(&self) -> Polled<ResultState<T, E>> {
        let inner = self.inner.lock();
        Polled {
            value: inner.state.clone(),
            revision: inner.revision,
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for StateCell<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StateCell")
            .field("state", &inner.state)
            .field("revision", &inner.revision)
            .field("active", &inner.active)
            .finish()
    }
}

fn notify(listeners: Vec<Listener>) {
    for listener in listeners {
        listener();
    }
}

/// Handle returned by `subscribe`; unsubscribes on drop.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_new_cell_is_not_asked() {
        let cell: StateCell<i32, String> = StateCell::new();
        assert_eq!(cell.get(), ResultState::NotAsked);
        assert_eq!(cell.snapshot().revision, 0);
        assert_eq!(cell.retire(), None);
    }

    #[test]
    fn test_settle_active_epoch() {
        let cell: StateCell<i32, String> = StateCell::new();
        let epoch = cell.begin_epoch(ResultState::Loading);
        assert_eq!(cell.get(), ResultState::Loading);

        assert!(cell.settle(epoch, ResultState::Success(1)));
        assert_eq!(cell.get(), ResultState::Success(1));
        assert_eq!(cell.snapshot().revision, 2);
    }

    #[test]
    fn test_superseded_epoch_is_rejected() {
        let cell: StateCell<i32, String> = StateCell::new();
        let first = cell.begin_epoch(ResultState::Loading);
        let second = cell.begin_epoch(ResultState::Loading);
        assert_ne!(first, second);

        assert!(!cell.settle(first, ResultState::Success(1)));
        assert_eq!(cell.get(), ResultState::Loading);

        assert!(cell.settle(second, ResultState::Success(2)));
        assert_eq!(cell.get(), ResultState::Success(2));
    }

    #[test]
    fn test_retired_epoch_is_rejected() {
        let cell: StateCell<i32, String> = StateCell::new();
        let epoch = cell.begin_epoch(ResultState::Loading);
        let revision = cell.snapshot().revision;

        assert_eq!(cell.retire(), Some(epoch));
        assert!(!cell.settle(epoch, ResultState::Failure("late".into())));
        assert_eq!(cell.get(), ResultState::Loading);
        assert_eq!(cell.snapshot().revision, revision);
    }

    #[test]
    fn test_reset_skips_redundant_write() {
        let cell: StateCell<i32, String> = StateCell::new();
        assert_eq!(cell.reset(), None);
        assert_eq!(cell.snapshot().revision, 0);

        let epoch = cell.begin_epoch(ResultState::Loading);
        assert_eq!(cell.reset(), Some(epoch));
        assert_eq!(cell.get(), ResultState::NotAsked);
        assert_eq!(cell.snapshot().revision, 2);
    }

    #[test]
    fn test_subscription_notifies_until_dropped() {
        let cell: StateCell<i32, String> = StateCell::new();
        let count = Arc::new(AtomicUsize::new(0));

        let subscription = cell.subscribe({
            let count = count.clone();
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        let epoch = cell.begin_epoch(ResultState::Loading);
        cell.settle(epoch, ResultState::Success(3));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        drop(subscription);
        cell.begin_epoch(ResultState::Loading);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_can_read_cell() {
        let cell: StateCell<i32, String> = StateCell::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _subscription = cell.subscribe({
            let cell = cell.clone();
            let seen = seen.clone();
            move || seen.lock().push(cell.get())
        });

        let epoch = cell.begin_epoch(ResultState::Loading);
        cell.settle(epoch, ResultState::Success(5));

        assert_eq!(
            *seen.lock(),
            vec![ResultState::Loading, ResultState::Success(5)]
        );
    }

    #[test]
    fn test_snapshot_revision() {
        let cell: StateCell<i32, String> = StateCell::new();
        let before = cell.snapshot();
        cell.begin_epoch(ResultState::Loading);
        let after = cell.snapshot();

        assert!(after.revision > before.revision);
        assert!(after.is_loading());
    }
}
