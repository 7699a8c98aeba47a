//! Synchronous [`ResultState`] view of a computation the caller already holds.

use std::fmt;
use std::sync::Arc;

use futures::future::{self, AbortHandle, FutureExt};

use crate::cell::{Polled, StateCell, Subscription};
use crate::computation::Computation;
use crate::runtime::FlowRuntime;
use crate::state::ResultState;
use crate::tracer::{EpochId, Tracer};

struct Watched<T, E> {
    computation: Computation<T, E>,
    epoch: EpochId,
    settlement: AbortHandle,
}

/// Watches one computation at a time and reports its [`ResultState`].
///
/// Call [`watch`](Self::watch) on every observation pass. Passing a
/// computation the watcher has not seen before starts a new epoch: the pass
/// reports `Loading` immediately and the settlement is applied later by a task
/// on the runtime's executor. Replacing the computation, passing `None`, or
/// tearing the watcher down retires the epoch: its settlement task is aborted,
/// releasing the watcher's hold on the computation, and a late settlement that
/// still gets through is silently discarded.
///
/// Use this when the computation was started elsewhere; for operations the
/// consumer starts itself, see [`OperationRunner`](crate::OperationRunner).
pub struct PromiseWatcher<T, E> {
    runtime: FlowRuntime,
    cell: StateCell<T, E>,
    watched: Option<Watched<T, E>>,
}

impl<T, E> PromiseWatcher<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a watcher in the `NotAsked` state.
    pub fn new(runtime: FlowRuntime) -> Self {
        Self {
            runtime,
            cell: StateCell::new(),
            watched: None,
        }
    }

    /// Observe `computation` for this pass and return the current state.
    ///
    /// - `None`: `NotAsked`, with no pending subscription left behind.
    /// - the computation already being watched: whatever the cell holds.
    /// - a different computation: `Loading`, and a new epoch begins.
    pub fn watch(&mut self, computation: Option<&Computation<T, E>>) -> ResultState<T, E> {
        let Some(computation) = computation else {
            self.release();
            self.cell.reset();
            return ResultState::NotAsked;
        };

        let is_current = self
            .watched
            .as_ref()
            .is_some_and(|watched| watched.computation.same_as(computation));
        if is_current {
            return self.cell.get();
        }

        self.begin(computation.clone());
        ResultState::Loading
    }

    fn begin(&mut self, computation: Computation<T, E>) {
        let tracer = self.runtime.tracer().clone();

        // Retires the previous epoch under the cell lock before anything else.
        let epoch = self.cell.begin_epoch(ResultState::Loading);
        self.release();
        tracer.on_epoch_start(epoch);

        let settling = computation.clone().settle();
        let cell = self.cell.clone();
        let task_tracer = tracer.clone();
        let task = async move {
            let outcome = settling.await;
            let kind = outcome.kind();
            if cell.settle(epoch, outcome) {
                task_tracer.on_settled(epoch, kind);
            } else {
                task_tracer.on_stale_settlement(epoch, kind);
            }
        };
        let (task, settlement) = future::abortable(task);
        if let Err(error) = self.runtime.spawn(task.map(drop)) {
            tracer.on_spawn_failed(epoch, &error);
        }

        self.watched = Some(Watched {
            computation,
            epoch,
            settlement,
        });
    }

    /// Get the current state without starting or retiring anything.
    ///
    /// This is the read-only diagnostics hook.
    pub fn debug_value(&self) -> ResultState<T, E> {
        self.cell.get()
    }

    /// Get the current state together with its revision.
    pub fn snapshot(&self) -> Polled<ResultState<T, E>> {
        self.cell.snapshot()
    }

    /// Register a callback that runs whenever the state changes.
    ///
    /// Hosts use this to schedule the next observation pass.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cell.subscribe(listener)
    }

    /// Get the epoch currently allowed to settle, if any.
    pub fn active_epoch(&self) -> Option<EpochId> {
        self.watched.as_ref().map(|watched| watched.epoch)
    }
}

impl<T, E> PromiseWatcher<T, E> {
    pub(crate) fn runtime_tracer(&self) -> Arc<dyn Tracer> {
        self.runtime.tracer().clone()
    }

    /// Stop watching. A pending settlement will no longer write to the state.
    ///
    /// The last observed state stays readable. Also runs on drop.
    pub fn teardown(&mut self) {
        if self.release() {
            self.cell.retire();
        }
    }

    /// Abort the watched epoch's settlement task and forget its computation.
    fn release(&mut self) -> bool {
        let Some(previous) = self.watched.take() else {
            return false;
        };
        previous.settlement.abort();
        self.runtime.tracer().on_teardown(previous.epoch);
        true
    }
}

impl<T, E> Drop for PromiseWatcher<T, E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for PromiseWatcher<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseWatcher")
            .field("cell", &self.cell)
            .field(
                "watching",
                &self.watched.as_ref().map(|watched| watched.computation.id()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;

    fn setup() -> (LocalPool, PromiseWatcher<i32, String>) {
        let pool = LocalPool::new();
        let runtime = FlowRuntime::new(pool.spawner());
        let watcher = runtime.watcher();
        (pool, watcher)
    }

    #[test]
    fn test_none_is_not_asked() {
        let (mut pool, mut watcher) = setup();
        assert_eq!(watcher.watch(None), ResultState::NotAsked);
        pool.run_until_stalled();
        assert_eq!(watcher.watch(None), ResultState::NotAsked);
        assert_eq!(watcher.active_epoch(), None);
    }

    #[test]
    fn test_first_observation_is_loading_even_when_ready() {
        let (mut pool, mut watcher) = setup();
        let computation = Computation::ready(1);

        assert_eq!(watcher.watch(Some(&computation)), ResultState::Loading);
        assert_eq!(watcher.watch(Some(&computation)), ResultState::Loading);

        pool.run_until_stalled();
        assert_eq!(watcher.watch(Some(&computation)), ResultState::Success(1));
    }

    #[test]
    fn test_same_computation_keeps_epoch() {
        let (_pool, mut watcher) = setup();
        let computation = Computation::ready(1);

        watcher.watch(Some(&computation));
        let epoch = watcher.active_epoch();
        watcher.watch(Some(&computation.clone()));
        assert_eq!(watcher.active_epoch(), epoch);
    }

    #[test]
    fn test_switch_to_none_resets_state() {
        let (mut pool, mut watcher) = setup();
        let (resolver, computation) = Computation::deferred();

        watcher.watch(Some(&computation));
        assert_eq!(watcher.watch(None), ResultState::NotAsked);

        resolver.resolve(5);
        pool.run_until_stalled();
        assert_eq!(watcher.debug_value(), ResultState::NotAsked);
    }

    #[test]
    fn test_teardown_keeps_last_state() {
        let (mut pool, mut watcher) = setup();
        let (resolver, computation) = Computation::deferred();

        watcher.watch(Some(&computation));
        watcher.teardown();
        assert_eq!(watcher.active_epoch(), None);

        resolver.reject("late".to_string());
        pool.run_until_stalled();
        assert_eq!(watcher.debug_value(), ResultState::Loading);
    }

    #[test]
    fn test_watch_after_teardown_starts_new_epoch() {
        let (mut pool, mut watcher) = setup();
        let computation = Computation::ready(9);

        watcher.watch(Some(&computation));
        watcher.teardown();
        assert_eq!(watcher.watch(Some(&computation)), ResultState::Loading);

        pool.run_until_stalled();
        assert_eq!(watcher.watch(Some(&computation)), ResultState::Success(9));
    }
}
