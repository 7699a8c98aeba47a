//! Dependency-keyed, cancellable operations.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::cell::{Polled, Subscription};
use crate::computation::Computation;
use crate::runtime::FlowRuntime;
use crate::state::ResultState;
use crate::tracer::InvocationId;
use crate::watcher::PromiseWatcher;

/// What an operation factory hands back.
///
/// - `Ok(Some(computation))` - the work was started.
/// - `Ok(None)` - the operation short-circuited; the state is `NotAsked`.
/// - `Err(error)` - the factory failed before producing a computation; the
///   error surfaces as `Failure(error)` exactly like a later failure would.
pub type OperationOutput<T, E> = Result<Option<Computation<T, E>>, E>;

/// Operation type for passes that have no operation to run.
pub type NoOperation<T, E> = fn(CancellationToken) -> OperationOutput<T, E>;

struct Invocation<T, E, K> {
    id: InvocationId,
    deps: K,
    token: CancellationToken,
    computation: Option<Computation<T, E>>,
}

/// Runs an operation once per dependency key and watches what it returns.
///
/// Call [`run`](Self::run) on every observation pass with the operation and
/// its dependency key. The operation is invoked synchronously, during the pass
/// that sees a key different (by `PartialEq`) from the previous one, with a
/// fresh [`CancellationToken`]; the previous invocation's token is cancelled
/// first. Passes with an equal key never re-invoke the operation.
///
/// Cancellation is advisory. A superseded computation keeps running unless
/// the operation honours its token, but its settlement is never observed.
///
/// # Example
///
/// ```
/// use futures::executor::LocalPool;
/// use remote_flow::{CancellationToken, Computation, FlowRuntime, OperationOutput, ResultState};
///
/// fn double(id: u32) -> impl FnOnce(CancellationToken) -> OperationOutput<u32, String> {
///     move |_token| Ok(Some(Computation::ready(id * 2)))
/// }
///
/// let mut pool = LocalPool::new();
/// let runtime = FlowRuntime::new(pool.spawner());
/// let mut runner = runtime.runner::<u32, String, (u32,)>();
///
/// assert_eq!(runner.run(Some(double(1)), (1,)), ResultState::Loading);
/// pool.run_until_stalled();
/// assert_eq!(runner.run(Some(double(1)), (1,)), ResultState::Success(2));
/// ```
pub struct OperationRunner<T, E, K> {
    watcher: PromiseWatcher<T, E>,
    current: Option<Invocation<T, E, K>>,
}

impl<T, E, K> OperationRunner<T, E, K>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    K: PartialEq,
{
    /// Create a runner in the `NotAsked` state.
    pub fn new(runtime: FlowRuntime) -> Self {
        Self {
            watcher: PromiseWatcher::new(runtime),
            current: None,
        }
    }

    /// Run `operation` for `deps` and return the current state.
    ///
    /// With `operation == None` nothing is invoked and the state is `NotAsked`
    /// whatever the key; the key still scopes a token, so a later pass with an
    /// operation and the same key will not invoke it either.
    pub fn run<F>(&mut self, operation: Option<F>, deps: K) -> ResultState<T, E>
    where
        F: FnOnce(CancellationToken) -> OperationOutput<T, E>,
    {
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|invocation| invocation.deps == deps);
        if !is_current {
            self.invoke(operation, deps);
        }

        let computation = self
            .current
            .as_ref()
            .and_then(|invocation| invocation.computation.as_ref());
        self.watcher.watch(computation)
    }

    /// Run a pass without an operation. Always `NotAsked`.
    pub fn run_none(&mut self, deps: K) -> ResultState<T, E> {
        self.run(None::<NoOperation<T, E>>, deps)
    }

    fn invoke<F>(&mut self, operation: Option<F>, deps: K)
    where
        F: FnOnce(CancellationToken) -> OperationOutput<T, E>,
    {
        let tracer = self.watcher.runtime_tracer();
        let id = InvocationId::next();
        let token = CancellationToken::new();

        if let Some(previous) = self.current.take() {
            previous.token.cancel();
            tracer.on_cancel_requested(previous.id);
        }

        let computation = operation.and_then(|operation| {
            tracer.on_operation_invoked(id);
            operation(token.clone()).unwrap_or_else(|error| Some(Computation::failed(error)))
        });

        self.current = Some(Invocation {
            id,
            deps,
            token,
            computation,
        });
    }

    /// Get the current state without invoking or cancelling anything.
    ///
    /// This is the read-only diagnostics hook.
    pub fn debug_value(&self) -> ResultState<T, E> {
        self.watcher.debug_value()
    }

    /// Get the current state together with its revision.
    pub fn snapshot(&self) -> Polled<ResultState<T, E>> {
        self.watcher.snapshot()
    }

    /// Register a callback that runs whenever the state changes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.watcher.subscribe(listener)
    }

    /// Get the token of the current invocation, if any.
    pub fn token(&self) -> Option<&CancellationToken> {
        self.current.as_ref().map(|invocation| &invocation.token)
    }

    /// Get the watcher driving the state.
    pub fn watcher(&self) -> &PromiseWatcher<T, E> {
        &self.watcher
    }
}

impl<T, E, K> OperationRunner<T, E, K> {
    /// Cancel the current invocation and stop watching its computation.
    ///
    /// Also runs on drop. A later [`run`](Self::run) invokes the operation
    /// again, even with an unchanged key.
    pub fn teardown(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.token.cancel();
            self.watcher.runtime_tracer().on_cancel_requested(previous.id);
        }
        self.watcher.teardown();
    }
}

impl<T, E, K> Drop for OperationRunner<T, E, K> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T: fmt::Debug, E: fmt::Debug, K: fmt::Debug> fmt::Debug for OperationRunner<T, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRunner")
            .field("watcher", &self.watcher)
            .field("deps", &self.current.as_ref().map(|invocation| &invocation.deps))
            .finish()
    }
}
