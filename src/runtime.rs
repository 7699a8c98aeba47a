//! Runtime configuration shared by watchers and runners.

use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;

use futures::task::{Spawn, SpawnError, SpawnExt};

use crate::error::FlowError;
use crate::runner::OperationRunner;
use crate::tracer::{NoopTracer, Tracer};
use crate::watcher::PromiseWatcher;

/// The runtime ties watchers and runners to an executor and a tracer.
///
/// Settlements are always delivered as tasks on the configured executor, never
/// inline, so observing a new computation never blocks. The runtime itself
/// belongs to the host's single rendering thread; the settlement tasks only
/// require `Send` because [`Spawn`] does.
///
/// This is cheap to clone - the executor handle and tracer are shared.
///
/// # Example
///
/// ```
/// use futures::executor::LocalPool;
/// use remote_flow::{Computation, FlowRuntime, LogTracer, ResultState};
///
/// let mut pool = LocalPool::new();
/// let runtime = FlowRuntime::builder()
///     .spawner(pool.spawner())
///     .tracer(LogTracer)
///     .build()
///     .unwrap();
///
/// let mut watcher = runtime.watcher::<u32, String>();
/// let computation = Computation::ready(42);
///
/// assert_eq!(watcher.watch(Some(&computation)), ResultState::Loading);
/// pool.run_until_stalled();
/// assert_eq!(watcher.watch(Some(&computation)), ResultState::Success(42));
/// ```
#[derive(Clone)]
pub struct FlowRuntime {
    spawner: Rc<dyn Spawn>,
    tracer: Arc<dyn Tracer>,
}

impl FlowRuntime {
    /// Create a runtime on `spawner` with the default [`NoopTracer`].
    pub fn new<S: Spawn + 'static>(spawner: S) -> Self {
        Self {
            spawner: Rc::new(spawner),
            tracer: Arc::new(NoopTracer),
        }
    }

    /// Create a builder for customizing the runtime.
    pub fn builder() -> FlowRuntimeBuilder {
        FlowRuntimeBuilder::new()
    }

    /// Get the tracer.
    pub fn tracer(&self) -> &Arc<dyn Tracer> {
        &self.tracer
    }

    /// Create a watcher for computations the caller already holds.
    pub fn watcher<T, E>(&self) -> PromiseWatcher<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        PromiseWatcher::new(self.clone())
    }

    /// Create a runner for operations keyed by a dependency key of type `K`.
    pub fn runner<T, E, K>(&self) -> OperationRunner<T, E, K>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        K: PartialEq,
    {
        OperationRunner::new(self.clone())
    }

    pub(crate) fn spawn<F>(&self, task: F) -> Result<(), SpawnError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawner.spawn(task)
    }
}

impl fmt::Debug for FlowRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRuntime").finish_non_exhaustive()
    }
}

/// Builder for [`FlowRuntime`].
#[derive(Default)]
pub struct FlowRuntimeBuilder {
    spawner: Option<Rc<dyn Spawn>>,
    tracer: Option<Arc<dyn Tracer>>,
}

impl FlowRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the executor that runs settlement tasks. Required.
    pub fn spawner<S: Spawn + 'static>(mut self, spawner: S) -> Self {
        self.spawner = Some(Rc::new(spawner));
        self
    }

    /// Set the tracer for observing lifecycles.
    ///
    /// Defaults to [`NoopTracer`].
    pub fn tracer<T: Tracer>(mut self, tracer: T) -> Self {
        self.tracer = Some(Arc::new(tracer));
        self
    }

    /// Set an already shared tracer.
    pub fn shared_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Build the runtime.
    ///
    /// # Errors
    ///
    /// - `FlowError::MissingSpawner` - no executor was configured
    pub fn build(self) -> Result<FlowRuntime, FlowError> {
        let spawner = self.spawner.ok_or(FlowError::MissingSpawner)?;
        Ok(FlowRuntime {
            spawner,
            tracer: self.tracer.unwrap_or_else(|| Arc::new(NoopTracer)),
        })
    }
}

impl fmt::Debug for FlowRuntimeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRuntimeBuilder")
            .field("spawner", &self.spawner.is_some())
            .field("tracer", &self.tracer.is_some())
            .finish()
    }
}
