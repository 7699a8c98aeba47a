//! Shared, identity-bearing asynchronous computations.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::state::ResultState;

/// Identity of one [`Computation`]. Clones share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputationId(u64);

static COMPUTATION_COUNTER: AtomicU64 = AtomicU64::new(1);

impl ComputationId {
    fn next() -> Self {
        ComputationId(COMPUTATION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// An asynchronous computation that settles exactly once with `Ok(T)` or `Err(E)`.
///
/// A `Computation` is cheap to clone; every clone observes the same outcome and
/// has the same [`ComputationId`]. Watchers compare computations by identity,
/// never by value, so hosts should keep handing the *same* computation across
/// passes until the input genuinely changes.
///
/// # Example
///
/// ```
/// use remote_flow::Computation;
///
/// let a: Computation<u32, String> = Computation::ready(1);
/// let b = a.clone();
/// let c: Computation<u32, String> = Computation::ready(1);
///
/// assert!(a.same_as(&b));
/// assert!(!a.same_as(&c));
/// ```
pub struct Computation<T, E> {
    id: ComputationId,
    inner: Shared<BoxFuture<'static, Result<T, E>>>,
}

impl<T, E> Computation<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Wrap a future as a computation.
    ///
    /// The future is not polled until something observes the computation.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            id: ComputationId::next(),
            inner: future.boxed().shared(),
        }
    }

    /// Create a computation that is already settled with `result`.
    pub fn from_result(result: Result<T, E>) -> Self {
        Self::new(future::ready(result))
    }

    /// Create a computation that is already fulfilled.
    pub fn ready(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// Create a computation that has already failed.
    pub fn failed(error: E) -> Self {
        Self::from_result(Err(error))
    }

    /// Create a computation settled later through the returned [`Resolver`].
    ///
    /// Dropping the resolver without settling leaves the computation pending
    /// forever.
    pub fn deferred() -> (Resolver<T, E>, Self) {
        let (tx, rx) = oneshot::channel();
        let computation = Self::new(async move {
            match rx.await {
                Ok(result) => result,
                Err(oneshot::Canceled) => future::pending().await,
            }
        });
        (Resolver { tx }, computation)
    }

    /// Attach the failure-absorbing adapter.
    ///
    /// The returned future never fails: a failure is converted into
    /// [`ResultState::Failure`] carrying the original payload, a fulfillment into
    /// [`ResultState::Success`].
    pub fn settle(self) -> impl Future<Output = ResultState<T, E>> + Send + 'static {
        self.inner.map(ResultState::from)
    }

    /// Await the raw outcome.
    pub async fn outcome(self) -> Result<T, E> {
        self.inner.await
    }

    /// Get the outcome if the computation has already settled.
    ///
    /// A computation only settles once something has polled it to completion,
    /// so even [`Computation::ready`] reads `None` until then.
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.inner.peek().cloned()
    }
}

impl<T, E> Computation<T, E> {
    /// Get the identity of this computation.
    #[inline]
    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Check whether `other` is the same computation (not merely an equal one).
    #[inline]
    pub fn same_as(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Computations compare by identity, so they can be part of a dependency key.
impl<T, E> PartialEq for Computation<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<T, E> Eq for Computation<T, E> {}

impl<T, E> Clone for Computation<T, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Computation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Computation").field(&self.id.0).finish()
    }
}

/// Settles a computation created by [`Computation::deferred`].
pub struct Resolver<T, E> {
    tx: oneshot::Sender<Result<T, E>>,
}

impl<T, E> Resolver<T, E> {
    /// Fulfill the computation with `value`.
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Fail the computation with `error`.
    pub fn reject(self, error: E) {
        self.settle(Err(error));
    }

    /// Settle the computation with `result`.
    ///
    /// Settling a computation nobody holds anymore is a no-op.
    pub fn settle(self, result: Result<T, E>) {
        let _ = self.tx.send(result);
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("abandoned", &self.tx.is_canceled())
            .finish()
    }
}
