//! Tracer trait for observing watcher and runner lifecycles.
//!
//! This module defines the [`Tracer`] trait and related types for observing
//! epochs, settlements and cancellation. The default [`NoopTracer`] discards
//! everything; [`LogTracer`] forwards events to the `tracing` crate.
//!
//! # Example
//!
//! ```
//! use remote_flow::{EpochId, StateKind, Tracer};
//!
//! struct PrintTracer;
//!
//! impl Tracer for PrintTracer {
//!     fn on_settled(&self, epoch: EpochId, outcome: StateKind) {
//!         println!("{:?} settled: {}", epoch, outcome);
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use futures::task::SpawnError;

use crate::state::StateKind;

/// Identity of one epoch: the scope of a single watched computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpochId(pub u64);

/// Identity of one operation invocation, i.e. one dependency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InvocationId(pub u64);

static EPOCH_COUNTER: AtomicU64 = AtomicU64::new(1);
static INVOCATION_COUNTER: AtomicU64 = AtomicU64::new(1);

impl EpochId {
    pub(crate) fn next() -> Self {
        EpochId(EPOCH_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl InvocationId {
    pub(crate) fn next() -> Self {
        InvocationId(INVOCATION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Tracer trait for observing watcher and runner lifecycles.
///
/// All methods have default empty implementations, so you only need to
/// override the events you're interested in. Tracers are read-only observers:
/// nothing they do can change observable state.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as settlements may be reported from
/// whichever thread the executor polls them on.
pub trait Tracer: Send + Sync + 'static {
    /// Called when a watcher starts observing a new computation.
    #[inline]
    fn on_epoch_start(&self, _epoch: EpochId) {}

    /// Called when the active epoch's computation settles and its state is written.
    #[inline]
    fn on_settled(&self, _epoch: EpochId, _outcome: StateKind) {}

    /// Called when a superseded or torn-down epoch settles and is discarded.
    #[inline]
    fn on_stale_settlement(&self, _epoch: EpochId, _outcome: StateKind) {}

    /// Called when an epoch stops being relevant (replacement or teardown).
    #[inline]
    fn on_teardown(&self, _epoch: EpochId) {}

    /// Called when an operation factory is invoked for a new dependency key.
    #[inline]
    fn on_operation_invoked(&self, _invocation: InvocationId) {}

    /// Called when an invocation's cancellation token is signaled.
    #[inline]
    fn on_cancel_requested(&self, _invocation: InvocationId) {}

    /// Called when the executor refuses the settlement task. The epoch stays
    /// `Loading` until superseded.
    #[inline]
    fn on_spawn_failed(&self, _epoch: EpochId, _error: &SpawnError) {}
}

/// Zero-cost tracer that discards all events.
///
/// This is the default tracer for [`FlowRuntime`](crate::FlowRuntime).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer that forwards every event to the `tracing` crate.
///
/// Lifecycle events are emitted at `debug`, stale settlements at `trace`, and
/// spawn failures at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn on_epoch_start(&self, epoch: EpochId) {
        tracing::debug!(epoch = epoch.0, "epoch started");
    }

    fn on_settled(&self, epoch: EpochId, outcome: StateKind) {
        tracing::debug!(epoch = epoch.0, %outcome, "epoch settled");
    }

    fn on_stale_settlement(&self, epoch: EpochId, outcome: StateKind) {
        tracing::trace!(epoch = epoch.0, %outcome, "discarded stale settlement");
    }

    fn on_teardown(&self, epoch: EpochId) {
        tracing::debug!(epoch = epoch.0, "epoch torn down");
    }

    fn on_operation_invoked(&self, invocation: InvocationId) {
        tracing::debug!(invocation = invocation.0, "operation invoked");
    }

    fn on_cancel_requested(&self, invocation: InvocationId) {
        tracing::debug!(invocation = invocation.0, "cancellation requested");
    }

    fn on_spawn_failed(&self, epoch: EpochId, error: &SpawnError) {
        tracing::warn!(epoch = epoch.0, %error, "executor refused settlement task");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(EpochId::next(), EpochId::next());
        assert_ne!(InvocationId::next(), InvocationId::next());
    }

    #[test]
    fn test_tracer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopTracer>();
        assert_send_sync::<LogTracer>();
        assert_send_sync::<std::sync::Arc<dyn Tracer>>();
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_log_tracer_emits_events() {
        let tracer = LogTracer;
        tracer.on_settled(EpochId(7), StateKind::Failure);
        tracer.on_spawn_failed(EpochId(8), &SpawnError::shutdown());

        assert!(logs_contain("epoch settled"));
        assert!(logs_contain("outcome=failure"));
        assert!(logs_contain("executor refused settlement task"));
    }
}
