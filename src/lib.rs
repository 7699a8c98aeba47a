//! Remote-Flow: race-free `RemoteData` views of asynchronous computations.
//!
//! Reactive hosts re-evaluate their views on every pass and need a synchronous
//! answer to "what does this computation look like right now?". This crate
//! turns a future into a [`ResultState`] (`NotAsked`, `Loading`, `Success`,
//! `Failure`) that can be read on every pass, and guarantees that only the
//! newest computation ever writes to it.
//!
//! # Key Features
//!
//! - **Epoch guard**: a settlement is written only while its computation is
//!   still the one being watched; replaced or torn-down computations are ignored
//! - **Failures as data**: a failing computation becomes `Failure(error)` with
//!   the payload untouched, never a panic or a lost error
//! - **Dependency-keyed operations**: [`OperationRunner`] invokes an operation
//!   once per dependency key and cancels the previous invocation's
//!   [`CancellationToken`] (re-exported from `tokio-util`; no tokio runtime
//!   is needed to await it)
//! - **Executor-agnostic**: settlements run as tasks on any [`futures::task::Spawn`]
//!
//! # Example
//!
//! ```
//! use futures::executor::LocalPool;
//! use remote_flow::{Computation, FlowRuntime, ResultState};
//!
//! let mut pool = LocalPool::new();
//! let runtime = FlowRuntime::new(pool.spawner());
//! let mut watcher = runtime.watcher::<u32, String>();
//!
//! let (resolver, computation) = Computation::deferred();
//! assert_eq!(watcher.watch(Some(&computation)), ResultState::Loading);
//!
//! resolver.reject("boom".to_string());
//! pool.run_until_stalled();
//! assert_eq!(
//!     watcher.watch(Some(&computation)),
//!     ResultState::Failure("boom".to_string())
//! );
//! ```
//!
//! # Observability
//!
//! Lifecycle events (epoch start, settlement, stale settlement, cancellation)
//! go to a [`Tracer`]. The default [`NoopTracer`] discards them; [`LogTracer`]
//! forwards them to the `tracing` crate.

#![warn(missing_docs)]

mod cell;
mod computation;
mod deps;
mod error;
mod runner;
mod runtime;
mod state;
pub mod tracer;
mod watcher;

pub use cell::{Polled, Subscription};
pub use computation::{Computation, ComputationId, Resolver};
pub use deps::ByIdentity;
pub use error::{FlowError, Unsettled};
pub use runner::{NoOperation, OperationOutput, OperationRunner};
pub use runtime::{FlowRuntime, FlowRuntimeBuilder};
pub use state::{ResultState, StateKind};
pub use tracer::{EpochId, InvocationId, LogTracer, NoopTracer, Tracer};
pub use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
pub use watcher::PromiseWatcher;
