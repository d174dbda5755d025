//! cordon - fault isolation for unreliable dependencies
//!
//! Wraps each call site to a slow, failing, or overloaded dependency in a
//! *protected command*: a work function with an optional fallback, a
//! per-dependency concurrency bound (bulkhead), a timeout, and a manually
//! gated circuit. When the dependency degrades, callers get a cheap fallback
//! result instead of blocking indefinitely or exhausting shared capacity.
//!
//! ```
//! use cordon::Command;
//!
//! # tokio_test::block_on(async {
//! let result = Command::new(|tx| async move {
//!     let _ = tx.send(Ok(42)).await;
//! })
//! .with_fallback(|_err| async move { Ok(0) })
//! .execute()
//! .await;
//!
//! assert_eq!(result, Ok(42));
//! # });
//! ```
//!
//! Commands sharing a dependency bind to one [`ExecutorPool`] obtained from a
//! [`PoolRegistry`], so a saturated dependency rejects surplus commands
//! immediately instead of queueing them, and an open [`Circuit`] short-circuits
//! them before any ticket is taken.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Circuit gate consulted at admission
pub mod circuit;

/// Protected command pipeline and entry points
pub mod command;

/// Error taxonomy
pub mod error;

/// One-shot result handle for queued commands
pub mod future;

/// Bounded executor pools (bulkheads)
pub mod pool;

/// Name-keyed pool registry
pub mod registry;

pub use circuit::{Circuit, ManualCircuit};
pub use command::{Command, CommandResult, ResultSender, DEFAULT_POOL_NAME, DEFAULT_TIMEOUT};
pub use error::CommandError;
pub use future::CommandFuture;
pub use pool::{ExecutorPool, PoolConfig, PoolStats, PoolTicket, DEFAULT_MAX_CONCURRENT};
pub use registry::PoolRegistry;
