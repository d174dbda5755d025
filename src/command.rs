//! Protected command execution pipeline.
//!
//! A command binds a work function to an executor pool, a timeout and an
//! optional fallback, then runs the admission pipeline: circuit check →
//! ticket acquisition → timed run → fallback routing. The same pipeline backs
//! the blocking (`execute`) and future-based (`queue`) entry points; the
//! streaming entry point (`observe`) uses separate close-terminated
//! machinery because its completion semantics differ.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CommandError;
use crate::future::CommandFuture;
use crate::pool::{ExecutorPool, PoolConfig};

/// Timeout applied when a command has no explicit override.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Name given to the private pool of commands with no pool binding.
pub const DEFAULT_POOL_NAME: &str = "default";

/// Outcome of one command invocation: a payload or exactly one error.
pub type CommandResult<T> = Result<T, CommandError>;

/// Conduit handed to a work function for delivering its results.
///
/// Emit one result for `execute`/`queue`, or any number for `observe`;
/// dropping the sender signals completion.
pub type ResultSender<T> = mpsc::Sender<CommandResult<T>>;

type WorkFn<T> = Box<dyn FnOnce(ResultSender<T>) -> BoxFuture<'static, ()> + Send>;
type FallbackFn<T> = Box<dyn FnOnce(CommandError) -> BoxFuture<'static, CommandResult<T>> + Send>;
type ObserverFn<T> = Box<dyn FnMut(CommandResult<T>) + Send>;

// Buffer for the observe conduit; items are forwarded in order regardless.
const OBSERVE_BUFFER: usize = 16;

/// A unit of protected work against one dependency.
///
/// Immutable once invoked; pool, timeout, fallback and observer are set by
/// the consuming builder-style methods before the first (and only)
/// invocation. With no pool binding the command runs against a private pool
/// built from [`PoolConfig::default`], so bulkhead sharing is always an
/// explicit choice made through a registry.
pub struct Command<T> {
    work: WorkFn<T>,
    fallback: Option<FallbackFn<T>>,
    observer: Option<ObserverFn<T>>,
    pool: Option<Arc<ExecutorPool>>,
    timeout: Duration,
}

impl<T: Send + 'static> Command<T> {
    /// Create a command around a work function.
    ///
    /// The work function receives a [`ResultSender`] and runs on its own
    /// spawned task; it is never forcibly cancelled, not even on timeout.
    pub fn new<F, Fut>(work: F) -> Self
    where
        F: FnOnce(ResultSender<T>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        Self {
            work: Box::new(move |tx| work(tx).boxed()),
            fallback: None,
            observer: None,
            pool: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configure a fallback invoked with the triggering error when the
    /// primary path fails, times out, or is rejected at admission.
    pub fn with_fallback<F, Fut>(mut self, fallback: F) -> Self
    where
        F: FnOnce(CommandError) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = CommandResult<T>> + Send + 'static,
    {
        self.fallback = Some(Box::new(move |err| fallback(err).boxed()));
        self
    }

    /// Bind the command to a shared executor pool.
    pub fn with_pool(mut self, pool: Arc<ExecutorPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Override the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the callback receiving each item of an observed stream.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(CommandResult<T>) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run the pipeline and wait for the final result.
    pub async fn execute(self) -> CommandResult<T> {
        self.run_pipeline().await
    }

    /// Run the pipeline on a background task and return a future handle
    /// resolving to the same result `execute` would have produced.
    pub fn queue(self) -> CommandFuture<T> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = self.run_pipeline().await;
            let _ = tx.send(result);
        });
        CommandFuture::new(rx)
    }

    /// Consume a multi-valued work function as a stream.
    ///
    /// Spawns the work function and a consumer that forwards each emitted
    /// item to the observer callback, in emission order, until the work
    /// function drops its sender. Returns without blocking; the handle
    /// completes when the stream does. With no observer configured the
    /// stream is still drained.
    ///
    /// This path is deliberately not gated by the circuit, the pool, or the
    /// timeout: streams are close-terminated, not race-terminated.
    pub fn observe(self) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::channel(OBSERVE_BUFFER);
        tokio::spawn((self.work)(tx));

        let mut observer = self.observer;
        tokio::spawn(async move {
            let mut delivered = 0usize;
            while let Some(item) = rx.recv().await {
                if let Some(callback) = observer.as_mut() {
                    callback(item);
                }
                delivered += 1;
            }
            debug!(delivered, "observed stream completed");
        })
    }

    /// Shared pipeline behind `execute` and `queue`.
    async fn run_pipeline(self) -> CommandResult<T> {
        let pool = self
            .pool
            .unwrap_or_else(|| Arc::new(ExecutorPool::with_config(DEFAULT_POOL_NAME, PoolConfig::default())));

        let trigger = match Self::attempt(self.work, &pool, self.timeout).await {
            Ok(value) => return Ok(value),
            Err(trigger) => trigger,
        };

        match self.fallback {
            Some(fallback) => {
                debug!(pool = %pool.name(), %trigger, "routing to fallback");
                match fallback(trigger).await {
                    Ok(value) => Ok(value),
                    // A failed fallback is terminal; it is never re-routed.
                    Err(err) if err.is_trigger() => Err(CommandError::Fallback(err.to_string())),
                    Err(terminal) => Err(terminal),
                }
            }
            None => Err(trigger),
        }
    }

    /// Admission and timed run: circuit check, ticket acquisition, then the
    /// work function raced against the timeout.
    async fn attempt(
        work: WorkFn<T>,
        pool: &Arc<ExecutorPool>,
        timeout: Duration,
    ) -> CommandResult<T> {
        if pool.circuit().is_open() {
            warn!(pool = %pool.name(), "circuit open, command rejected");
            return Err(CommandError::CircuitOpen(pool.name().to_string()));
        }

        let ticket = match pool.try_acquire() {
            Some(ticket) => ticket,
            None => {
                warn!(pool = %pool.name(), "pool exhausted, command rejected");
                return Err(CommandError::PoolExhausted(pool.name().to_string()));
            }
        };

        let (tx, mut rx) = mpsc::channel(1);
        let worker = tokio::spawn(work(tx));

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(result)) => {
                drop(ticket);
                result
            }
            Ok(None) => {
                drop(ticket);
                Err(CommandError::run("work function completed without a result"))
            }
            Err(_elapsed) => {
                // Release the slot now, not when the straggler finishes.
                drop(ticket);
                warn!(pool = %pool.name(), timeout_ms = timeout.as_millis() as u64, "command timed out");

                // The work task is not cancelled. Drain its eventual output
                // so its sends never wedge and the task can terminate.
                tokio::spawn(async move {
                    while rx.recv().await.is_some() {}
                    let _ = worker.await;
                    debug!("late work function drained after timeout");
                });

                Err(CommandError::Timeout(timeout.as_millis() as u64))
            }
        }
    }
}
