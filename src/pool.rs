//! Bounded executor pools providing bulkhead isolation.
//!
//! Each named pool bounds how many commands for one dependency may be in
//! flight at once. Backpressure is expressed as immediate rejection: there is
//! no queue and `try_acquire` never blocks. Every granted ticket is released
//! exactly once, on every exit path, by the `PoolTicket` drop guard.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::circuit::{Circuit, ManualCircuit};

/// Pool capacity used when a command has no explicit pool binding.
pub const DEFAULT_MAX_CONCURRENT: u32 = 10;

/// Executor pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of concurrently held tickets
    pub max_concurrent: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Point-in-time snapshot of a pool's occupancy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    /// Pool name
    pub name: String,
    /// Tickets currently held
    pub active: u32,
    /// Maximum concurrent tickets
    pub max_concurrent: u32,
    /// Whether the owned circuit is open
    pub circuit_open: bool,
}

/// Bounded set of execution tickets for one named dependency.
///
/// Owns the circuit gate consulted at admission. Shared across every command
/// referencing the same name; created once per name through a
/// [`PoolRegistry`](crate::registry::PoolRegistry).
pub struct ExecutorPool {
    name: String,
    max_concurrent: u32,
    active: Arc<AtomicU32>,
    circuit: Arc<dyn Circuit>,
}

impl ExecutorPool {
    /// Create a pool with a fresh closed [`ManualCircuit`].
    pub fn new(name: impl Into<String>, max_concurrent: u32) -> Self {
        Self::with_circuit(name, max_concurrent, Arc::new(ManualCircuit::new()))
    }

    /// Create a pool from a configuration value.
    pub fn with_config(name: impl Into<String>, config: PoolConfig) -> Self {
        Self::new(name, config.max_concurrent)
    }

    /// Create a pool gated by a caller-supplied circuit implementation.
    pub fn with_circuit(
        name: impl Into<String>,
        max_concurrent: u32,
        circuit: Arc<dyn Circuit>,
    ) -> Self {
        Self {
            name: name.into(),
            max_concurrent,
            active: Arc::new(AtomicU32::new(0)),
            circuit,
        }
    }

    /// Pool name (the registry key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The circuit gating admission to this pool.
    pub fn circuit(&self) -> &Arc<dyn Circuit> {
        &self.circuit
    }

    /// Try to take an execution ticket without blocking.
    ///
    /// Succeeds iff the outstanding count is below the maximum, atomically
    /// incrementing it. Returns `None` immediately when the pool is full.
    pub fn try_acquire(&self) -> Option<PoolTicket> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max_concurrent {
                debug!(
                    pool = %self.name,
                    active = current,
                    max = self.max_concurrent,
                    "pool exhausted, rejecting"
                );
                return None;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug!(
                        pool = %self.name,
                        active = current + 1,
                        max = self.max_concurrent,
                        "ticket acquired"
                    );
                    return Some(PoolTicket {
                        pool: self.name.clone(),
                        active: self.active.clone(),
                    });
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Snapshot of current occupancy and circuit state.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            name: self.name.clone(),
            active: self.active.load(Ordering::Acquire),
            max_concurrent: self.max_concurrent,
            circuit_open: self.circuit.is_open(),
        }
    }
}

impl fmt::Debug for ExecutorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorPool")
            .field("name", &self.name)
            .field("max_concurrent", &self.max_concurrent)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish()
    }
}

/// A unit of admitted concurrency within a pool.
///
/// Dropping the ticket releases the slot. The pipeline holds the ticket
/// itself (not the work task), so the slot is returned the moment the
/// pipeline settles the invocation, including at timeout while the work
/// function is still running.
#[derive(Debug)]
pub struct PoolTicket {
    pool: String,
    active: Arc<AtomicU32>,
}

impl Drop for PoolTicket {
    fn drop(&mut self) {
        let before = self.active.fetch_sub(1, Ordering::AcqRel);
        debug!(pool = %self.pool, active = before.saturating_sub(1), "ticket released");
    }
}
