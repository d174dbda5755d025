//! Circuit gate for admission control.
//!
//! The gate is a manually-driven boolean: external health monitors (or tests)
//! flip it with `set_open`, and the command pipeline consults it once per
//! execution attempt, before ticket acquisition. The trait seam exists so a
//! metric-driven breaker with automatic transitions could satisfy the same
//! contract later without touching the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Admission gate consulted before a command may acquire a pool ticket.
///
/// While open, no command bound to the owning pool may run its work function.
pub trait Circuit: Send + Sync {
    /// Whether the gate currently rejects admissions.
    fn is_open(&self) -> bool;

    /// Open or close the gate.
    fn set_open(&self, open: bool);
}

/// Externally-driven circuit with no automatic transition logic.
///
/// Starts closed. Reads vastly outnumber writes, so the state is a single
/// atomic flag with no coupling to the pool's ticket counter.
#[derive(Debug, Default)]
pub struct ManualCircuit {
    open: AtomicBool,
}

impl ManualCircuit {
    /// Create a closed circuit.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Circuit for ManualCircuit {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn set_open(&self, open: bool) {
        let was = self.open.swap(open, Ordering::AcqRel);
        if was != open {
            debug!(open, "circuit state changed");
        }
    }
}
