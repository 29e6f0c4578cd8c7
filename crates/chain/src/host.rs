//! Serialized, all-or-nothing execution host.
//!
//! A [`Host`] owns the ledger and runs each unit of work against a staged
//! copy. The staged copy replaces the committed ledger only when the unit
//! returns `Ok`; any `Err` drops it, so no partial mutation ever survives
//! an aborted unit. The ledger lock is held for the whole unit, which
//! serializes units globally.

use parking_lot::Mutex;
use tracing::debug;

use crate::ledger::Ledger;

/// Execution host with staged-commit semantics.
#[derive(Debug, Default)]
pub struct Host {
    ledger: Mutex<Ledger>,
}

impl Host {
    /// Create a host over an initial ledger state.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }

    /// Run one atomic unit.
    ///
    /// `f` sees a staged copy of the ledger. On `Ok` the copy is committed;
    /// on `Err` it is discarded and the committed ledger is untouched.
    pub fn execute<T, E>(&self, f: impl FnOnce(&mut Ledger) -> Result<T, E>) -> Result<T, E> {
        let mut committed = self.ledger.lock();
        let mut staged = committed.clone();

        match f(&mut staged) {
            Ok(value) => {
                debug!(
                    calls = staged.trace().len().saturating_sub(committed.trace().len()),
                    "[HOST] Unit committed"
                );
                *committed = staged;
                Ok(value)
            }
            Err(err) => {
                debug!("[HOST] Unit rolled back");
                Err(err)
            }
        }
    }

    /// Read the committed ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.ledger.lock())
    }

    /// Mutate the committed ledger directly (setup and clock control).
    pub fn setup<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(&mut self.ledger.lock())
    }

    /// Advance the block timestamp.
    pub fn advance_time(&self, seconds: u64) {
        let mut ledger = self.ledger.lock();
        let now = ledger.timestamp().saturating_add(seconds);
        ledger.set_timestamp(now);
    }
}
