//! Transaction bookkeeping around the concurrency manager
//!
//! The coordinator owns the [`TransactionManager`] and counts transactions
//! as they start and finish. Shutdown uses the in-flight count to wait for
//! open transactions; the rest is reported through [`TransactionMetrics`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chronodb_concurrency::{TransactionContext, TransactionManager};
use chronodb_core::traits::{SnapshotView, Storage};
use chronodb_core::{Error, Result};
use chronodb_durability::wal::WAL;
use tracing::{debug, warn};

#[derive(Clone, Copy)]
enum Outcome {
    Committed,
    Aborted,
}

#[derive(Default)]
struct Counters {
    in_flight: AtomicU64,
    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
}

impl Counters {
    fn start(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self, outcome: Outcome) {
        // Saturating: a manual abort of a never-counted context must not wrap
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        let counter = match outcome {
            Outcome::Committed => &self.committed,
            Outcome::Aborted => &self.aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Starts, commits and counts transactions for one database
pub struct TransactionCoordinator {
    manager: TransactionManager,
    counters: Counters,
}

impl TransactionCoordinator {
    /// Coordinator whose first commit gets `initial_version + 1`
    pub fn new(initial_version: u64) -> Self {
        Self {
            manager: TransactionManager::new(initial_version),
            counters: Counters::default(),
        }
    }

    /// Open a transaction on `snapshot`
    pub fn start_transaction(&self, snapshot: Box<dyn SnapshotView>) -> TransactionContext {
        let txn = self.manager.begin(snapshot);
        self.counters.start();
        debug!(target: "chronodb::txn", txn_id = txn.txn_id, start_version = txn.start_version, "Transaction started");
        txn
    }

    /// Validate, log and apply `txn`, returning its commit version
    ///
    /// A read-set conflict comes back as `Error::TransactionAborted`.
    pub fn commit(
        &self,
        txn: &mut TransactionContext,
        store: &dyn Storage,
        wal: Option<&WAL>,
    ) -> Result<u64> {
        let outcome = self.manager.commit(txn, store, wal);
        match outcome {
            Ok(version) => {
                self.counters.finish(Outcome::Committed);
                Ok(version)
            }
            Err(e) => {
                self.counters.finish(Outcome::Aborted);
                warn!(target: "chronodb::txn", txn_id = txn.txn_id, error = %e, "Commit rejected");
                Err(Error::from(e))
            }
        }
    }

    /// Count a transaction that was abandoned before commit
    pub fn record_abort(&self) {
        self.counters.finish(Outcome::Aborted);
    }

    /// Latest committed version
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Snapshot of the counters
    pub fn metrics(&self) -> TransactionMetrics {
        TransactionMetrics {
            active: self.active_count(),
            started: self.counters.started.load(Ordering::Relaxed),
            committed: self.counters.committed.load(Ordering::Relaxed),
            aborted: self.counters.aborted.load(Ordering::Relaxed),
        }
    }

    /// Transactions started but not yet finished
    pub fn active_count(&self) -> u64 {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Block until no transaction is in flight
    ///
    /// Returns false if some were still open when `timeout` ran out.
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.active_count() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Transaction counters of one database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionMetrics {
    /// Open right now
    pub active: u64,
    /// Opened since the database was opened
    pub started: u64,
    /// Committed
    pub committed: u64,
    /// Rejected at commit or abandoned
    pub aborted: u64,
}

impl TransactionMetrics {
    /// Committed plus aborted
    pub fn finished(&self) -> u64 {
        self.committed + self.aborted
    }

    /// Fraction of started transactions that aborted
    pub fn abort_rate(&self) -> f64 {
        match self.started {
            0 => 0.0,
            started => self.aborted as f64 / started as f64,
        }
    }
}
