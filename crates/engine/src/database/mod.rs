//! A database directory brought to life
//!
//! [`Database`] ties the storage map, the write-ahead log and the
//! transaction coordinator together. Opening replays the log into storage;
//! dropping or [`Database::shutdown`] flushes it.
//!
//! Writes go through `transaction(|txn| ...)`, which commits when the
//! closure returns `Ok` and discards the batch otherwise. The manual pair
//! `begin_transaction` / `commit_transaction` exists for callers that need
//! to interleave their own work. Readers take a `snapshot()`, which never
//! waits on writers.

pub mod config;
mod registry;
mod transactions;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use registry::OPEN_DATABASES;
pub use transactions::RetryConfig;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use chronodb_concurrency::TransactionContext;
use chronodb_core::{Error, Result, Storage};
use chronodb_durability::wal::{DurabilityMode, WAL};
use chronodb_durability::{replay_wal, ReplayStats};
use chronodb_storage::{ClonedSnapshotView, UnifiedStore};
use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::coordinator::{TransactionCoordinator, TransactionMetrics};

/// Name of the log file inside a data directory
pub const WAL_FILE_NAME: &str = "chronodb.wal";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Transactional key-value database over one directory, or memory only
///
/// ```no_run
/// use chronodb_engine::Database;
///
/// let db = Database::open("orders-data")?;
/// db.transaction(|txn| txn.put(b"greeting".to_vec(), b"hello".to_vec()))?;
/// # Ok::<(), chronodb_core::Error>(())
/// ```
pub struct Database {
    /// Canonical directory, empty in memory
    data_dir: PathBuf,
    storage: Arc<UnifiedStore>,
    /// Absent in memory
    wal: Option<Arc<WAL>>,
    coordinator: TransactionCoordinator,
    durability_mode: DurabilityMode,
    config: StoreConfig,
    /// False once `shutdown()` ran
    open: AtomicBool,
    syncer: Syncer,
    /// Exclusive `flock` on `<dir>/.lock`
    _dir_lock: Option<File>,
}

impl Database {
    /// Open the directory at `path`, replaying its log
    ///
    /// Settings come from `chronodb.toml`, which is created with defaults
    /// when absent. Within one process every open of the same directory
    /// yields the same `Arc`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let dir = path.as_ref();
        std::fs::create_dir_all(dir)?;
        let settings = dir.join(CONFIG_FILE_NAME);
        StoreConfig::write_default_if_missing(&settings)?;
        let config = StoreConfig::from_file(&settings)?;
        Self::open_dir(dir, config)
    }

    /// Open with `config`, saving it as the directory's `chronodb.toml`
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Arc<Self>> {
        config.durability_mode()?;
        let dir = path.as_ref();
        std::fs::create_dir_all(dir)?;
        config.write_to_file(&dir.join(CONFIG_FILE_NAME))?;
        Self::open_dir(dir, config)
    }

    fn open_dir(dir: &Path, config: StoreConfig) -> Result<Arc<Self>> {
        let durability_mode = config.durability_mode()?;
        let dir = dir.canonicalize()?;

        // Locked until registered so concurrent opens agree on one instance
        let mut open = OPEN_DATABASES.lock();
        if let Some(existing) = open.get(&dir).and_then(Weak::upgrade) {
            debug!(target: "chronodb::db", path = ?dir, "Reusing open database");
            return Ok(existing);
        }

        let dir_lock = lock_directory(&dir)?;
        let mut wal = WAL::open(dir.join(WAL_FILE_NAME), durability_mode)?;
        let storage = UnifiedStore::new();
        let stats: ReplayStats = replay_wal(wal.take_recovered(), &storage)?;

        info!(
            target: "chronodb::db",
            path = ?dir,
            durability = %durability_mode,
            batches_replayed = stats.batches_applied,
            writes_applied = stats.writes_applied,
            deletes_applied = stats.deletes_applied,
            final_version = stats.final_version,
            "Database opened"
        );

        let wal = Arc::new(wal);
        let syncer = Syncer::start(durability_mode, &wal)?;
        let db = Arc::new(Database {
            data_dir: dir.clone(),
            coordinator: TransactionCoordinator::new(storage.current_version()),
            storage: Arc::new(storage),
            wal: Some(wal),
            durability_mode,
            config,
            open: AtomicBool::new(true),
            syncer,
            _dir_lock: Some(dir_lock),
        });
        open.insert(dir, Arc::downgrade(&db));
        Ok(db)
    }

    /// Memory-only database
    ///
    /// Touches no files and is never shared: every call is a fresh, empty
    /// instance whose contents vanish with the last handle.
    pub fn cache() -> Result<Arc<Self>> {
        Ok(Arc::new(Database {
            data_dir: PathBuf::new(),
            storage: Arc::new(UnifiedStore::new()),
            wal: None,
            coordinator: TransactionCoordinator::new(0),
            durability_mode: DurabilityMode::Cache,
            config: StoreConfig::with_durability(DurabilityMode::Cache.name()),
            open: AtomicBool::new(true),
            syncer: Syncer::idle(),
            _dir_lock: None,
        }))
    }

    /// True for memory-only databases
    pub fn is_cache(&self) -> bool {
        self.wal.is_none()
    }

    /// Canonical directory; empty in memory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Settings in effect
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Sync policy in effect
    pub fn durability_mode(&self) -> DurabilityMode {
        self.durability_mode
    }

    /// Version of the newest commit
    pub fn current_version(&self) -> u64 {
        self.coordinator.current_version()
    }

    /// Transaction counts so far
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    /// False after `shutdown()`
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Read view frozen at the current version
    pub fn snapshot(&self) -> ClonedSnapshotView {
        self.storage.create_snapshot()
    }

    /// Sync the log to disk; nothing to do in memory
    pub fn flush(&self) -> Result<()> {
        let Some(wal) = &self.wal else {
            return Ok(());
        };
        wal.fsync()?;
        debug!(target: "chronodb::db", wal_bytes = wal.size(), "WAL synced");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::InvalidOperation("database is shut down".into()));
        }
        Ok(())
    }

    /// Run `f` in a transaction and commit what it wrote
    ///
    /// An `Err` from `f` discards the writes and is returned as is. A
    /// concurrent change to something `f` read fails the commit with
    /// `Error::TransactionAborted`.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TransactionContext) -> Result<T>,
    {
        self.transaction_with_version(f).map(|(value, _)| value)
    }

    /// [`Database::transaction`], also returning the commit version
    pub fn transaction_with_version<F, T>(&self, f: F) -> Result<(T, u64)>
    where
        F: FnOnce(&mut TransactionContext) -> Result<T>,
    {
        self.ensure_open()?;
        let mut txn = self.begin_transaction();
        let value = match f(&mut txn) {
            Ok(value) => value,
            Err(e) => {
                self.abort_transaction(&mut txn, &e.to_string());
                return Err(e);
            }
        };
        let version = self.commit_transaction(&mut txn)?;
        Ok((value, version))
    }

    /// [`Database::transaction`], rerunning `f` after conflicts
    ///
    /// Gives up after `config.max_retries` reruns; other errors end it at
    /// once.
    pub fn transaction_with_retry<F, T>(&self, config: RetryConfig, f: F) -> Result<T>
    where
        F: Fn(&mut TransactionContext) -> Result<T>,
    {
        for attempt in 0..config.max_retries {
            match self.transaction(&f) {
                Err(e) if e.is_conflict() => {
                    debug!(target: "chronodb::txn", attempt, "Retrying after conflict");
                    std::thread::sleep(config.delay_for(attempt));
                }
                outcome => return outcome,
            }
        }
        self.transaction(&f)
    }

    /// Open a transaction to finish by hand
    ///
    /// Pair it with `commit_transaction` or `abort_transaction`.
    pub fn begin_transaction(&self) -> TransactionContext {
        self.coordinator
            .start_transaction(Box::new(self.storage.create_snapshot()))
    }

    /// Commit `txn` and return its version
    pub fn commit_transaction(&self, txn: &mut TransactionContext) -> Result<u64> {
        let wal = self
            .wal
            .as_deref()
            .filter(|_| self.durability_mode.requires_wal());
        self.coordinator.commit(txn, self.storage.as_ref(), wal)
    }

    /// Discard `txn`
    pub fn abort_transaction(&self, txn: &mut TransactionContext, reason: &str) {
        let _ = txn.mark_aborted(reason.to_string());
        self.coordinator.record_abort();
    }

    /// Refuse new transactions, let open ones finish, then sync the log
    pub fn shutdown(&self) -> Result<()> {
        self.open.store(false, Ordering::Release);
        self.syncer.stop();
        if !self.coordinator.wait_for_idle(SHUTDOWN_GRACE) {
            warn!(
                target: "chronodb::db",
                active = self.coordinator.active_count(),
                "Transactions still open at shutdown"
            );
        }
        self.flush()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.syncer.stop();
        if let Err(e) = self.flush() {
            warn!(target: "chronodb::db", error = %e, "Final WAL sync failed");
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.data_dir)
            .field("durability_mode", &self.durability_mode)
            .field("version", &self.current_version())
            .finish()
    }
}

/// Take the exclusive lock that keeps other processes out of `dir`
fn lock_directory(dir: &Path) -> Result<File> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(dir.join(".lock"))?;
    file.try_lock_exclusive().map_err(|_| {
        Error::Storage(format!(
            "{} is locked by another process",
            dir.display()
        ))
    })?;
    Ok(file)
}

/// Background thread syncing a standard-mode log on its interval
struct Syncer {
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Syncer {
    fn idle() -> Self {
        Syncer {
            stop: Arc::new(AtomicBool::new(true)),
            thread: Mutex::new(None),
        }
    }

    /// Start syncing `wal`, unless `mode` syncs inside commits or never
    fn start(mode: DurabilityMode, wal: &Arc<WAL>) -> Result<Self> {
        let period = match mode {
            DurabilityMode::Standard { interval_ms, .. } if interval_ms > 0 => {
                Duration::from_millis(interval_ms)
            }
            _ => return Ok(Syncer::idle()),
        };

        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let stop = Arc::clone(&stop);
            let wal = Arc::clone(wal);
            std::thread::Builder::new()
                .name("chronodb-wal-sync".into())
                .spawn(move || loop {
                    std::thread::sleep(period);
                    if stop.load(Ordering::Acquire) {
                        return;
                    }
                    if let Err(e) = wal.sync_if_overdue() {
                        warn!(target: "chronodb::db", error = %e, "Background WAL sync failed");
                    }
                })?
        };
        Ok(Syncer {
            stop,
            thread: Mutex::new(Some(thread)),
        })
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.lock().take() {
            let _ = thread.join();
        }
    }
}
