//! Write-ahead log of committed batches
//!
//! Every committed transaction is appended as one [`WalRecord`] before it is
//! applied to storage. On open, the log is scanned from the start; the first
//! record that is incomplete or fails its checksum ends the scan, and the
//! file is truncated back to the last intact record.
//!
//! ## File Operations
//!
//! - `WAL::open()` - Open or create, recovering intact records
//! - `WAL::append()` - Write one record, syncing per durability mode
//! - `WAL::read_all()` - Decode every intact record
//! - `WAL::fsync()` - Force sync to disk

mod mode;

pub use mode::DurabilityMode;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chronodb_core::error::Result;

use crate::encoding::{decode_record, encode_record};

/// One committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Commit version assigned by the transaction manager
    pub version: u64,
    /// Keys written, with their new values
    pub writes: Vec<(Vec<u8>, Vec<u8>)>,
    /// Keys deleted
    pub deletes: Vec<Vec<u8>>,
}

/// Write-Ahead Log with configurable durability
///
/// # Example
///
/// ```no_run
/// use chronodb_durability::wal::{DurabilityMode, WalRecord, WAL};
///
/// let mut wal = WAL::open("data/chronodb.wal", DurabilityMode::Always)?;
/// let recovered = wal.take_recovered();
/// wal.append(&WalRecord { version: 1, writes: vec![], deletes: vec![] })?;
/// # Ok::<(), chronodb_core::Error>(())
/// ```
#[derive(Debug)]
pub struct WAL {
    /// File path
    path: PathBuf,

    /// Buffered append handle
    writer: Mutex<BufWriter<File>>,

    /// Current file size
    size: AtomicU64,

    /// Durability mode
    durability_mode: DurabilityMode,

    /// Last fsync time (for standard mode)
    last_fsync: Mutex<Instant>,

    /// Appends since last fsync (for standard mode)
    writes_since_fsync: AtomicU64,

    /// Records found on open, until taken
    recovered: Vec<WalRecord>,
}

impl WAL {
    /// Open existing WAL or create new one
    ///
    /// Creates parent directories if they don't exist. Intact records are
    /// kept for [`WAL::take_recovered`]; a torn or corrupt tail is logged
    /// and truncated away.
    pub fn open<P: AsRef<Path>>(path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let scan = scan_records(&bytes);
        if scan.valid_len < bytes.len() {
            warn!(
                target: "chronodb::db",
                path = %path.display(),
                valid_bytes = scan.valid_len,
                discarded_bytes = bytes.len() - scan.valid_len,
                reason = scan.stop_reason.as_deref().unwrap_or("incomplete record"),
                "Truncating torn WAL tail"
            );
            file.set_len(scan.valid_len as u64)?;
            file.sync_all()?;
        }

        debug!(
            target: "chronodb::db",
            path = %path.display(),
            records = scan.records.len(),
            "WAL opened"
        );

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            size: AtomicU64::new(scan.valid_len as u64),
            durability_mode,
            last_fsync: Mutex::new(Instant::now()),
            writes_since_fsync: AtomicU64::new(0),
            recovered: scan.records,
        })
    }

    /// Records recovered on open (empty after the first call)
    pub fn take_recovered(&mut self) -> Vec<WalRecord> {
        std::mem::take(&mut self.recovered)
    }

    /// Append a record, syncing according to the durability mode
    ///
    /// Returns the offset the record was written at.
    /// - Always: fsync after every append
    /// - Standard: fsync after batch_size appends OR interval_ms elapsed
    pub fn append(&self, record: &WalRecord) -> Result<u64> {
        let encoded = encode_record(record)?;

        let offset = {
            let mut writer = self.writer.lock();
            writer.write_all(&encoded)?;
            self.size.fetch_add(encoded.len() as u64, Ordering::SeqCst)
        };

        match self.durability_mode {
            DurabilityMode::Cache => {}
            DurabilityMode::Always => self.fsync()?,
            DurabilityMode::Standard {
                interval_ms,
                batch_size,
            } => {
                let writes = self.writes_since_fsync.fetch_add(1, Ordering::SeqCst) + 1;
                let elapsed = self.last_fsync.lock().elapsed().as_millis() as u64;

                if elapsed >= interval_ms || writes >= batch_size as u64 {
                    self.fsync()?;
                }
            }
        }

        Ok(offset)
    }

    /// Force sync to disk (flush + fsync)
    pub fn fsync(&self) -> Result<()> {
        {
            let mut writer = self.writer.lock();
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        self.writes_since_fsync.store(0, Ordering::SeqCst);
        *self.last_fsync.lock() = Instant::now();
        Ok(())
    }

    /// Fsync if unsynced appends are older than the standard-mode interval
    ///
    /// Called from the background flush thread. Returns whether a sync ran.
    pub fn sync_if_overdue(&self) -> Result<bool> {
        let DurabilityMode::Standard { interval_ms, .. } = self.durability_mode else {
            return Ok(false);
        };
        if self.writes_since_fsync.load(Ordering::SeqCst) == 0 {
            return Ok(false);
        }
        if (self.last_fsync.lock().elapsed().as_millis() as u64) < interval_ms {
            return Ok(false);
        }
        self.fsync()?;
        Ok(true)
    }

    /// Decode every intact record from the start of the file
    pub fn read_all(&self) -> Result<Vec<WalRecord>> {
        self.writer.lock().flush()?;
        let mut bytes = Vec::new();
        File::open(&self.path)?.read_to_end(&mut bytes)?;
        Ok(scan_records(&bytes).records)
    }

    /// Current file size in bytes
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::SeqCst)
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durability mode
    pub fn durability_mode(&self) -> DurabilityMode {
        self.durability_mode
    }
}

impl Drop for WAL {
    fn drop(&mut self) {
        let _ = self.fsync();
    }
}

struct Scan {
    records: Vec<WalRecord>,
    valid_len: usize,
    stop_reason: Option<String>,
}

fn scan_records(bytes: &[u8]) -> Scan {
    let mut records = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        match decode_record(&bytes[offset..], offset as u64) {
            Ok(Some((record, consumed))) => {
                records.push(record);
                offset += consumed;
            }
            Ok(None) => break,
            Err(e) => {
                return Scan {
                    records,
                    valid_len: offset,
                    stop_reason: Some(e.to_string()),
                }
            }
        }
    }

    Scan {
        records,
        valid_len: offset,
        stop_reason: None,
    }
}
