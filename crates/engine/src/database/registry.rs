//! Global database registry
//!
//! Opening the same directory twice in one process returns the same
//! `Database`, so two instances never append to the same WAL. Entries are
//! weak and expire when the last handle is dropped.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Weak;

use super::Database;

/// Global registry of open databases (canonical path -> weak reference)
pub static OPEN_DATABASES: Lazy<Mutex<HashMap<PathBuf, Weak<Database>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
