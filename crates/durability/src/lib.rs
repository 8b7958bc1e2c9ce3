//! Durability layer for chronodb
//!
//! This crate handles everything that touches disk:
//!
//! - WAL: append-only log with one record per committed transaction
//! - Durability modes: Always, Standard (default), Cache
//! - Recovery: torn-tail truncation and replay into storage

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod recovery;
pub mod wal;

pub use recovery::{replay_wal, ReplayStats};
pub use wal::{DurabilityMode, WalRecord, WAL};
