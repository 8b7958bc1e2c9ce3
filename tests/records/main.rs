//! Record store integration tests
//!
//! Exercises the public surface end to end:
//! - repository: save, get, get_ids, delete, after-get hooks
//! - date_range: creation-time bounds with limit, offset and reverse
//! - index_queries: match, range, starts-with, order-by, quick sum
//! - combine: or / and over query results
//! - options: declarative queries
//! - persistence: WAL replay across reopen
//! - properties: count, run and ids agree over random windows

#[path = "../common/mod.rs"]
mod common;

mod date_range;
mod index_queries;
mod options;
mod properties;
mod repository;
