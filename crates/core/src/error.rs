//! Error types shared by every chronodb crate
//!
//! [`Error`] is what public operations return. Problems with how a query
//! was built are a separate [`QueryError`]: the builder keeps the first one
//! it meets and hands it back from every later execution.

use std::io;
use thiserror::Error;

use crate::key::KeyError;

/// Result alias over [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a chronodb operation
#[derive(Debug, Error)]
pub enum Error {
    /// File system failure
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Bytes that would not encode or decode
    #[error("serialization: {0}")]
    Serialization(String),

    /// Stored bytes failed an integrity check
    #[error("corrupt data: {0}")]
    Corruption(String),

    /// Call not allowed in the current state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Commit rejected, usually because a read key changed underneath
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// What went wrong
        reason: String,
    },

    /// Backing store failure
    #[error("storage: {0}")]
    Storage(String),

    /// A record type whose declared schema is unusable
    #[error("schema: {0}")]
    Schema(String),

    /// Type or index name that cannot be used in a key
    #[error("invalid name: {0}")]
    InvalidName(#[from] KeyError),

    /// A query that could not be built or run
    #[error("query: {0}")]
    Query(#[from] QueryError),
}

impl Error {
    /// True for `TransactionAborted`, the errors worth retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::TransactionAborted { .. })
    }

    /// The inner [`QueryError`], if any
    pub fn query(&self) -> Option<&QueryError> {
        if let Error::Query(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(format!("bincode: {}", e))
    }
}

/// Query builder validation and execution failures
///
/// Builder-time failures are recorded on the query and surfaced only when
/// `run`, `count` or `quick_sum` is called.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Exact match was given a null parameter
    #[error("nil parameter to match query")]
    NilMatchParam,

    /// Range match was given two null bounds
    #[error("nil parameters to range query")]
    NilRangeParams,

    /// Starts-with match was given an empty string
    #[error("blank input to starts-with query")]
    BlankStartsWith,

    /// Aggregation requested on a query that does not use an index
    #[error("quicksum must use an index query")]
    QuickSumRequiresIndex,

    /// The named index is not declared by the record schema
    #[error("unknown index '{0}'")]
    UnknownIndex(String),

    /// A parameter cannot be applied to the index
    #[error("invalid parameter for index '{index}': {reason}")]
    InvalidParam {
        /// Index the parameter was given for
        index: String,
        /// Why the parameter was rejected
        reason: String,
    },

    /// QuickSum over an index whose values are not numeric
    #[error("index '{index}' is not numeric and cannot be summed")]
    NotSummable {
        /// Index that was summed
        index: String,
    },

    /// `or`/`and` called without any queries
    #[error("no queries to combine")]
    EmptyCombination,
}
