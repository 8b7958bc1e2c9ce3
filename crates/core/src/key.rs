//! Key layout for records and index entries
//!
//! All records and index entries share one ordered keyspace:
//!
//! ```text
//! primary:  <type> 0x00 <id:16>
//! index:    0x01 <type> 0x00 <index> 0x00 <value> <id:16>
//! ```
//!
//! ## Rules
//!
//! - Type and index names are non-empty and contain no NUL byte, so the
//!   terminator can never be confused with a name byte. This keeps one
//!   name from being a byte prefix of another's keys (`user` vs `users`).
//! - Type names must not start with the index marker `0x01`, so primary
//!   keys and index keys never interleave.
//! - The value component is variable-width for strings. The identifier is
//!   always the last [`TID_LEN`] bytes, so the value is recovered by
//!   slicing between the index prefix and the identifier.

use crate::tid::{Tid, TID_LEN};
use thiserror::Error;

/// First byte of every index key
pub const INDEX_MARKER: u8 = 0x01;

/// Separator after type and index names
pub const NAME_TERMINATOR: u8 = 0x00;

/// Longest accepted type or index name, in bytes
pub const MAX_NAME_BYTES: usize = 255;

/// Validate a type or index name
///
/// # Examples
///
/// ```
/// use chronodb_core::key::validate_name;
///
/// assert!(validate_name("user").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("a\x00b").is_err());
/// assert!(validate_name("\x01user").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<(), KeyError> {
    if name.is_empty() {
        return Err(KeyError::Empty);
    }

    if name.contains('\x00') {
        return Err(KeyError::ContainsNul);
    }

    if name.as_bytes()[0] == INDEX_MARKER {
        return Err(KeyError::ReservedPrefix);
    }

    if name.len() > MAX_NAME_BYTES {
        return Err(KeyError::TooLong {
            actual: name.len(),
            max: MAX_NAME_BYTES,
        });
    }

    Ok(())
}

/// Name validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    /// Name is empty
    #[error("name cannot be empty")]
    Empty,

    /// Name contains a NUL byte
    #[error("name cannot contain NUL bytes")]
    ContainsNul,

    /// Name starts with the index marker byte
    #[error("name cannot start with byte 0x01")]
    ReservedPrefix,

    /// Name exceeds [`MAX_NAME_BYTES`]
    #[error("name too long: {actual} bytes exceeds maximum {max}")]
    TooLong {
        /// Actual length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },
}

/// Prefix shared by every primary key of a type
pub fn primary_prefix(type_name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(type_name.len() + 1 + TID_LEN);
    key.extend_from_slice(type_name.as_bytes());
    key.push(NAME_TERMINATOR);
    key
}

/// Primary key of a record
pub fn primary_key(type_name: &str, id: Tid) -> Vec<u8> {
    let mut key = primary_prefix(type_name);
    key.extend_from_slice(&id.to_bytes());
    key
}

/// Prefix shared by every entry of one index
pub fn index_prefix(type_name: &str, index_name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(type_name.len() + index_name.len() + 3 + TID_LEN);
    key.push(INDEX_MARKER);
    key.extend_from_slice(type_name.as_bytes());
    key.push(NAME_TERMINATOR);
    key.extend_from_slice(index_name.as_bytes());
    key.push(NAME_TERMINATOR);
    key
}

/// Prefix shared by every entry of one index whose value starts with `value`
pub fn index_value_prefix(type_name: &str, index_name: &str, value: &[u8]) -> Vec<u8> {
    let mut key = index_prefix(type_name, index_name);
    key.extend_from_slice(value);
    key
}

/// Full index entry key
pub fn index_key(type_name: &str, index_name: &str, value: &[u8], id: Tid) -> Vec<u8> {
    let mut key = index_value_prefix(type_name, index_name, value);
    key.extend_from_slice(&id.to_bytes());
    key
}

/// Identifier stored in the last [`TID_LEN`] bytes of a key
pub fn id_from_key(key: &[u8]) -> Option<Tid> {
    let start = key.len().checked_sub(TID_LEN)?;
    Tid::from_slice(&key[start..])
}

/// Value bytes between an index prefix of `prefix_len` bytes and the identifier
pub fn value_component(key: &[u8], prefix_len: usize) -> Option<&[u8]> {
    let end = key.len().checked_sub(TID_LEN)?;
    if end < prefix_len {
        return None;
    }
    Some(&key[prefix_len..end])
}

/// Smallest key greater than every key starting with `prefix`
///
/// Returns `None` when no such key exists (empty or all-`0xFF` prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut successor = prefix.to_vec();
    while let Some(last) = successor.pop() {
        if last < u8::MAX {
            successor.push(last + 1);
            return Some(successor);
        }
    }
    None
}
