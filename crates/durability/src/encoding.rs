//! WAL record encoding and decoding
//!
//! This module provides encoding/decoding for WAL records with CRC32 checksums
//! for corruption detection.
//!
//! ## Record Format
//!
//! ```text
//! [length: u32][type: u8][payload: bytes][crc32: u32]
//! ```
//!
//! - **length**: Total size of type + payload + crc (NOT including length itself)
//! - **type**: Record type tag (1 = committed batch)
//! - **payload**: bincode-serialized [`WalRecord`]
//! - **crc32**: CRC32 checksum over \[type\]\[payload\]

use crc32fast::Hasher;
use chronodb_core::error::{Error, Result};

use crate::wal::WalRecord;

/// Type tag of a committed batch
pub const TYPE_COMMIT_BATCH: u8 = 1;

/// Bytes of framing around the payload: length(4) + type(1) + crc(4)
pub const FRAME_OVERHEAD: usize = 9;

const MIN_BODY_LEN: usize = 5;

/// Encode a record to bytes
///
/// Format: `[length: u32][type: u8][payload: bytes][crc32: u32]`
pub fn encode_record(record: &WalRecord) -> Result<Vec<u8>> {
    let payload = bincode::serialize(record)?;

    // type(1) + payload + crc(4)
    let total_len = 1 + payload.len() + 4;
    let total_len_u32 = u32::try_from(total_len)
        .map_err(|_| Error::InvalidOperation(format!("WAL record too large: {} bytes", total_len)))?;

    let mut buf = Vec::with_capacity(4 + total_len);
    buf.extend_from_slice(&total_len_u32.to_le_bytes());
    buf.push(TYPE_COMMIT_BATCH);
    buf.extend_from_slice(&payload);

    let mut hasher = Hasher::new();
    hasher.update(&[TYPE_COMMIT_BATCH]);
    hasher.update(&payload);
    buf.extend_from_slice(&hasher.finalize().to_le_bytes());

    Ok(buf)
}

/// Decode one record from the front of `buf`
///
/// Returns the record and the number of bytes consumed, or `Ok(None)` when
/// `buf` ends before the record does (a partial write).
///
/// # Errors
///
/// Returns `Error::Corruption` with the file offset when the length is
/// invalid, the CRC does not match, the type tag is unknown, or the payload
/// does not deserialize.
pub fn decode_record(buf: &[u8], offset: u64) -> Result<Option<(WalRecord, usize)>> {
    let Some(len_bytes) = buf.get(..4) else {
        return Ok(None);
    };
    let mut len_array = [0u8; 4];
    len_array.copy_from_slice(len_bytes);
    let total_len = u32::from_le_bytes(len_array) as usize;

    if total_len < MIN_BODY_LEN {
        return Err(Error::Corruption(format!(
            "offset {}: invalid record length {} (minimum is {})",
            offset, total_len, MIN_BODY_LEN
        )));
    }

    let Some(body) = buf.get(4..4 + total_len) else {
        return Ok(None);
    };

    let type_tag = body[0];
    let payload = &body[1..total_len - 4];
    let mut crc_array = [0u8; 4];
    crc_array.copy_from_slice(&body[total_len - 4..]);
    let expected_crc = u32::from_le_bytes(crc_array);

    let mut hasher = Hasher::new();
    hasher.update(&[type_tag]);
    hasher.update(payload);
    let actual_crc = hasher.finalize();

    if actual_crc != expected_crc {
        return Err(Error::Corruption(format!(
            "offset {}: CRC mismatch: expected {:08x}, got {:08x}",
            offset, expected_crc, actual_crc
        )));
    }

    if type_tag != TYPE_COMMIT_BATCH {
        return Err(Error::Corruption(format!(
            "offset {}: unknown record type {}",
            offset, type_tag
        )));
    }

    let record: WalRecord = bincode::deserialize(payload).map_err(|e| {
        Error::Corruption(format!("offset {}: deserialization failed: {}", offset, e))
    })?;

    Ok(Some((record, 4 + total_len)))
}
