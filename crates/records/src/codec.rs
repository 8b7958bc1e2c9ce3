//! Record body serialization

use chronodb_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Serialization format of primary entry values
///
/// The codec is a property of the data directory: reopening a store with a
/// different codec makes existing records unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RecordCodec {
    /// MessagePack via `rmp-serde`, with named fields
    #[default]
    MessagePack,
    /// JSON via `serde_json`
    Json,
}

impl RecordCodec {
    /// Serialize a record body
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            RecordCodec::MessagePack => {
                rmp_serde::to_vec_named(value).map_err(|e| Error::Serialization(e.to_string()))
            }
            RecordCodec::Json => {
                serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }

    /// Deserialize a record body
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            RecordCodec::MessagePack => {
                rmp_serde::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
            RecordCodec::Json => {
                serde_json::from_slice(bytes).map_err(|e| Error::Serialization(e.to_string()))
            }
        }
    }
}
