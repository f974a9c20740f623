//! Binary snapshot format.
//!
//! ```text
//! +--------+---------+----------------------------+
//! | "REXS" | version | postcard(SerializableStore) |
//! +--------+---------+----------------------------+
//!   4 bytes  1 byte    rest of file
//! ```
//!
//! Encoding is deterministic: the same store always yields the same bytes.

use crate::{RexError, SerializableStore};

/// File magic.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"REXS";

/// Current format version.
pub const SNAPSHOT_VERSION: u8 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 1;

/// Encode a store snapshot with its header.
pub fn encode_snapshot(store: &SerializableStore) -> Result<Vec<u8>, RexError> {
    let payload = postcard::to_allocvec(store).map_err(|e| RexError::Format(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&SNAPSHOT_MAGIC);
    bytes.push(SNAPSHOT_VERSION);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode bytes produced by [`encode_snapshot`].
pub fn decode_snapshot(bytes: &[u8]) -> Result<SerializableStore, RexError> {
    let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
        return Err(RexError::Format(String::from("snapshot too short")));
    };
    if *magic != SNAPSHOT_MAGIC {
        return Err(RexError::Format(String::from("not a REX snapshot")));
    }
    let Some((&version, payload)) = rest.split_first() else {
        return Err(RexError::Format(String::from("snapshot too short")));
    };
    if version != SNAPSHOT_VERSION {
        return Err(RexError::Format(format!(
            "unsupported snapshot version {} (expected {})",
            version, SNAPSHOT_VERSION
        )));
    }
    postcard::from_bytes(payload).map_err(|e| RexError::Format(e.to_string()))
}
