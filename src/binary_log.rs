//! Length-delimited binary execution log
//!
//! The file is a plain concatenation of `(varint length, SpawnExec bytes)`
//! pairs with no outer framing. Running out of bytes at or inside a length
//! prefix, or before a declared message ends, is the normal end of a log that
//! was cut short: everything decoded so far is returned. A message whose bytes
//! are all present but do not decode is a hard error.

use crate::error::{DecodeError, Result};
use crate::record::SpawnExec;
use prost::Message;

/// Decode every complete record in `content`, in file order
pub fn decode_log(content: &[u8]) -> Result<Vec<SpawnExec>> {
    let mut spawns = Vec::new();
    let mut offset = 0;

    while offset < content.len() {
        let mut cursor = &content[offset..];
        let size = match prost::decode_length_delimiter(&mut cursor) {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(offset, error = %e, "stopping at incomplete length prefix");
                break;
            }
        };
        offset = content.len() - cursor.len();

        let end = match offset.checked_add(size) {
            Some(end) if end <= content.len() => end,
            _ => {
                tracing::debug!(
                    offset,
                    declared = size,
                    available = content.len() - offset,
                    "stopping at truncated message"
                );
                break;
            }
        };

        let spawn = SpawnExec::decode(&content[offset..end])
            .map_err(|source| DecodeError::Binary { offset, source })?;
        spawns.push(spawn);
        offset = end;
    }

    tracing::info!(records = spawns.len(), "decoded binary execution log");
    Ok(spawns)
}

/// Encode records with the same length-delimited framing `decode_log` reads
pub fn encode_log(spawns: &[SpawnExec]) -> Vec<u8> {
    spawns
        .iter()
        .flat_map(|spawn| spawn.encode_length_delimited_to_vec())
        .collect()
}
