//! JSON execution log
//!
//! Bazel writes the JSON log either as a stream of (possibly pretty-printed)
//! JSON documents or as one document per line. Decoding tries, in order:
//!
//! 1. a streaming reader over the whole buffer, which finds document
//!    boundaries on its own
//! 2. if that yields nothing or fails part-way, the rest of the buffer as
//!    exactly one document
//! 3. if there are still no records, one document per non-blank line, where
//!    any bad line fails the whole log
//!
//! All three use the same field rules (see [`crate::record`]).

use crate::error::{DecodeError, Result};
use crate::record::SpawnExec;

/// Decode every record in a JSON execution log, in file order
pub fn decode_log(content: &[u8]) -> Result<Vec<SpawnExec>> {
    let mut spawns = Vec::new();
    let mut stream = serde_json::Deserializer::from_slice(content).into_iter::<SpawnExec>();
    let mut stream_error = None;

    for item in stream.by_ref() {
        match item {
            Ok(spawn) => spawns.push(spawn),
            Err(e) => {
                stream_error = Some(e);
                break;
            }
        }
    }
    let consumed = stream.byte_offset();

    if spawns.is_empty() || stream_error.is_some() {
        tracing::debug!(
            records = spawns.len(),
            offset = consumed,
            error = ?stream_error,
            "stream decode incomplete, reading remainder as a single document"
        );

        match serde_json::from_slice::<SpawnExec>(&content[consumed..]) {
            Ok(spawn) => {
                spawns.push(spawn);
                tracing::info!(records = spawns.len(), "decoded JSON execution log");
                return Ok(spawns);
            }
            Err(single_error) => {
                if let Some(source) = stream_error.filter(|_| !spawns.is_empty()) {
                    return Err(DecodeError::Json { source });
                }
                tracing::debug!(error = %single_error, "single document decode failed");
            }
        }
    }

    if spawns.is_empty() {
        tracing::debug!("falling back to line-delimited JSON");
        spawns = decode_lines(content)?;
    }

    tracing::info!(records = spawns.len(), "decoded JSON execution log");
    Ok(spawns)
}

/// One document per line; blank lines are skipped
fn decode_lines(content: &[u8]) -> Result<Vec<SpawnExec>> {
    content
        .split(|&b| b == b'\n')
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim_ascii();
            (!line.is_empty()).then_some((index + 1, line))
        })
        .map(|(line_number, line)| {
            serde_json::from_slice(line).map_err(|source| DecodeError::JsonLine {
                line: line_number,
                source,
            })
        })
        .collect()
}
