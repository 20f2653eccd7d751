//! Decoding errors for execution logs

use thiserror::Error;

/// Errors that abort decoding of an execution log
///
/// Truncation at a message boundary is never an error; only corrupted
/// message bodies and JSON that no fallback can read end up here.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to decode protobuf message at offset {offset}: {source}")]
    Binary {
        offset: usize,
        #[source]
        source: prost::DecodeError,
    },

    #[error("failed to decode compact log entry at offset {offset}: {source}")]
    Compact {
        offset: usize,
        #[source]
        source: prost::DecodeError,
    },

    #[error("failed to decompress zstd log: {source}")]
    Decompress {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse JSON line {line}: {source}")]
    JsonLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Byte offset of the message that failed, for binary and compact logs
    pub fn offset(&self) -> Option<usize> {
        match self {
            DecodeError::Binary { offset, .. } | DecodeError::Compact { offset, .. } => {
                Some(*offset)
            }
            DecodeError::Decompress { .. }
            | DecodeError::Json { .. }
            | DecodeError::JsonLine { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
