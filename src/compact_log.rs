//! Compact execution log decoder (`--execution_log_compact_file`)
//!
//! The compact log is a zstd stream of length-delimited `ExecLogEntry`
//! messages. Files and directories are written once with a nonzero id and
//! spawns refer to their outputs by that id, so decoding keeps a table of
//! the entries seen so far and rebuilds each spawn into a [`SpawnExec`].

use crate::error::{DecodeError, Result};
use crate::record::{self, Digest, EnvironmentVariable, Platform, SpawnExec, SpawnMetrics};
use prost::Message;
use std::collections::HashMap;

/// First four bytes of every zstd frame
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// One entry of the compact log
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecLogEntry {
    /// Nonzero when later entries may refer to this one
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(oneof = "Entry", tags = "3, 4, 5, 7")]
    pub r#type: Option<Entry>,
}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum Entry {
    #[prost(message, tag = "3")]
    File(File),
    #[prost(message, tag = "4")]
    Directory(Directory),
    #[prost(message, tag = "5")]
    UnresolvedSymlink(UnresolvedSymlink),
    #[prost(message, tag = "7")]
    Spawn(Spawn),
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct File {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(message, optional, tag = "2")]
    pub digest: Option<Digest>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Directory {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(message, repeated, tag = "2")]
    pub files: Vec<File>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UnresolvedSymlink {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(string, tag = "2")]
    pub target_path: String,
}

/// A spawn output: a reference to an earlier entry, or a path Bazel rejected
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Output {
    #[prost(oneof = "OutputRef", tags = "4, 5")]
    pub r#type: Option<OutputRef>,
}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum OutputRef {
    #[prost(string, tag = "4")]
    InvalidOutputPath(String),
    #[prost(uint32, tag = "5")]
    OutputId(u32),
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Spawn {
    #[prost(string, repeated, tag = "1")]
    pub args: Vec<String>,
    #[prost(message, repeated, tag = "2")]
    pub env_vars: Vec<EnvironmentVariable>,
    #[prost(message, optional, tag = "3")]
    pub platform: Option<Platform>,
    #[prost(uint32, tag = "4")]
    pub input_set_id: u32,
    #[prost(uint32, tag = "5")]
    pub tool_set_id: u32,
    #[prost(message, repeated, tag = "6")]
    pub outputs: Vec<Output>,
    #[prost(string, tag = "7")]
    pub mnemonic: String,
    #[prost(int64, tag = "8")]
    pub timeout_millis: i64,
    #[prost(bool, tag = "9")]
    pub remotable: bool,
    #[prost(bool, tag = "10")]
    pub cacheable: bool,
    #[prost(bool, tag = "11")]
    pub remote_cacheable: bool,
    #[prost(string, tag = "12")]
    pub runner: String,
    #[prost(bool, tag = "13")]
    pub cache_hit: bool,
    #[prost(string, tag = "14")]
    pub status: String,
    #[prost(int32, tag = "15")]
    pub exit_code: i32,
    #[prost(message, optional, tag = "16")]
    pub digest: Option<Digest>,
    #[prost(message, optional, tag = "17")]
    pub metrics: Option<SpawnMetrics>,
    #[prost(string, tag = "18")]
    pub target_label: String,
}

/// True when the buffer starts with a zstd frame
pub fn is_zstd(content: &[u8]) -> bool {
    content.starts_with(&ZSTD_MAGIC)
}

/// Inflate a zstd-compressed log
pub fn decompress(content: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(content).map_err(|source| DecodeError::Decompress { source })
}

/// Decompress and decode a compact log
pub fn decode_compressed(content: &[u8]) -> Result<Vec<SpawnExec>> {
    let entries = decompress(content)?;
    tracing::debug!(
        compressed = content.len(),
        decompressed = entries.len(),
        "inflated compact execution log"
    );
    decode_log(&entries)
}

/// Decode an already decompressed compact log
///
/// Unlike the verbose binary format every entry must be complete; the
/// error offset is the start of the entry's length prefix.
pub fn decode_log(content: &[u8]) -> Result<Vec<SpawnExec>> {
    let mut table: HashMap<u32, Entry> = HashMap::new();
    let mut spawns = Vec::new();
    let mut cursor = content;

    while !cursor.is_empty() {
        let offset = content.len() - cursor.len();
        let entry = ExecLogEntry::decode_length_delimited(&mut cursor)
            .map_err(|source| DecodeError::Compact { offset, source })?;

        match entry.r#type {
            Some(Entry::Spawn(spawn)) => spawns.push(reconstruct(spawn, &table)),
            Some(stored) if entry.id != 0 => {
                table.insert(entry.id, stored);
            }
            _ => {}
        }
    }

    tracing::info!(
        records = spawns.len(),
        referenced = table.len(),
        "decoded compact execution log"
    );
    Ok(spawns)
}

/// Rebuild a verbose record from a compact spawn
///
/// Outputs that point at unknown ids or at rejected paths are dropped.
/// Directories keep only their path; their size is not part of the entry.
pub fn reconstruct(spawn: Spawn, table: &HashMap<u32, Entry>) -> SpawnExec {
    let actual_outputs = spawn
        .outputs
        .iter()
        .filter_map(|output| match output.r#type {
            Some(OutputRef::OutputId(id)) => table.get(&id),
            _ => None,
        })
        .filter_map(|entry| match entry {
            Entry::File(file) => Some(record::File {
                path: file.path.clone(),
                digest: file.digest.clone(),
                ..Default::default()
            }),
            Entry::Directory(dir) => Some(record::File {
                path: dir.path.clone(),
                ..Default::default()
            }),
            Entry::UnresolvedSymlink(link) => Some(record::File {
                path: link.path.clone(),
                symlink_target_path: link.target_path.clone(),
                ..Default::default()
            }),
            Entry::Spawn(_) => None,
        })
        .collect();

    SpawnExec {
        command_args: spawn.args,
        environment_variables: spawn.env_vars,
        platform: spawn.platform,
        remotable: spawn.remotable,
        cacheable: spawn.cacheable,
        timeout_millis: spawn.timeout_millis,
        mnemonic: spawn.mnemonic,
        actual_outputs,
        runner: spawn.runner,
        cache_hit: spawn.cache_hit,
        status: spawn.status,
        exit_code: spawn.exit_code,
        remote_cacheable: spawn.remote_cacheable,
        target_label: spawn.target_label,
        digest: spawn.digest,
        metrics: spawn.metrics,
        ..Default::default()
    }
}

/// Frame entries the way Bazel writes them, before compression
pub fn encode_log(entries: &[ExecLogEntry]) -> Vec<u8> {
    entries
        .iter()
        .flat_map(|entry| entry.encode_length_delimited_to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Duration;

    fn file_entry(id: u32, path: &str, size: i64) -> ExecLogEntry {
        ExecLogEntry {
            id,
            r#type: Some(Entry::File(File {
                path: path.to_string(),
                digest: Some(Digest {
                    hash: "ab".repeat(32),
                    size_bytes: size,
                    hash_function_name: "SHA-256".to_string(),
                }),
            })),
        }
    }

    fn spawn_entry(label: &str, output_ids: &[u32]) -> ExecLogEntry {
        ExecLogEntry {
            id: 0,
            r#type: Some(Entry::Spawn(Spawn {
                mnemonic: "CppCompile".to_string(),
                target_label: label.to_string(),
                runner: "remote cache hit".to_string(),
                cache_hit: true,
                outputs: output_ids
                    .iter()
                    .map(|id| Output {
                        r#type: Some(OutputRef::OutputId(*id)),
                    })
                    .collect(),
                metrics: Some(SpawnMetrics {
                    total_time: Some(Duration::new(1, 500_000_000)),
                    ..Default::default()
                }),
                ..Default::default()
            })),
        }
    }

    fn compress(entries: &[ExecLogEntry]) -> Vec<u8> {
        zstd::stream::encode_all(&encode_log(entries)[..], 3).unwrap()
    }

    #[test]
    fn test_spawn_outputs_resolve_through_ids() {
        let entries = vec![
            file_entry(1, "bazel-out/a.o", 100),
            ExecLogEntry {
                id: 2,
                r#type: Some(Entry::Directory(Directory {
                    path: "bazel-out/tree".to_string(),
                    files: vec![],
                })),
            },
            spawn_entry("//a:lib", &[1, 2]),
        ];
        let spawns = decode_log(&encode_log(&entries)).unwrap();

        assert_eq!(spawns.len(), 1);
        let spawn = &spawns[0];
        assert_eq!(spawn.target_label, "//a:lib");
        assert_eq!(spawn.mnemonic, "CppCompile");
        assert!(spawn.cache_hit);
        assert_eq!(spawn.total_time(), std::time::Duration::from_millis(1500));

        let paths: Vec<&str> = spawn.actual_outputs.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["bazel-out/a.o", "bazel-out/tree"]);
        assert!(spawn.actual_outputs[1].digest.is_none());
        assert_eq!(spawn.output_bytes(), 100);
    }

    #[test]
    fn test_unknown_and_invalid_outputs_are_dropped() {
        let mut spawn = spawn_entry("//a:lib", &[1, 42]);
        if let Some(Entry::Spawn(s)) = spawn.r#type.as_mut() {
            s.outputs.push(Output {
                r#type: Some(OutputRef::InvalidOutputPath("../escape".to_string())),
            });
        }
        let entries = vec![file_entry(1, "out/a", 8), spawn];
        let spawns = decode_log(&encode_log(&entries)).unwrap();
        assert_eq!(spawns[0].actual_outputs.len(), 1);
        assert_eq!(spawns[0].actual_outputs[0].path, "out/a");
    }

    #[test]
    fn test_entries_without_id_are_not_stored() {
        let entries = vec![file_entry(0, "out/a", 8), spawn_entry("//a:lib", &[0])];
        let spawns = decode_log(&encode_log(&entries)).unwrap();
        assert!(spawns[0].actual_outputs.is_empty());
    }

    #[test]
    fn test_symlink_output_keeps_target() {
        let entries = vec![
            ExecLogEntry {
                id: 3,
                r#type: Some(Entry::UnresolvedSymlink(UnresolvedSymlink {
                    path: "out/link".to_string(),
                    target_path: "../real".to_string(),
                })),
            },
            spawn_entry("//a:lib", &[3]),
        ];
        let spawns = decode_log(&encode_log(&entries)).unwrap();
        assert_eq!(spawns[0].actual_outputs[0].symlink_target_path, "../real");
    }

    #[test]
    fn test_compressed_round_trip() {
        let entries = vec![
            file_entry(1, "out/a", 2_000_000),
            spawn_entry("//a:lib", &[1]),
            spawn_entry("//b:lib", &[]),
        ];
        let content = compress(&entries);
        assert!(is_zstd(&content));

        let labels: Vec<String> = decode_compressed(&content)
            .unwrap()
            .into_iter()
            .map(|s| s.target_label)
            .collect();
        assert_eq!(labels, vec!["//a:lib", "//b:lib"]);
    }

    #[test]
    fn test_plain_bytes_are_not_zstd() {
        let content = crate::binary_log::encode_log(&[SpawnExec::default()]);
        assert!(!is_zstd(&content));
        assert!(matches!(
            decompress(&content),
            Err(DecodeError::Decompress { .. })
        ));
    }

    #[test]
    fn test_truncated_entry_reports_its_offset() {
        let mut content = encode_log(&[file_entry(1, "out/a", 8)]);
        let offset = content.len();
        content.extend_from_slice(&encode_log(&[spawn_entry("//a:lib", &[1])]));
        content.truncate(content.len() - 1);

        let err = decode_log(&content).unwrap_err();
        assert!(matches!(err, DecodeError::Compact { .. }));
        assert_eq!(err.offset(), Some(offset));
    }
}
