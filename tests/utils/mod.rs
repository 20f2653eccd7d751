// Shared fixtures for execution log integration tests

#![allow(dead_code)]

use execlog::binary_log;
use execlog::compact_log::{self, Entry, ExecLogEntry, Output, OutputRef, Spawn};
use execlog::record::{Digest, Duration, File, SpawnExec, SpawnMetrics};
use std::path::PathBuf;
use tempfile::TempDir;

/// Build a spawn with the fields the reports look at
pub fn spawn(
    mnemonic: &str,
    label: &str,
    runner: &str,
    cache_hit: bool,
    millis: i64,
) -> SpawnExec {
    SpawnExec {
        mnemonic: mnemonic.to_string(),
        target_label: label.to_string(),
        runner: runner.to_string(),
        cache_hit,
        metrics: Some(SpawnMetrics {
            total_time: Some(millis_duration(millis)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn millis_duration(millis: i64) -> Duration {
    Duration::new(millis / 1000, ((millis % 1000) * 1_000_000) as i32)
}

/// A remote cache hit that downloaded `bytes` in `fetch_millis`
pub fn remote_hit(mnemonic: &str, label: &str, bytes: i64, fetch_millis: i64) -> SpawnExec {
    let mut hit = spawn(mnemonic, label, "remote cache hit", true, fetch_millis);
    hit.actual_outputs.push(File {
        path: format!("bazel-out/{}", label.trim_start_matches("//")),
        digest: Some(Digest {
            hash: "ab".repeat(32),
            size_bytes: bytes,
            hash_function_name: "SHA-256".to_string(),
        }),
        ..Default::default()
    });
    if let Some(metrics) = hit.metrics.as_mut() {
        metrics.fetch_time = Some(millis_duration(fetch_millis));
    }
    hit
}

/// A small but varied build
pub fn sample_build() -> Vec<SpawnExec> {
    vec![
        spawn("CppCompile", "//core:base", "linux-sandbox", false, 2_500),
        remote_hit("CppCompile", "//core:util", 3_000_000, 250),
        spawn("CppLink", "//app:main", "linux-sandbox", false, 4_000),
        remote_hit("Javac", "//java:lib", 1_000_000, 250),
        spawn("Javac", "//java:app", "worker", false, 1_200),
    ]
}

/// Write raw bytes to a file in a fresh temp dir
pub fn write_log(name: &str, content: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

pub fn write_binary_log(name: &str, spawns: &[SpawnExec]) -> (TempDir, PathBuf) {
    write_log(name, &binary_log::encode_log(spawns))
}

/// Newline-delimited protobuf JSON, one record per line
pub fn write_json_log(name: &str, spawns: &[SpawnExec]) -> (TempDir, PathBuf) {
    let mut content = String::new();
    for spawn in spawns {
        content.push_str(&serde_json::to_string(spawn).unwrap());
        content.push('\n');
    }
    write_log(name, content.as_bytes())
}

/// A zstd-compressed compact log: each output is a file entry the spawn refers to by id
pub fn write_compact_log(name: &str, spawns: &[SpawnExec]) -> (TempDir, PathBuf) {
    let mut entries = Vec::new();
    let mut next_id = 1;
    for spawn in spawns {
        let mut outputs = Vec::new();
        for file in &spawn.actual_outputs {
            entries.push(ExecLogEntry {
                id: next_id,
                r#type: Some(Entry::File(compact_log::File {
                    path: file.path.clone(),
                    digest: file.digest.clone(),
                })),
            });
            outputs.push(Output {
                r#type: Some(OutputRef::OutputId(next_id)),
            });
            next_id += 1;
        }
        entries.push(ExecLogEntry {
            id: 0,
            r#type: Some(Entry::Spawn(Spawn {
                mnemonic: spawn.mnemonic.clone(),
                target_label: spawn.target_label.clone(),
                runner: spawn.runner.clone(),
                cache_hit: spawn.cache_hit,
                outputs,
                metrics: spawn.metrics.clone(),
                ..Default::default()
            })),
        });
    }
    let framed = compact_log::encode_log(&entries);
    write_log(name, &zstd::stream::encode_all(&framed[..], 3).unwrap())
}
