//! Execution log record model
//!
//! One `SpawnExec` is one action entry in a Bazel execution log. The same
//! struct carries the protobuf wire mapping (via `prost::Message`) and the
//! protobuf-JSON mapping (via serde), so both log formats decode into the
//! identical in-memory shape.
//!
//! JSON rules follow the protobuf-JSON conventions loosely:
//! - every field accepts its proto name (`target_label`) and its JSON name
//!   (`targetLabel`)
//! - unknown fields are ignored, `null` means "use the default"
//! - `int64` and `int32` values may be numbers or decimal strings
//! - durations may be `"1.5s"` strings or `{"seconds": .., "nanos": ..}`

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A single spawned action from the execution log
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnExec {
    #[prost(string, repeated, tag = "1")]
    #[serde(alias = "commandArgs", deserialize_with = "null_as_default")]
    pub command_args: Vec<String>,

    #[prost(message, repeated, tag = "2")]
    #[serde(alias = "environmentVariables", deserialize_with = "null_as_default")]
    pub environment_variables: Vec<EnvironmentVariable>,

    #[prost(message, optional, tag = "3")]
    pub platform: Option<Platform>,

    #[prost(message, repeated, tag = "4")]
    #[serde(deserialize_with = "null_as_default")]
    pub inputs: Vec<File>,

    #[prost(message, repeated, tag = "5")]
    #[serde(alias = "listedOutputs", deserialize_with = "null_as_default")]
    pub listed_outputs: Vec<File>,

    #[prost(bool, tag = "6")]
    #[serde(deserialize_with = "null_as_default")]
    pub remotable: bool,

    #[prost(bool, tag = "7")]
    #[serde(deserialize_with = "null_as_default")]
    pub cacheable: bool,

    #[prost(int64, tag = "8")]
    #[serde(alias = "timeoutMillis", deserialize_with = "int64")]
    pub timeout_millis: i64,

    /// Action type, e.g. "CppCompile" or "Javac"
    #[prost(string, tag = "10")]
    #[serde(deserialize_with = "null_as_default")]
    pub mnemonic: String,

    #[prost(message, repeated, tag = "11")]
    #[serde(alias = "actualOutputs", deserialize_with = "null_as_default")]
    pub actual_outputs: Vec<File>,

    /// Strategy that produced the result, e.g. "remote cache hit" or "linux-sandbox"
    #[prost(string, tag = "12")]
    #[serde(deserialize_with = "null_as_default")]
    pub runner: String,

    #[prost(bool, tag = "13")]
    #[serde(alias = "cacheHit", deserialize_with = "null_as_default")]
    pub cache_hit: bool,

    #[prost(string, tag = "14")]
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,

    #[prost(int32, tag = "15")]
    #[serde(alias = "exitCode", deserialize_with = "int32")]
    pub exit_code: i32,

    #[prost(bool, tag = "16")]
    #[serde(alias = "remoteCacheable", deserialize_with = "null_as_default")]
    pub remote_cacheable: bool,

    #[prost(string, tag = "18")]
    #[serde(alias = "targetLabel", deserialize_with = "null_as_default")]
    pub target_label: String,

    #[prost(message, optional, tag = "19")]
    pub digest: Option<Digest>,

    #[prost(message, optional, tag = "20")]
    pub metrics: Option<SpawnMetrics>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentVariable {
    #[prost(string, tag = "1")]
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[prost(string, tag = "2")]
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    #[prost(message, repeated, tag = "1")]
    #[serde(deserialize_with = "null_as_default")]
    pub properties: Vec<PlatformProperty>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformProperty {
    #[prost(string, tag = "1")]
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[prost(string, tag = "2")]
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

/// An input or output file of a spawn
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    #[prost(string, tag = "1")]
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,

    #[prost(message, optional, tag = "2")]
    pub digest: Option<Digest>,

    #[prost(bool, tag = "3")]
    #[serde(alias = "isTool", deserialize_with = "null_as_default")]
    pub is_tool: bool,

    #[prost(string, tag = "4")]
    #[serde(alias = "symlinkTargetPath", deserialize_with = "null_as_default")]
    pub symlink_target_path: String,
}

/// Content digest of a file
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Digest {
    #[prost(string, tag = "1")]
    #[serde(deserialize_with = "null_as_default")]
    pub hash: String,

    #[prost(int64, tag = "2")]
    #[serde(alias = "sizeBytes", deserialize_with = "int64")]
    pub size_bytes: i64,

    #[prost(string, tag = "3")]
    #[serde(alias = "hashFunctionName", deserialize_with = "null_as_default")]
    pub hash_function_name: String,
}

/// Timing and resource metrics of a spawn
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnMetrics {
    #[prost(message, optional, tag = "1")]
    #[serde(alias = "totalTime")]
    pub total_time: Option<Duration>,

    #[prost(message, optional, tag = "2")]
    #[serde(alias = "parseTime")]
    pub parse_time: Option<Duration>,

    #[prost(message, optional, tag = "3")]
    #[serde(alias = "networkTime")]
    pub network_time: Option<Duration>,

    #[prost(message, optional, tag = "4")]
    #[serde(alias = "fetchTime")]
    pub fetch_time: Option<Duration>,

    #[prost(message, optional, tag = "5")]
    #[serde(alias = "queueTime")]
    pub queue_time: Option<Duration>,

    #[prost(message, optional, tag = "6")]
    #[serde(alias = "setupTime")]
    pub setup_time: Option<Duration>,

    #[prost(message, optional, tag = "7")]
    #[serde(alias = "uploadTime")]
    pub upload_time: Option<Duration>,

    #[prost(message, optional, tag = "8")]
    #[serde(alias = "executionWallTime")]
    pub execution_wall_time: Option<Duration>,

    #[prost(message, optional, tag = "9")]
    #[serde(alias = "processOutputsTime")]
    pub process_outputs_time: Option<Duration>,

    #[prost(message, optional, tag = "10")]
    #[serde(alias = "retryTime")]
    pub retry_time: Option<Duration>,

    #[prost(int64, tag = "11")]
    #[serde(alias = "inputBytes", deserialize_with = "int64")]
    pub input_bytes: i64,

    #[prost(int64, tag = "12")]
    #[serde(alias = "inputFiles", deserialize_with = "int64")]
    pub input_files: i64,

    #[prost(int64, tag = "13")]
    #[serde(alias = "memoryEstimateBytes", deserialize_with = "int64")]
    pub memory_estimate_bytes: i64,

    #[prost(int64, tag = "14")]
    #[serde(alias = "inputBytesLimit", deserialize_with = "int64")]
    pub input_bytes_limit: i64,

    #[prost(int64, tag = "15")]
    #[serde(alias = "inputFilesLimit", deserialize_with = "int64")]
    pub input_files_limit: i64,

    #[prost(int64, tag = "16")]
    #[serde(alias = "outputBytesLimit", deserialize_with = "int64")]
    pub output_bytes_limit: i64,

    #[prost(int64, tag = "17")]
    #[serde(alias = "outputFilesLimit", deserialize_with = "int64")]
    pub output_files_limit: i64,

    #[prost(int64, tag = "18")]
    #[serde(alias = "memoryBytesLimit", deserialize_with = "int64")]
    pub memory_bytes_limit: i64,

    #[prost(message, optional, tag = "19")]
    #[serde(alias = "timeLimit")]
    pub time_limit: Option<Duration>,
}

/// `google.protobuf.Duration` wire shape
///
/// Serialized to JSON in the protobuf-JSON string form (`"1.500s"`).
#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Duration {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Convert to a std duration; negative components clamp to zero
    pub fn to_std(&self) -> std::time::Duration {
        let seconds = u64::try_from(self.seconds).unwrap_or(0);
        let nanos = u64::try_from(self.nanos).unwrap_or(0);
        std::time::Duration::from_secs(seconds)
            .saturating_add(std::time::Duration::from_nanos(nanos))
    }

    fn to_json_string(self) -> String {
        let negative = self.seconds < 0 || self.nanos < 0;
        let seconds = self.seconds.unsigned_abs();
        let nanos = self.nanos.unsigned_abs();
        let sign = if negative { "-" } else { "" };

        if nanos == 0 {
            format!("{}{}s", sign, seconds)
        } else if nanos % 1_000_000 == 0 {
            format!("{}{}.{:03}s", sign, seconds, nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}{}.{:06}s", sign, seconds, nanos / 1_000)
        } else {
            format!("{}{}.{:09}s", sign, seconds, nanos)
        }
    }

    /// Parse the protobuf-JSON string form, e.g. `"3s"`, `"1.5s"`, `"-0.000001s"`
    pub fn parse_json_string(text: &str) -> Result<Self, String> {
        let body = text
            .trim()
            .strip_suffix('s')
            .ok_or_else(|| format!("duration {:?} is missing the 's' suffix", text))?;
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid seconds in duration {:?}", text));
        }
        if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid fractional seconds in duration {:?}", text));
        }

        let seconds: i64 = whole
            .parse()
            .map_err(|e| format!("invalid seconds in duration {:?}: {}", text, e))?;
        let nanos: i32 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<9}", fraction)
                .parse()
                .map_err(|e| format!("invalid fractional seconds in duration {:?}: {}", text, e))?
        };

        if negative {
            Ok(Self::new(-seconds, -nanos))
        } else {
            Ok(Self::new(seconds, nanos))
        }
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_json_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Parts {
                #[serde(default, deserialize_with = "int64")]
                seconds: i64,
                #[serde(default, deserialize_with = "int32")]
                nanos: i32,
            },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Duration::parse_json_string(&text).map_err(de::Error::custom),
            Repr::Parts { seconds, nanos } => Ok(Duration::new(seconds, nanos)),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Integer fields arrive as numbers or as decimal strings
fn number_or_text<'de, D, T>(deserializer: D, kind: &str) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr + Default,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr<T> {
        Number(T),
        Text(String),
    }

    match Option::<Repr<T>>::deserialize(deserializer)? {
        None => Ok(T::default()),
        Some(Repr::Number(n)) => Ok(n),
        Some(Repr::Text(text)) => text
            .trim()
            .parse()
            .map_err(|e| de::Error::custom(format!("invalid {} {:?}: {}", kind, text, e))),
    }
}

fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    number_or_text(deserializer, "int64")
}

fn int32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    number_or_text(deserializer, "int32")
}

fn phase(
    metrics: Option<&SpawnMetrics>,
    pick: fn(&SpawnMetrics) -> Option<&Duration>,
) -> std::time::Duration {
    metrics
        .and_then(pick)
        .map(Duration::to_std)
        .unwrap_or_default()
}

impl SpawnExec {
    /// Wall time of the whole spawn; zero when metrics are absent
    pub fn total_time(&self) -> std::time::Duration {
        phase(self.metrics.as_ref(), |m| m.total_time.as_ref())
    }

    /// Time spent fetching outputs from a cache
    pub fn fetch_time(&self) -> std::time::Duration {
        phase(self.metrics.as_ref(), |m| m.fetch_time.as_ref())
    }

    pub fn queue_time(&self) -> std::time::Duration {
        phase(self.metrics.as_ref(), |m| m.queue_time.as_ref())
    }

    pub fn setup_time(&self) -> std::time::Duration {
        phase(self.metrics.as_ref(), |m| m.setup_time.as_ref())
    }

    pub fn upload_time(&self) -> std::time::Duration {
        phase(self.metrics.as_ref(), |m| m.upload_time.as_ref())
    }

    pub fn execution_wall_time(&self) -> std::time::Duration {
        phase(self.metrics.as_ref(), |m| m.execution_wall_time.as_ref())
    }

    pub fn retry_time(&self) -> std::time::Duration {
        phase(self.metrics.as_ref(), |m| m.retry_time.as_ref())
    }

    /// Sum of digest sizes over actual outputs that carry a digest
    pub fn output_bytes(&self) -> u64 {
        self.actual_outputs
            .iter()
            .filter_map(|file| file.digest.as_ref())
            .map(|digest| u64::try_from(digest.size_bytes).unwrap_or(0))
            .sum()
    }
}
