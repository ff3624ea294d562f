use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::traits::{DriverParam, ParamMap, ProgressCallback};

/// Default number of bytes moved per streamed chunk (64 KiB).
pub const DEFAULT_CHAIN_SIZE: usize = 64 * 1024;

/// Configuration of a [`FilesystemDriver`](crate::FilesystemDriver).
///
/// Directory and file modes have no default and must always be supplied.
#[derive(Clone, Serialize, Deserialize)]
pub struct FilesystemParams {
    /// Storage root under which sharded directories are created.
    pub resource_path: PathBuf,
    /// Prefix for generated URLs (e.g. `/resources`).
    #[serde(default)]
    pub resource_url: String,
    /// Permission bits for created directories.
    #[serde(deserialize_with = "deserialize_mode", serialize_with = "serialize_mode")]
    pub dir_mode: u32,
    /// Permission bits for written files.
    #[serde(deserialize_with = "deserialize_mode", serialize_with = "serialize_mode")]
    pub file_mode: u32,
    /// Never trust the "already prepared" fast path; re-check every component.
    #[serde(default)]
    pub no_file_cache: bool,
    /// Strict (typed errors) or lenient (sentinel) failure reporting.
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Maximum bytes per streamed chunk.
    #[serde(default = "default_chain_size")]
    pub chain_size: usize,
    #[serde(skip)]
    pub read_event: Option<ProgressCallback>,
    #[serde(skip)]
    pub write_event: Option<ProgressCallback>,
}

fn default_strict() -> bool {
    true
}

fn default_chain_size() -> usize {
    DEFAULT_CHAIN_SIZE
}

impl FilesystemParams {
    /// Parameters with explicit modes and defaults for everything else.
    pub fn new(
        resource_path: impl Into<PathBuf>,
        resource_url: impl Into<String>,
        dir_mode: u32,
        file_mode: u32,
    ) -> Self {
        Self {
            resource_path: resource_path.into(),
            resource_url: resource_url.into(),
            dir_mode,
            file_mode,
            no_file_cache: false,
            strict: true,
            chain_size: DEFAULT_CHAIN_SIZE,
            read_event: None,
            write_event: None,
        }
    }

    /// Builder: set the strict flag.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builder: set the chunk size.
    pub fn chain_size(mut self, chain_size: usize) -> Self {
        self.chain_size = chain_size;
        self
    }

    /// Builder: set the read progress callback.
    pub fn read_event(mut self, callback: ProgressCallback) -> Self {
        self.read_event = Some(callback);
        self
    }

    /// Builder: set the write progress callback.
    pub fn write_event(mut self, callback: ProgressCallback) -> Self {
        self.write_event = Some(callback);
        self
    }

    /// Decode from a flat key/value map (as held by service configuration).
    pub fn from_map(map: &ParamMap) -> StoreResult<Self> {
        let value = serde_json::Value::Object(map.clone().into_iter().collect());
        let params: Self = serde_json::from_value(value)
            .map_err(|e| StoreError::Configuration(format!("filesystem params: {e}")))?;
        params.check()?;
        Ok(params)
    }

    /// Serializable snapshot. Callbacks are reported by presence only.
    pub fn to_map(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert(
            "resource_path".into(),
            self.resource_path.to_string_lossy().into_owned().into(),
        );
        map.insert("resource_url".into(), self.resource_url.clone().into());
        map.insert("dir_mode".into(), format!("{:o}", self.dir_mode).into());
        map.insert("file_mode".into(), format!("{:o}", self.file_mode).into());
        map.insert("no_file_cache".into(), self.no_file_cache.into());
        map.insert("strict".into(), self.strict.into());
        map.insert("chain_size".into(), self.chain_size.into());
        map.insert("read_event".into(), self.read_event.is_some().into());
        map.insert("write_event".into(), self.write_event.is_some().into());
        map
    }

    /// Replace one option, rejecting values the engine can not run with.
    pub fn apply(&mut self, param: DriverParam) -> StoreResult<()> {
        match param {
            DriverParam::ResourcePath(p) => self.resource_path = p,
            DriverParam::ResourceUrl(u) => self.resource_url = u,
            DriverParam::DirMode(m) => self.dir_mode = m,
            DriverParam::FileMode(m) => self.file_mode = m,
            DriverParam::NoFileCache(b) => self.no_file_cache = b,
            DriverParam::Strict(b) => self.strict = b,
            DriverParam::ChainSize(n) => {
                if n == 0 {
                    return Err(StoreError::Configuration("chain_size must be non-zero".into()));
                }
                self.chain_size = n;
            }
            DriverParam::ReadEvent(cb) => self.read_event = cb,
            DriverParam::WriteEvent(cb) => self.write_event = cb,
        }
        Ok(())
    }

    fn check(&self) -> StoreResult<()> {
        if self.chain_size == 0 {
            return Err(StoreError::Configuration("chain_size must be non-zero".into()));
        }
        if self.resource_path.as_os_str().is_empty() {
            return Err(StoreError::Configuration("resource_path is not set".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for FilesystemParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilesystemParams")
            .field("resource_path", &self.resource_path)
            .field("resource_url", &self.resource_url)
            .field("dir_mode", &format_args!("{:o}", self.dir_mode))
            .field("file_mode", &format_args!("{:o}", self.file_mode))
            .field("no_file_cache", &self.no_file_cache)
            .field("strict", &self.strict)
            .field("chain_size", &self.chain_size)
            .field("read_event", &self.read_event.is_some())
            .field("write_event", &self.write_event.is_some())
            .finish()
    }
}

/// Parse octal-digit mode notation: `"775"`, `"0o775"`, `"0775"` or the
/// integer `775` all mean `0o775`.
pub fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    if digits.is_empty() {
        return Err("empty mode".into());
    }
    let mode = u32::from_str_radix(digits, 8).map_err(|e| format!("invalid mode {s:?}: {e}"))?;
    if mode > 0o7777 {
        return Err(format!("mode {s:?} out of range"));
    }
    Ok(mode)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Text(String),
    Digits(u64),
}

fn deserialize_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let text = match ModeRepr::deserialize(deserializer)? {
        ModeRepr::Text(s) => s,
        ModeRepr::Digits(n) => n.to_string(),
    };
    parse_mode(&text).map_err(serde::de::Error::custom)
}

fn serialize_mode<S: serde::Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{mode:o}"))
}
