use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use csm_types::{Identifier, Progress};

use crate::error::StoreResult;

/// Progress observer for streamed transfers.
///
/// Invoked once at the start of a transfer and once after every chunk.
/// Returning `false` aborts the transfer.
pub type ProgressCallback = Arc<dyn Fn(&Progress) -> bool + Send + Sync>;

/// Serializable snapshot of a driver's configuration.
///
/// Keys are sorted, so equal configurations always serialize identically.
pub type ParamMap = BTreeMap<String, serde_json::Value>;

/// A single driver option to replace at runtime.
///
/// Takes effect for operations issued after the call returns.
#[derive(Clone)]
pub enum DriverParam {
    ResourcePath(PathBuf),
    ResourceUrl(String),
    /// Directory permission bits, e.g. `0o775`.
    DirMode(u32),
    /// File permission bits, e.g. `0o664`.
    FileMode(u32),
    NoFileCache(bool),
    Strict(bool),
    /// Maximum bytes per streamed chunk. Must be non-zero.
    ChainSize(usize),
    ReadEvent(Option<ProgressCallback>),
    WriteEvent(Option<ProgressCallback>),
}

impl DriverParam {
    /// The configuration key this option corresponds to.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ResourcePath(_) => "resource_path",
            Self::ResourceUrl(_) => "resource_url",
            Self::DirMode(_) => "dir_mode",
            Self::FileMode(_) => "file_mode",
            Self::NoFileCache(_) => "no_file_cache",
            Self::Strict(_) => "strict",
            Self::ChainSize(_) => "chain_size",
            Self::ReadEvent(_) => "read_event",
            Self::WriteEvent(_) => "write_event",
        }
    }
}

impl fmt::Debug for DriverParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourcePath(p) => write!(f, "ResourcePath({})", p.display()),
            Self::ResourceUrl(u) => write!(f, "ResourceUrl({u})"),
            Self::DirMode(m) => write!(f, "DirMode({m:o})"),
            Self::FileMode(m) => write!(f, "FileMode({m:o})"),
            Self::NoFileCache(b) => write!(f, "NoFileCache({b})"),
            Self::Strict(b) => write!(f, "Strict({b})"),
            Self::ChainSize(n) => write!(f, "ChainSize({n})"),
            Self::ReadEvent(cb) => write!(f, "ReadEvent({})", cb.is_some()),
            Self::WriteEvent(cb) => write!(f, "WriteEvent({})", cb.is_some()),
        }
    }
}

/// Content storage backend.
///
/// Every driver maps an [`Identifier`] plus a logical name to a location in
/// its backing store. Implementations must satisfy:
///
/// - `get`, `set`, `delete` and `copy` follow the strict policy: a failure is
///   an `Err` in strict mode and a sentinel (`Ok(None)` / `Ok(false)`)
///   otherwise.
/// - Cleanup after a failed write happens before the policy is applied.
/// - `exists` never fails; absence and I/O errors are both `false`.
/// - The driver never retains the identifier beyond the call.
pub trait Driver: Send + Sync + fmt::Debug {
    /// Registry tag of this driver type (e.g. `"filesystem"`).
    fn kind(&self) -> &'static str;

    /// Read the content stored under `ident`/`name`.
    fn get(&self, ident: &Identifier, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `content` under `ident`/`name`, replacing any previous content.
    fn set(&self, ident: &Identifier, content: &[u8], name: &str) -> StoreResult<bool>;

    /// Remove the content stored under `ident`/`name`.
    fn delete(&self, ident: &Identifier, name: &str) -> StoreResult<bool>;

    /// Check whether content is stored under `ident`/`name`.
    fn exists(&self, ident: &Identifier, name: &str) -> bool;

    /// Public URL of `ident`/`name`.
    ///
    /// In strict mode `Ok(None)` is returned when the object does not exist;
    /// otherwise the URL is produced regardless of existence.
    fn resolve_prepared_url(&self, ident: &Identifier, name: &str) -> StoreResult<Option<String>>;

    /// Copy `source`/`name` to `dest`/`dest_name` (or `dest`/`name` when
    /// `dest_name` is `None`).
    fn copy(
        &self,
        source: &Identifier,
        dest: &Identifier,
        name: &str,
        dest_name: Option<&str>,
    ) -> StoreResult<bool>;

    /// Read-only snapshot of the configuration, suitable for hashing.
    fn params(&self) -> ParamMap;

    /// Replace one configuration option.
    fn set_param(&mut self, param: DriverParam) -> StoreResult<()>;
}
