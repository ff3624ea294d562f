use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use csm_types::Identifier;
use serde::Deserialize;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::names::validate_name;
use crate::params::DEFAULT_CHAIN_SIZE;
use crate::policy::Strictness;
use crate::shard::relative_path;
use crate::traits::{Driver, DriverParam, ParamMap, ProgressCallback};
use crate::transfer;

/// In-memory, HashMap-based driver.
///
/// Intended for tests and embedding. Content is keyed by the sharded relative
/// path plus the logical name, so keys and URLs have the same layout as the
/// filesystem driver. Transfers run through the same chunked engine.
pub struct MemoryDriver {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    resource_url: String,
    strict: bool,
    chain_size: usize,
    read_event: Option<ProgressCallback>,
    write_event: Option<ProgressCallback>,
}

#[derive(Deserialize)]
#[serde(default)]
struct MemoryConfig {
    resource_url: String,
    strict: bool,
    chain_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            resource_url: String::new(),
            strict: true,
            chain_size: DEFAULT_CHAIN_SIZE,
        }
    }
}

impl MemoryDriver {
    pub const KIND: &'static str = "memory";

    /// Create a new empty, strict driver.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            resource_url: String::new(),
            strict: true,
            chain_size: DEFAULT_CHAIN_SIZE,
            read_event: None,
            write_event: None,
        }
    }

    /// Build from a flat parameter map. Recognized keys: `resource_url`,
    /// `strict`, `chain_size`.
    pub fn from_map(map: &ParamMap) -> StoreResult<Self> {
        let value = serde_json::Value::Object(map.clone().into_iter().collect());
        let config: MemoryConfig = serde_json::from_value(value)
            .map_err(|e| StoreError::Configuration(format!("memory params: {e}")))?;
        let mut driver = Self::new();
        driver.resource_url = config.resource_url;
        driver.strict = config.strict;
        driver.set_param(DriverParam::ChainSize(config.chain_size))?;
        Ok(driver)
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    /// Returns `true` if the driver holds no objects.
    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.read_map().values().map(|v| v.len() as u64).sum()
    }

    /// Remove all objects.
    pub fn clear(&self) {
        self.write_map().clear();
    }

    /// Sorted list of all keys (`<sharded path>/<name>`).
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read_map().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Storage key of `ident`/`name`.
    pub fn key(ident: &Identifier, name: &str) -> String {
        let dir = relative_path(ident);
        if dir.is_empty() {
            name.to_string()
        } else {
            format!("{dir}/{name}")
        }
    }

    // A poisoned lock still guards a consistent map: every mutation is a
    // single insert or remove.
    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn strictness(&self) -> Strictness {
        Strictness::from_flag(self.strict)
    }

    fn try_get(&self, ident: &Identifier, name: &str) -> StoreResult<Vec<u8>> {
        validate_name(name)?;
        let key = Self::key(ident, name);
        let read_err = |reason: String| StoreError::Read {
            path: PathBuf::from(&key),
            reason,
        };

        let stored = self.read_map().get(&key).cloned();
        let stored = stored.ok_or_else(|| read_err("not found".into()))?;
        if stored.is_empty() {
            return Err(read_err("file is empty".into()));
        }
        debug!(key = %key, bytes = stored.len(), "get");
        transfer::read_chunks(
            &mut Cursor::new(&stored),
            stored.len() as u64,
            self.chain_size,
            self.read_event.as_ref(),
        )
        .map_err(|e| read_err(e.to_string()))
    }

    fn try_set(&self, ident: &Identifier, content: &[u8], name: &str) -> StoreResult<()> {
        validate_name(name)?;
        let key = Self::key(ident, name);
        debug!(key = %key, bytes = content.len(), "set");

        let mut buffer = Vec::with_capacity(content.len());
        match transfer::write_chunks(
            &mut buffer,
            content,
            self.chain_size,
            self.write_event.as_ref(),
        ) {
            Ok(_) => {
                self.write_map().insert(key, buffer);
                Ok(())
            }
            Err(e) => {
                // Same as a truncated-then-removed file.
                self.write_map().remove(&key);
                Err(StoreError::Write {
                    path: PathBuf::from(key),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn try_delete(&self, ident: &Identifier, name: &str) -> StoreResult<()> {
        validate_name(name)?;
        let key = Self::key(ident, name);
        debug!(key = %key, "delete");
        match self.write_map().remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::Delete {
                path: PathBuf::from(key),
                reason: "not found".into(),
            }),
        }
    }

    fn try_resolve_url(&self, ident: &Identifier, name: &str) -> StoreResult<Option<String>> {
        validate_name(name)?;
        let key = Self::key(ident, name);
        if self.strict && !self.read_map().contains_key(&key) {
            return Ok(None);
        }
        Ok(Some(format!(
            "{}/{key}",
            self.resource_url.trim_end_matches('/')
        )))
    }

    fn try_copy(
        &self,
        source: &Identifier,
        dest: &Identifier,
        name: &str,
        dest_name: Option<&str>,
    ) -> StoreResult<()> {
        let dest_name = dest_name.filter(|n| !n.is_empty()).unwrap_or(name);
        validate_name(name)?;
        validate_name(dest_name)?;
        let from = Self::key(source, name);
        let to = Self::key(dest, dest_name);
        debug!(from = %from, to = %to, "copy");

        let mut map = self.write_map();
        match map.get(&from).cloned() {
            Some(content) => {
                map.insert(to, content);
                Ok(())
            }
            None => Err(StoreError::Copy {
                from: PathBuf::from(from),
                to: PathBuf::from(to),
                reason: "source not found".into(),
            }),
        }
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MemoryDriver {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn get(&self, ident: &Identifier, name: &str) -> StoreResult<Option<Vec<u8>>> {
        self.strictness().settle("get", self.try_get(ident, name))
    }

    fn set(&self, ident: &Identifier, content: &[u8], name: &str) -> StoreResult<bool> {
        self.strictness()
            .settle_flag("set", self.try_set(ident, content, name))
    }

    fn delete(&self, ident: &Identifier, name: &str) -> StoreResult<bool> {
        self.strictness()
            .settle_flag("delete", self.try_delete(ident, name))
    }

    fn exists(&self, ident: &Identifier, name: &str) -> bool {
        validate_name(name).is_ok() && self.read_map().contains_key(&Self::key(ident, name))
    }

    fn resolve_prepared_url(&self, ident: &Identifier, name: &str) -> StoreResult<Option<String>> {
        self.strictness()
            .settle("resolve_prepared_url", self.try_resolve_url(ident, name))
            .map(Option::flatten)
    }

    fn copy(
        &self,
        source: &Identifier,
        dest: &Identifier,
        name: &str,
        dest_name: Option<&str>,
    ) -> StoreResult<bool> {
        self.strictness()
            .settle_flag("copy", self.try_copy(source, dest, name, dest_name))
    }

    fn params(&self) -> ParamMap {
        let mut map = ParamMap::new();
        map.insert("type".into(), Self::KIND.into());
        map.insert("resource_url".into(), self.resource_url.clone().into());
        map.insert("strict".into(), self.strict.into());
        map.insert("chain_size".into(), self.chain_size.into());
        map.insert("read_event".into(), self.read_event.is_some().into());
        map.insert("write_event".into(), self.write_event.is_some().into());
        map
    }

    fn set_param(&mut self, param: DriverParam) -> StoreResult<()> {
        match param {
            DriverParam::ResourceUrl(url) => self.resource_url = url,
            DriverParam::Strict(strict) => self.strict = strict,
            DriverParam::ChainSize(0) => {
                return Err(StoreError::Configuration("chain_size must be non-zero".into()))
            }
            DriverParam::ChainSize(n) => self.chain_size = n,
            DriverParam::ReadEvent(cb) => self.read_event = cb,
            DriverParam::WriteEvent(cb) => self.write_event = cb,
            other => {
                return Err(StoreError::Configuration(format!(
                    "memory driver has no {} option",
                    other.key()
                )))
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("object_count", &self.len())
            .field("strict", &self.strict)
            .field("chain_size", &self.chain_size)
            .finish()
    }
}
