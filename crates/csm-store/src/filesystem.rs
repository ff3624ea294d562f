use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use csm_types::Identifier;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::names::validate_name;
use crate::params::FilesystemParams;
use crate::policy::Strictness;
use crate::shard::shard;
use crate::traits::{Driver, DriverParam, ParamMap};
use crate::transfer;

/// Stores content on the local filesystem under
/// `<resource_path>/<shard components…>/<name>`.
///
/// Directories along the sharded path are created on demand with
/// `dir_mode`; written files are chmod'd to `file_mode`. Reads and writes are
/// streamed in `chain_size` chunks through the optional progress callbacks.
pub struct FilesystemDriver {
    params: FilesystemParams,
}

impl FilesystemDriver {
    pub const KIND: &'static str = "filesystem";

    pub fn new(params: FilesystemParams) -> Self {
        Self { params }
    }

    /// Build from a flat parameter map (see [`FilesystemParams::from_map`]).
    pub fn from_map(map: &ParamMap) -> StoreResult<Self> {
        FilesystemParams::from_map(map).map(Self::new)
    }

    /// Typed view of the current configuration.
    pub fn config(&self) -> &FilesystemParams {
        &self.params
    }

    /// Physical directory for `ident`, without touching the filesystem.
    pub fn directory_path(&self, ident: &Identifier) -> PathBuf {
        join_all(&self.params.resource_path, &shard(ident))
    }

    /// Physical path of `ident`/`name`, without touching the filesystem.
    pub fn object_path(&self, ident: &Identifier, name: &str) -> PathBuf {
        self.directory_path(ident).join(name)
    }

    fn strictness(&self) -> Strictness {
        Strictness::from_flag(self.params.strict)
    }

    // -----------------------------------------------------------------------
    // Directory preparation
    // -----------------------------------------------------------------------

    /// Ensure the sharded directory exists, creating missing components from
    /// the root downward.
    fn prepare_full_path(&self, dirs: &[String]) -> StoreResult<PathBuf> {
        let root = &self.params.resource_path;
        let full = join_all(root, dirs);
        if !self.params.no_file_cache && full.is_dir() {
            return Ok(full);
        }
        if !root.is_dir() {
            return Err(StoreError::NotADirectory(root.clone()));
        }

        let mut path = root.clone();
        for dir in dirs {
            path.push(dir);
            prepare_component(&path, self.params.dir_mode)?;
        }
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // File primitives
    // -----------------------------------------------------------------------

    fn read_file(&self, path: &Path) -> StoreResult<Vec<u8>> {
        let read_err = |reason: String| StoreError::Read {
            path: path.to_path_buf(),
            reason,
        };

        let meta = fs::metadata(path).map_err(|e| read_err(e.to_string()))?;
        if !meta.is_file() {
            return Err(read_err("not a regular file".into()));
        }
        if meta.len() == 0 {
            return Err(read_err("file is empty".into()));
        }

        let mut file = File::open(path).map_err(|e| read_err(e.to_string()))?;
        transfer::read_chunks(
            &mut file,
            meta.len(),
            self.params.chain_size,
            self.params.read_event.as_ref(),
        )
        .map_err(|e| read_err(e.to_string()))
    }

    /// Stream `content` into `path`. A file left behind by an aborted or
    /// failed transfer is removed before the error is returned.
    fn save_file(&self, path: &Path, content: &[u8]) -> StoreResult<()> {
        let write_err = |reason: String| StoreError::Write {
            path: path.to_path_buf(),
            reason,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| write_err(e.to_string()))?;

        let result = transfer::write_chunks(
            &mut file,
            content,
            self.params.chain_size,
            self.params.write_event.as_ref(),
        );
        drop(file);

        match result {
            Ok(_) => set_mode(path, self.params.file_mode).map_err(|e| write_err(e.to_string())),
            Err(e) => {
                remove_partial(path);
                Err(write_err(e.to_string()))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Operations (policy applied by the trait impl)
    // -----------------------------------------------------------------------

    fn try_get(&self, ident: &Identifier, name: &str) -> StoreResult<Vec<u8>> {
        validate_name(name)?;
        let path = self.object_path(ident, name);
        debug!(path = %path.display(), "get");
        self.read_file(&path)
    }

    fn try_set(&self, ident: &Identifier, content: &[u8], name: &str) -> StoreResult<()> {
        validate_name(name)?;
        let dir = self.prepare_full_path(&shard(ident))?;
        let path = dir.join(name);
        debug!(path = %path.display(), bytes = content.len(), "set");
        self.save_file(&path, content)
    }

    fn try_delete(&self, ident: &Identifier, name: &str) -> StoreResult<()> {
        validate_name(name)?;
        let path = self.object_path(ident, name);
        debug!(path = %path.display(), "delete");
        fs::remove_file(&path).map_err(|e| StoreError::Delete {
            path,
            reason: e.to_string(),
        })
    }

    fn try_resolve_url(&self, ident: &Identifier, name: &str) -> StoreResult<Option<String>> {
        validate_name(name)?;
        let dirs = shard(ident);
        let dir = self.prepare_full_path(&dirs)?;
        if self.params.strict && !dir.join(name).is_file() {
            return Ok(None);
        }
        Ok(Some(join_url(&self.params.resource_url, &dirs, name)))
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

        let from = self.object_path(source, name);
        let to = self.prepare_full_path(&shard(dest))?.join(dest_name);
        debug!(from = %from.display(), to = %to.display(), "copy");
        match fs::copy(&from, &to) {
            Ok(_) => Ok(()),
            Err(e) => Err(StoreError::Copy {
                from,
                to,
                reason: e.to_string(),
            }),
        }
    }
}

impl Driver for FilesystemDriver {
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
        validate_name(name).is_ok() && self.object_path(ident, name).is_file()
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
        let mut map = self.params.to_map();
        map.insert("type".into(), Self::KIND.into());
        map
    }

    fn set_param(&mut self, param: DriverParam) -> StoreResult<()> {
        debug!(?param, "set_param");
        self.params.apply(param)
    }
}

impl std::fmt::Debug for FilesystemDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemDriver")
            .field("params", &self.params)
            .finish()
    }
}

fn join_all(root: &Path, dirs: &[String]) -> PathBuf {
    dirs.iter().fold(root.to_path_buf(), |path, dir| path.join(dir))
}

/// `<prefix>/<dir…>/<name>` with a single separator between parts.
fn join_url(prefix: &str, dirs: &[String], name: &str) -> String {
    let mut url = prefix.trim_end_matches('/').to_string();
    for part in dirs.iter().map(String::as_str).chain([name]) {
        url.push('/');
        url.push_str(part);
    }
    url
}

/// Make sure `path` is a directory, creating it with `mode` if missing.
fn prepare_component(path: &Path, mode: u32) -> StoreResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(StoreError::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::DirectoryCreation {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    match fs::create_dir(path) {
        Ok(()) => {}
        // Lost a race with another creator; fine as long as it is a directory.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => return Ok(()),
        Err(source) => {
            return Err(StoreError::DirectoryCreation {
                path: path.to_path_buf(),
                source,
            })
        }
    }
    set_mode(path, mode).map_err(|source| StoreError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

fn remove_partial(path: &Path) {
    if path.is_file() {
        if let Err(e) = fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "failed to remove partial file");
        }
    }
}
