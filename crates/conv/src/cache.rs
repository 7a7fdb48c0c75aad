use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use crate::error::{ConvError, ConvResult};

/// Persistent owner id -> display name map.
///
/// The in-memory map is authoritative between `load` and `save`; `get` and
/// `update` never touch the file.
#[derive(Debug, Clone)]
pub struct OwnerCache {
    path: PathBuf,
    entries: BTreeMap<i64, String>,
}

impl OwnerCache {
    /// Empty cache bound to `path`; nothing is read until `load`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, owner_id: i64) -> Option<&str> {
        let owner = self.entries.get(&owner_id).map(String::as_str);
        debug!("get cache ({} -> {:?})", owner_id, owner);
        owner
    }

    /// Insert or overwrite a mapping (last write wins)
    pub fn update(&mut self, owner_id: i64, owner_name: impl Into<String>) {
        let owner_name = owner_name.into();
        info!("update cache ({} -> {})", owner_id, owner_name);
        self.entries.insert(owner_id, owner_name);
    }

    /// Replace the whole in-memory map with the contents of `path`.
    ///
    /// With `None` the configured path is used; otherwise the cache is rebound
    /// to the given path so a later `save` writes back to it.
    pub fn load(&mut self, path: Option<&Path>) -> ConvResult<()> {
        if let Some(path) = path {
            self.path = path.to_path_buf();
        }

        let load_error = |reason: String| ConvError::CacheLoad {
            path: self.path.clone(),
            reason,
        };

        let content = fs::read_to_string(&self.path).map_err(|e| load_error(e.to_string()))?;
        let entries: BTreeMap<i64, String> =
            serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?;

        self.entries = entries;
        info!("load cache from {} ({} owners)", self.path.display(), self.entries.len());
        Ok(())
    }

    /// Write the whole map to the configured path, replacing prior contents.
    ///
    /// The file is written next to the destination and renamed over it, so a
    /// failed save leaves the previous cache intact.
    pub fn save(&self) -> ConvResult<()> {
        let save_error = |reason: String| ConvError::CacheSave {
            path: self.path.clone(),
            reason,
        };

        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.entries
            .serialize(&mut ser)
            .map_err(|e| save_error(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &buf).map_err(|e| save_error(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| save_error(e.to_string()))?;

        info!("save cache to {} ({} owners)", self.path.display(), self.entries.len());
        Ok(())
    }
}
