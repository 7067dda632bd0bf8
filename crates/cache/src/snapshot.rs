use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// On-disk form of the cache: absolute source path to hex digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot {
    entries: BTreeMap<String, String>,
}

impl CacheSnapshot {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: String, digest: String) -> Option<String> {
        self.entries.insert(key, digest)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a snapshot from `path`. `Ok(None)` means the file does not exist.
    pub fn load(path: &Path) -> CacheResult<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::io(path, err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Serde {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Writes the whole mapping next to `path` and renames it into place, so
    /// readers only ever see a complete file.
    pub fn persist(&self, path: &Path) -> CacheResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| CacheError::io(parent, err))?;
            }
        }

        let json = serde_json::to_vec_pretty(self).map_err(|source| CacheError::Serde {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = temp_path_for(path);
        let mut file = fs::File::create(&tmp).map_err(|err| CacheError::io(&tmp, err))?;
        file.write_all(&json)
            .and_then(|()| file.sync_all())
            .map_err(|err| CacheError::io(&tmp, err))?;
        drop(file);

        fs::rename(&tmp, path).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            CacheError::io(path, err)
        })
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "hash.json".into());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn persist_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("hash.json");

        let mut snapshot = CacheSnapshot::default();
        snapshot.insert("/src/a.c".into(), "00ff".into());
        snapshot.persist(&path).unwrap();

        let loaded = CacheSnapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.get("/src/a.c"), Some("00ff"));

        // no temp file left behind
        let names: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("hash.json")]);
    }

    #[test]
    fn file_is_a_plain_json_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hash.json");
        let mut snapshot = CacheSnapshot::default();
        snapshot.insert("/a".into(), "1".into());
        snapshot.persist(&path).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!({ "/a": "1" }));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(CacheSnapshot::load(&dir.path().join("hash.json")).unwrap().is_none());
    }

    #[test]
    fn garbage_is_a_serde_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hash.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CacheSnapshot::load(&path),
            Err(CacheError::Serde { .. })
        ));
    }
}
