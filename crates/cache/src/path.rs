use std::path::{Path, PathBuf};

pub const DEFAULT_CACHE_DIR: &str = ".nativekit";
pub const DEFAULT_CACHE_FILE: &str = "hash.json";

/// `./.nativekit/hash.json`, relative to the working directory.
pub fn default_cache_path() -> PathBuf {
    Path::new(".").join(DEFAULT_CACHE_DIR).join(DEFAULT_CACHE_FILE)
}

/// Key under which a source file's digest is stored: its absolute path.
///
/// Canonicalization is preferred so `./a.c` and `a.c` share an entry. A file
/// that does not exist yet falls back to joining onto the current directory.
pub fn cache_key_for_file(path: &Path) -> String {
    let absolute = path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    });
    absolute.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn relative_and_absolute_spellings_share_a_key() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("add.c");
        std::fs::write(&file, "int add(int a, int b);").unwrap();
        let dotted = dir.path().join(".").join("add.c");
        assert_eq!(cache_key_for_file(&file), cache_key_for_file(&dotted));
    }

    #[test]
    fn missing_files_still_get_absolute_keys() {
        let key = cache_key_for_file(Path::new("does/not/exist.rs"));
        assert!(Path::new(&key).is_absolute());
    }
}
