use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the full contents of `path`.
///
/// Returns `None` when the file cannot be opened or read. Callers treat that
/// as "not up to date".
pub fn digest_file(path: &Path) -> Option<String> {
    match try_digest_file(path) {
        Ok(hex) => Some(hex),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "failed to hash file");
            None
        }
    }
}

/// Like [`digest_file`] but keeps the I/O error.
pub fn try_digest_file(path: &Path) -> io::Result<String> {
    hash_reader(File::open(path)?)
}

fn hash_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, "abc").unwrap();
        assert_eq!(
            digest_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_file_has_no_digest() {
        let dir = TempDir::new().unwrap();
        assert!(digest_file(&dir.path().join("nope.c")).is_none());
    }

    #[test]
    fn directories_have_no_digest() {
        let dir = TempDir::new().unwrap();
        assert!(digest_file(dir.path()).is_none());
    }
}
