//! Small file helpers that attach the path to every error.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Write `contents` to `path`, replacing any existing file.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).map_err(StoreError::io(path))
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
///
/// Readers see either no file or the complete file. With `private` set the
/// file is created readable by the owner only (Unix).
pub fn write_atomic(path: &Path, contents: impl AsRef<[u8]>, private: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".tmp-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if private { 0o600 } else { 0o644 };
        builder.permissions(fs::Permissions::from_mode(mode));
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut tmp = builder.tempfile_in(dir).map_err(StoreError::io(dir))?;
    tmp.write_all(contents.as_ref())
        .map_err(StoreError::io(tmp.path()))?;
    tmp.as_file().sync_all().map_err(StoreError::io(tmp.path()))?;

    tmp.persist(path)
        .map_err(|e| StoreError::io(path)(e.error))?;
    Ok(())
}

/// Read a whole file as UTF-8.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(StoreError::io(path))
}

/// Serialize `value` as pretty JSON into `path`.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(StoreError::json(path))?;
    write_file(path, json)
}

/// Parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(StoreError::io(path))?;
    serde_json::from_slice(&bytes).map_err(StoreError::json(path))
}

/// Create `path` and its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(StoreError::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");

        write_atomic(&path, "first", true).unwrap();
        write_atomic(&path, "second", true).unwrap();

        assert_eq!(read_to_string(&path).unwrap(), "second");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["key.pem"]);
    }

    #[test]
    fn test_write_atomic_missing_dir_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("key.pem");

        let err = write_atomic(&path, "secret", true).unwrap_err();
        assert!(err.to_string().contains("absent"), "{err}");
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_private_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");
        write_atomic(&path, "secret", true).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        write_atomic(&path, "rotated", true).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_read_json_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        write_file(&path, "{not json").unwrap();

        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
