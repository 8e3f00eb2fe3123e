//! Whole-file loading for payloads handed to native engines.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ReadBytesError {
    #[error("Cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("File '{0}' is empty")]
    Empty(PathBuf),
}

/// Reads the full content of `path`. A zero-length file is an error, so a
/// successful result is never empty.
pub fn read_all_bytes(path: &Path) -> Result<Vec<u8>, ReadBytesError> {
    let bytes = fs::read(path).map_err(|source| ReadBytesError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(ReadBytesError::Empty(path.to_path_buf()));
    }

    tracing::info!("Loaded {} bytes from '{}'", bytes.len(), path.display());

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.tza");
        fs::write(&path, [7u8, 1, 2, 3, 255]).unwrap();

        let bytes = read_all_bytes(&path).unwrap();
        assert_eq!(bytes, vec![7u8, 1, 2, 3, 255]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_all_bytes(&dir.path().join("missing.tza"));

        assert!(matches!(result, Err(ReadBytesError::Io { .. })));
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tza");
        fs::write(&path, []).unwrap();

        let result = read_all_bytes(&path);
        assert!(matches!(result, Err(ReadBytesError::Empty(p)) if p == path));
    }
}
