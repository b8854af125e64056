//! Artifact - handle to one output file belonging to a run

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Handle to a single file produced by a run.
///
/// The path must exist when the handle is created; content is read lazily
/// on every access, the handle itself is immutable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Artifact {
    path: PathBuf,
}

impl Artifact {
    /// Create a handle over `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactMissing`] if the path does not exist and
    /// [`Error::ArtifactRead`] if its existence cannot be determined.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match path.try_exists() {
            Ok(true) => Ok(Self { path }),
            Ok(false) => Err(Error::ArtifactMissing(path)),
            Err(source) => Err(Error::ArtifactRead { path, source }),
        }
    }

    /// Get the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, used by enrichers for shape dispatch.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Read the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactRead`] on IO failure.
    pub fn content(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|source| self.read_error(source))
    }

    /// Open the file for streaming.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactRead`] on IO failure.
    pub fn open(&self) -> Result<BufReader<File>> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|source| self.read_error(source))
    }

    /// Read and parse the file as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactRead`] on IO failure and [`Error::Json`] if
    /// the content is not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        let content = self.content()?;
        serde_json::from_slice(&content).map_err(|source| Error::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn read_error(&self, source: std::io::Error) -> Error {
        Error::ArtifactRead {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Artifact::new(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
    }

    #[test]
    fn test_json_access() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("falba-facts.json");
        std::fs::write(&path, br#"{"cpus": 8}"#).unwrap();

        let artifact = Artifact::new(&path).unwrap();
        assert_eq!(artifact.file_name(), Some("falba-facts.json"));
        assert_eq!(artifact.json().unwrap()["cpus"], 8);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{not json").unwrap();

        let artifact = Artifact::new(&path).unwrap();
        assert!(matches!(artifact.json(), Err(Error::Json { .. })));
        assert_eq!(artifact.content().unwrap(), b"{not json");
    }
}
