//! One-time provisioning of the cascade model into local storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the SeetaFace frontal cascade.
pub const CASCADE_MODEL_FILE: &str = "seeta_fd_frontal_v1.0.bin";

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("bundled model not found: {0}")]
    BundledMissing(String),
    #[error("failed to provision model into {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Local directory holding the detector's classifier definition.
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the cascade model lives once provisioned.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(CASCADE_MODEL_FILE)
    }

    pub fn is_provisioned(&self) -> bool {
        self.model_path().is_file()
    }

    /// Copy `bundled` into the store unless a copy is already present, and
    /// return the local path.
    pub fn provision(&self, bundled: &Path) -> Result<PathBuf, ProvisionError> {
        let target = self.model_path();
        if target.is_file() {
            tracing::debug!(path = %target.display(), "model already provisioned");
            return Ok(target);
        }
        if !bundled.is_file() {
            return Err(ProvisionError::BundledMissing(bundled.display().to_string()));
        }

        let io_err = |source| ProvisionError::Io {
            path: self.dir.display().to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Copy under a temporary name so an interrupted copy is never
        // mistaken for a provisioned model.
        let partial = target.with_extension("partial");
        let bytes = fs::copy(bundled, &partial).map_err(io_err)?;
        fs::rename(&partial, &target).map_err(io_err)?;

        tracing::info!(
            from = %bundled.display(),
            to = %target.display(),
            bytes,
            "provisioned cascade model"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_copies_once() {
        let tmp = tempfile::tempdir().unwrap();
        let bundled = tmp.path().join("bundled.bin");
        fs::write(&bundled, b"cascade-v1").unwrap();

        let store = ModelStore::new(tmp.path().join("models/nested"));
        assert!(!store.is_provisioned());

        let path = store.provision(&bundled).unwrap();
        assert_eq!(path, store.model_path());
        assert_eq!(fs::read(&path).unwrap(), b"cascade-v1");

        // An existing copy is kept even if the bundle changes.
        fs::write(&bundled, b"cascade-v2").unwrap();
        store.provision(&bundled).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"cascade-v1");
        assert!(!path.with_extension("partial").exists());
    }

    #[test]
    fn test_provision_missing_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        let err = store.provision(&tmp.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, ProvisionError::BundledMissing(_)));
    }

    #[test]
    fn test_already_provisioned_needs_no_bundle() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        fs::write(store.model_path(), b"local").unwrap();

        let path = store.provision(Path::new("/nonexistent/bundle.bin")).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"local");
    }
}
