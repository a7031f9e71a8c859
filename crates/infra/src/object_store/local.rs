//! Object store backed by a local directory: `<root>/<bucket>/<key>`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::ObjectStore;
use crate::error::InfraError;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, bucket: &str, key: &str) -> Result<PathBuf, InfraError> {
        let relative = Path::new(bucket).join(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(InfraError::ObjectStore(format!(
                "refusing path outside the store: {bucket}/{key}"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn walk(dir: &Path, base: &Path, out: &mut Vec<String>) -> Result<(), InfraError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error("list", dir, e)),
        };
        for entry in entries {
            let path = entry.map_err(|e| io_error("list", dir, e))?.path();
            if path.is_dir() {
                Self::walk(&path, base, out)?;
            } else if let Ok(relative) = path.strip_prefix(base) {
                let key: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(key.join("/"));
            }
        }
        Ok(())
    }
}

fn io_error(op: &str, path: &Path, err: std::io::Error) -> InfraError {
    InfraError::ObjectStore(format!("{op} {}: {err}", path.display()))
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, InfraError> {
        let base = self.path(bucket, "")?;
        let mut keys = Vec::new();
        Self::walk(&base, &base, &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        Ok(keys)
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool, InfraError> {
        Ok(self.path(bucket, key)?.is_file())
    }

    fn copy(&self, bucket: &str, from: &str, to: &str) -> Result<(), InfraError> {
        let source = self.path(bucket, from)?;
        let target = self.path(bucket, to)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
        }
        fs::copy(&source, &target).map_err(|e| io_error("copy", &source, e))?;
        debug!(from = %source.display(), to = %target.display(), "object copied");
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), InfraError> {
        let path = self.path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", &path, e)),
        }
    }
}
