use crate::error::{MappingError, Result};
use crate::model::MappingSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loads `<dir>/<version>.json` on first use and keeps it for the process lifetime.
pub struct MappingProvider {
    dir: PathBuf,
    loaded: RwLock<HashMap<String, Arc<MappingSet>>>,
}

impl MappingProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, version: &str) -> PathBuf {
        self.dir.join(format!("{version}.json"))
    }

    pub fn load(&self, version: &str) -> Result<Arc<MappingSet>> {
        {
            let loaded = self
                .loaded
                .read()
                .map_err(|_| MappingError::Internal("Mapping cache lock poisoned".into()))?;
            if let Some(set) = loaded.get(version) {
                return Ok(set.clone());
            }
        }

        let path = self.path_for(version);
        if !path.is_file() {
            return Err(MappingError::UnknownVersion(version.to_string()));
        }

        let set = MappingSet::from_path(&path)?;
        if set.version != version {
            tracing::warn!(
                requested = version,
                declared = %set.version,
                path = %path.display(),
                "Mapping file declares a different version"
            );
        }
        tracing::info!(version, classes = set.classes.len(), "Loaded mappings");

        let mut loaded = self
            .loaded
            .write()
            .map_err(|_| MappingError::Internal("Mapping cache lock poisoned".into()))?;
        Ok(loaded
            .entry(version.to_string())
            .or_insert_with(|| Arc::new(set))
            .clone())
    }

    /// Versions with a mapping file in the directory, sorted.
    pub fn available_versions(&self) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    versions.push(stem.to_string());
                }
            }
        }
        versions.sort();
        Ok(versions)
    }
}
