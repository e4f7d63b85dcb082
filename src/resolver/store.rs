//! Definition store backed by YAML/JSON/TOML files under a root directory

use super::{DefinitionStore, StoreError};
use crate::config::ConfigFormat;
use crate::model::{PipelineDefinition, ResolvedLocation, VariableScope};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

const EXTENSIONS: [&str; 4] = ["yml", "yaml", "json", "toml"];

pub struct FileDefinitionStore {
    root: PathBuf,
}

impl FileDefinitionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    async fn find_stored(&self, name: &str, directory: &str) -> Option<PathBuf> {
        let base = self.root.join(directory.trim_start_matches('/'));
        for ext in EXTENSIONS {
            let candidate = base.join(format!("{}.{}", name, ext));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Some(candidate);
            }
        }
        None
    }

    async fn find_by_id(&self, id: &str) -> Result<(PathBuf, PipelineDefinition), StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "definitions root {} is not a directory",
                self.root.display()
            )));
        }

        let candidates: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| ConfigFormat::from_path(path).is_some())
            .collect();

        for path in candidates {
            match read_definition(&path).await {
                Ok(definition) if definition.id.as_deref() == Some(id) => {
                    return Ok((path, definition));
                }
                Ok(_) => {}
                Err(e) => trace!("Skipping {} while scanning for id {}: {}", path.display(), id, e),
            }
        }

        Err(StoreError::NotFound(format!("id:{}", id)))
    }
}

async fn read_definition(path: &Path) -> Result<PipelineDefinition, StoreError> {
    let invalid = |message: String| StoreError::Invalid {
        location: path.display().to_string(),
        message,
    };

    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| invalid("unsupported file extension".to_string()))?;

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(StoreError::Io(e)),
    };

    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string())),
        ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| invalid(e.to_string())),
        ConfigFormat::Toml => toml::from_str(&content).map_err(|e| invalid(e.to_string())),
    }
}

#[async_trait]
impl DefinitionStore for FileDefinitionStore {
    async fn load(
        &self,
        location: &ResolvedLocation,
        _scope: &VariableScope,
    ) -> Result<PipelineDefinition, StoreError> {
        let (path, mut definition) = match location {
            ResolvedLocation::Path(path) => {
                let path = self.path_for(path);
                let definition = read_definition(&path).await?;
                (path, definition)
            }
            ResolvedLocation::Stored { name, directory } => {
                let path = self
                    .find_stored(name, directory)
                    .await
                    .ok_or_else(|| StoreError::NotFound(location.to_string()))?;
                let definition = read_definition(&path).await?;
                (path, definition)
            }
            ResolvedLocation::Id(id) => self.find_by_id(id).await?,
        };

        debug!("Loaded pipeline '{}' from {}", definition.name, path.display());

        definition.location = Some(match location {
            ResolvedLocation::Stored { .. } => location.clone(),
            _ => ResolvedLocation::Path(path.to_string_lossy().into_owned()),
        });
        Ok(definition)
    }
}
